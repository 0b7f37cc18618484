//! Common types for the SwarmView environment abstraction.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One undecoded snapshot frame as delivered by the transport.
///
/// The payload is opaque JSON bytes; the engine's ingestion adapter does
/// the structural validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSnapshot {
    /// The raw frame bytes
    pub payload: Vec<u8>,

    /// Receive time on the transport's clock (milliseconds)
    pub received_at_ms: u64,
}

impl RawSnapshot {
    /// Creates a frame from payload bytes.
    pub fn new(payload: impl Into<Vec<u8>>, received_at_ms: u64) -> Self {
        Self {
            payload: payload.into(),
            received_at_ms,
        }
    }

    /// Returns the payload size in bytes.
    pub fn size(&self) -> usize {
        self.payload.len()
    }
}

/// Request to terminate an agent, forwarded to the control API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovalRequest {
    /// Correlation id for logs
    pub request_id: Uuid,

    /// The agent to terminate
    pub agent_id: String,
}

impl RemovalRequest {
    /// Creates a request with a fresh correlation id.
    pub fn new(agent_id: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            agent_id: agent_id.into(),
        }
    }
}

/// The control API's answer to a [`RemovalRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovalAck {
    pub request_id: Uuid,
    pub agent_id: String,

    /// Whether the backend knew the agent and removed it
    pub accepted: bool,
}

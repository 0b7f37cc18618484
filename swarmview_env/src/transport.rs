//! Transport and control abstractions between the engine and the swarm backend.

use crate::error::EnvError;
use crate::types::{RawSnapshot, RemovalAck, RemovalRequest};
use async_trait::async_trait;

/// Source of full-state snapshots pushed by the swarm backend.
///
/// # Implementations
///
/// - **Production**: a websocket client that reconnects on its own
/// - **Simulation**: channel-based, fed by the synthetic swarm oracle
///
/// # Delivery
///
/// ```text
/// Backend                   Transport                  Engine
///   |                           |                          |
///   |-- swarm_update ---------->|                          |
///   |-- swarm_update ---------->|  (may coalesce)          |
///   |                           |-- recv() -> latest ----->|-- buffered until next tick
/// ```
///
/// Delivery is best-effort. Every snapshot is a complete state, so a dropped
/// or coalesced frame never needs to be replayed.
#[async_trait]
pub trait SnapshotTransport: Send + Sync + 'static {
    /// Receives the next snapshot frame.
    ///
    /// # Returns
    /// * `Some(raw)` - A frame arrived
    /// * `None` - The transport was shut down
    async fn recv(&self) -> Option<RawSnapshot>;
}

/// Upward-facing administrative API.
///
/// Only the removal command is modeled here; the other control-panel
/// commands (pause, resume, frequency, reset) never touch the scene.
#[async_trait]
pub trait ControlApi: Send + Sync + 'static {
    /// Asks the backend to terminate an agent.
    ///
    /// # Returns
    /// * `Ok(ack)` - The backend answered; `ack.accepted` says whether the agent existed
    /// * `Err(EnvError::ControlError)` - The request could not be delivered
    async fn remove_agent(&self, request: RemovalRequest) -> Result<RemovalAck, EnvError>;
}

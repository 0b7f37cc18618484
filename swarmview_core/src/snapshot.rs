//! Snapshot Ingestion Adapter
//!
//! Turns one raw frame from the transport into a validated [`SwarmSnapshot`].
//! This is the only place the wire format is known. The adapter does no
//! transformation beyond structural validation and defaulting:
//! - Missing or `null` numeric fields default to zero (reputation to 100)
//! - Unknown status / specialization strings degrade to neutral values
//! - Anything that is not a mapping of the expected shape is rejected whole
//!
//! Because decoding finishes before anything touches the registry, a rejected
//! frame can never leave the scene half-updated.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use thiserror::Error;

/// Reputation assumed when the field is absent.
pub const DEFAULT_REPUTATION: f64 = 100.0;

// ============================================================================
// ERRORS
// ============================================================================

/// Structural validation failures. All of them are recoverable: the frame is
/// dropped and the previous scene state stays in place.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The frame is not JSON at all
    #[error("Malformed frame: {0}")]
    Malformed(serde_json::Error),

    /// A level of the document is not a JSON object
    #[error("{0} is not a mapping")]
    NotAMapping(&'static str),

    /// A mapping has fields of the wrong type
    #[error("Unexpected shape: {0}")]
    Shape(serde_json::Error),

    /// An envelope without its payload
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// An envelope type this adapter does not understand
    #[error("Unknown envelope type: {0}")]
    UnknownEnvelope(String),

    /// An agent entry with an empty identifier
    #[error("Agent entry with empty agent_id")]
    EmptyAgentId,

    /// The same identifier listed twice in one roster
    #[error("Agent {0} listed more than once")]
    DuplicateAgent(String),
}

// ============================================================================
// DOMAIN TYPES (Output)
// ============================================================================

/// Agent role; decides which ring an agent lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Coordinator,
    Solver,
}

/// Agent status as reported by the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    #[default]
    Idle,
    Working,
    #[serde(other)]
    Other,
}

/// Solver specialization. Drives the accent color of the object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Specialization {
    PrimeFinding,
    HashCracking,
    Sorting,
    DataSearch,
}

impl Specialization {
    fn from_wire(name: &str) -> Option<Self> {
        match name {
            "prime_finding" => Some(Self::PrimeFinding),
            "hash_cracking" => Some(Self::HashCracking),
            "sorting" => Some(Self::Sorting),
            "data_search" => Some(Self::DataSearch),
            _ => None,
        }
    }
}

/// One agent as of one ingestion cycle. Immutable once decoded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentSnapshot {
    pub agent_id: String,
    pub role: Role,
    pub status: AgentStatus,
    pub active_tasks: u64,
    pub completed_tasks: u64,
    pub balance: f64,
    pub reputation: f64,

    /// Solvers only
    pub skill_level: Option<f64>,

    pub specialization: Option<Specialization>,
    pub current_task: Option<String>,
    pub address: Option<String>,
    pub total_bids: u64,
    pub successful_bids: u64,
    pub success_rate: f64,
}

impl AgentSnapshot {
    /// Minimal snapshot with every optional field at its default.
    pub fn new(agent_id: impl Into<String>, role: Role) -> Self {
        Self {
            agent_id: agent_id.into(),
            role,
            status: AgentStatus::Idle,
            active_tasks: 0,
            completed_tasks: 0,
            balance: 0.0,
            reputation: DEFAULT_REPUTATION,
            skill_level: None,
            specialization: None,
            current_task: None,
            address: None,
            total_bids: 0,
            successful_bids: 0,
            success_rate: 0.0,
        }
    }

    /// The activity predicate driving pulse and ring opacity.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active_tasks > 0 || self.status == AgentStatus::Working
    }
}

/// Message kind of a transaction event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum MessageKind {
    TaskAnnouncement,
    TaskBid,
    SolutionSubmission,

    /// Any other name or numeric code, kept verbatim
    Other(String),
}

impl MessageKind {
    /// Maps a snake_case name from the wire.
    pub fn from_name(name: &str) -> Self {
        match name {
            "task_announcement" => Self::TaskAnnouncement,
            "task_bid" => Self::TaskBid,
            "solution_submission" => Self::SolutionSubmission,
            other => Self::Other(other.to_string()),
        }
    }

    /// Maps the backend's numeric message codes.
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => Self::TaskAnnouncement,
            2 => Self::TaskBid,
            4 => Self::SolutionSubmission,
            other => Self::Other(other.to_string()),
        }
    }
}

/// One inter-agent message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionEvent {
    /// Sender agent identifier
    pub from: String,
    pub kind: MessageKind,

    /// Seconds (backend wall clock)
    pub timestamp: f64,

    pub from_address: Option<String>,
    pub task_id: Option<u64>,
    pub task_type: Option<String>,
}

impl TransactionEvent {
    pub fn new(from: impl Into<String>, kind: MessageKind, timestamp: f64) -> Self {
        Self {
            from: from.into(),
            kind,
            timestamp,
            from_address: None,
            task_id: None,
            task_type: None,
        }
    }
}

/// The full roster, partitioned by role, in wire order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Roster {
    pub coordinators: Vec<AgentSnapshot>,
    pub solvers: Vec<AgentSnapshot>,
}

impl Roster {
    /// Returns the group for one role.
    pub fn group(&self, role: Role) -> &[AgentSnapshot] {
        match role {
            Role::Coordinator => &self.coordinators,
            Role::Solver => &self.solvers,
        }
    }

    /// Iterates coordinators first, then solvers.
    pub fn iter(&self) -> impl Iterator<Item = &AgentSnapshot> {
        self.coordinators.iter().chain(self.solvers.iter())
    }

    pub fn len(&self) -> usize {
        self.coordinators.len() + self.solvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A validated full-state snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SwarmSnapshot {
    pub roster: Roster,
    pub transactions: Vec<TransactionEvent>,

    /// Backend timestamp of the snapshot, if sent
    pub timestamp: Option<f64>,
}

/// What one transport frame turned out to be.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    Snapshot(SwarmSnapshot),

    /// `ping` / `echo` frames; nothing to apply
    KeepAlive,
}

// ============================================================================
// WIRE FORMAT (Input)
// ============================================================================

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Deserialize)]
struct WireAgent {
    agent_id: String,
    #[serde(default)]
    status: Option<AgentStatus>,
    #[serde(default, deserialize_with = "null_as_default")]
    active_tasks: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    completed_tasks: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    balance: f64,
    #[serde(default)]
    reputation: Option<f64>,
    #[serde(default)]
    skill_level: Option<f64>,
    #[serde(default)]
    specialization: Option<String>,
    #[serde(default)]
    current_task: Option<String>,
    #[serde(default)]
    address: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    total_bids: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    successful_bids: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    success_rate: f64,
}

impl WireAgent {
    fn into_snapshot(self, role: Role) -> AgentSnapshot {
        AgentSnapshot {
            agent_id: self.agent_id,
            role,
            status: self.status.unwrap_or_default(),
            active_tasks: self.active_tasks,
            completed_tasks: self.completed_tasks,
            balance: self.balance,
            reputation: self.reputation.unwrap_or(DEFAULT_REPUTATION),
            skill_level: self.skill_level,
            specialization: self.specialization.as_deref().and_then(Specialization::from_wire),
            current_task: self.current_task,
            address: self.address.filter(|a| !a.is_empty()),
            total_bids: self.total_bids,
            successful_bids: self.successful_bids,
            success_rate: self.success_rate,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireKind {
    Code(i64),
    Name(String),
}

#[derive(Debug, Deserialize)]
struct WireEvent {
    from: String,
    msg_type: WireKind,
    timestamp: f64,
    #[serde(default)]
    from_address: Option<String>,
    #[serde(default)]
    task_id: Option<u64>,
    #[serde(default)]
    task_type: Option<String>,
}

impl From<WireEvent> for TransactionEvent {
    fn from(wire: WireEvent) -> Self {
        let kind = match wire.msg_type {
            WireKind::Code(code) => MessageKind::from_code(code),
            WireKind::Name(name) => MessageKind::from_name(&name),
        };
        Self {
            from: wire.from,
            kind,
            timestamp: wire.timestamp,
            from_address: wire.from_address.filter(|a| !a.is_empty()),
            task_id: wire.task_id,
            task_type: wire.task_type,
        }
    }
}

// ============================================================================
// DECODING
// ============================================================================

/// Decodes one transport frame.
pub fn decode(bytes: &[u8]) -> Result<Delivery, SnapshotError> {
    let value: Value = serde_json::from_slice(bytes).map_err(SnapshotError::Malformed)?;
    decode_value(value)
}

/// Decodes an already-parsed frame, unwrapping the backend's
/// `{"type": ..., "data": ...}` envelope when present.
pub fn decode_value(value: Value) -> Result<Delivery, SnapshotError> {
    let Value::Object(mut map) = value else {
        return Err(SnapshotError::NotAMapping("frame"));
    };

    let envelope = map.get("type").and_then(Value::as_str).map(str::to_owned);
    match envelope.as_deref() {
        Some("swarm_update") | Some("initial_state") => {
            let data = map.remove("data").ok_or(SnapshotError::MissingField("data"))?;
            decode_payload(data).map(Delivery::Snapshot)
        }
        Some("ping") | Some("echo") => Ok(Delivery::KeepAlive),
        Some(other) => Err(SnapshotError::UnknownEnvelope(other.to_string())),
        None => decode_payload(Value::Object(map)).map(Delivery::Snapshot),
    }
}

fn require_object(value: &Value, what: &'static str) -> Result<(), SnapshotError> {
    if value.is_object() {
        Ok(())
    } else {
        Err(SnapshotError::NotAMapping(what))
    }
}

fn decode_group(value: Option<Value>, role: Role) -> Result<Vec<AgentSnapshot>, SnapshotError> {
    let entries = match value {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(entries)) => entries,
        Some(_) => return Err(SnapshotError::NotAMapping("agent group")),
    };

    entries
        .into_iter()
        .map(|entry| {
            require_object(&entry, "agent entry")?;
            let wire: WireAgent = serde_json::from_value(entry).map_err(SnapshotError::Shape)?;
            if wire.agent_id.is_empty() {
                return Err(SnapshotError::EmptyAgentId);
            }
            Ok(wire.into_snapshot(role))
        })
        .collect()
}

fn decode_payload(value: Value) -> Result<SwarmSnapshot, SnapshotError> {
    let Value::Object(mut payload) = value else {
        return Err(SnapshotError::NotAMapping("payload"));
    };

    let roster = match payload.remove("agents") {
        None | Some(Value::Null) => Roster::default(),
        Some(Value::Object(mut agents)) => Roster {
            coordinators: decode_group(agents.remove("coordinators"), Role::Coordinator)?,
            solvers: decode_group(agents.remove("solvers"), Role::Solver)?,
        },
        Some(_) => return Err(SnapshotError::NotAMapping("agents")),
    };

    let mut seen = HashSet::with_capacity(roster.len());
    for agent in roster.iter() {
        if !seen.insert(agent.agent_id.as_str()) {
            return Err(SnapshotError::DuplicateAgent(agent.agent_id.clone()));
        }
    }

    let transactions = match payload.remove("transactions") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(entries)) => entries
            .into_iter()
            .map(|entry| {
                require_object(&entry, "transaction")?;
                serde_json::from_value::<WireEvent>(entry)
                    .map(TransactionEvent::from)
                    .map_err(SnapshotError::Shape)
            })
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => return Err(SnapshotError::NotAMapping("transactions")),
    };

    let timestamp = payload.get("timestamp").and_then(Value::as_f64);

    Ok(SwarmSnapshot {
        roster,
        transactions,
        timestamp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(delivery: Delivery) -> SwarmSnapshot {
        match delivery {
            Delivery::Snapshot(s) => s,
            Delivery::KeepAlive => panic!("expected a snapshot"),
        }
    }

    #[test]
    fn test_minimal_coordinator_defaults() {
        let raw = br#"{"agents":{"coordinators":[{"agent_id":"c1","role":"coordinator"}],"solvers":[]},"transactions":[]}"#;
        let snap = snapshot(decode(raw).unwrap());

        assert_eq!(snap.roster.coordinators.len(), 1);
        let c1 = &snap.roster.coordinators[0];
        assert_eq!(c1.agent_id, "c1");
        assert_eq!(c1.role, Role::Coordinator);
        assert_eq!(c1.active_tasks, 0);
        assert_eq!(c1.balance, 0.0);
        assert_eq!(c1.reputation, DEFAULT_REPUTATION);
        assert_eq!(c1.specialization, None);
        assert!(!c1.is_active());
    }

    #[test]
    fn test_envelope_is_unwrapped() {
        let frame = json!({
            "type": "swarm_update",
            "data": {
                "agents": {"coordinators": [], "solvers": [
                    {"agent_id": "solver_0", "status": "working", "active_tasks": null,
                     "specialization": "hash_cracking", "skill_level": 0.5}
                ]},
                "transactions": [{"from": "solver_0", "msg_type": 2, "timestamp": 10.5}]
            }
        });
        let snap = snapshot(decode_value(frame).unwrap());
        let s0 = &snap.roster.solvers[0];
        assert_eq!(s0.role, Role::Solver);
        assert_eq!(s0.status, AgentStatus::Working);
        assert_eq!(s0.active_tasks, 0);
        assert!(s0.is_active());
        assert_eq!(s0.specialization, Some(Specialization::HashCracking));
        assert_eq!(snap.transactions[0].kind, MessageKind::TaskBid);
    }

    #[test]
    fn test_keepalive_frames() {
        assert_eq!(decode(br#"{"type":"ping"}"#).unwrap(), Delivery::KeepAlive);
        assert_eq!(decode(br#"{"type":"echo","data":"hi"}"#).unwrap(), Delivery::KeepAlive);
    }

    #[test]
    fn test_message_kind_names_and_codes() {
        assert_eq!(MessageKind::from_name("task_announcement"), MessageKind::TaskAnnouncement);
        assert_eq!(MessageKind::from_code(4), MessageKind::SolutionSubmission);
        assert_eq!(MessageKind::from_code(3), MessageKind::Other("3".into()));
        assert_eq!(MessageKind::from_name("consensus_vote"), MessageKind::Other("consensus_vote".into()));
    }

    #[test]
    fn test_unknown_strings_degrade() {
        let frame = json!({"agents": {"solvers": [
            {"agent_id": "s", "status": "rebooting", "specialization": "juggling"}
        ]}});
        let snap = snapshot(decode_value(frame).unwrap());
        assert_eq!(snap.roster.solvers[0].status, AgentStatus::Other);
        assert_eq!(snap.roster.solvers[0].specialization, None);
        assert!(snap.transactions.is_empty());
    }

    #[test]
    fn test_structural_corruption_is_rejected() {
        assert!(matches!(decode(b"not json"), Err(SnapshotError::Malformed(_))));
        assert!(matches!(decode(b"[1,2]"), Err(SnapshotError::NotAMapping("frame"))));
        assert!(matches!(
            decode(br#"{"agents": [1]}"#),
            Err(SnapshotError::NotAMapping("agents"))
        ));
        assert!(matches!(
            decode(br#"{"agents": {"solvers": ["s1"]}}"#),
            Err(SnapshotError::NotAMapping("agent entry"))
        ));
        assert!(matches!(
            decode(br#"{"agents": {"solvers": [{"agent_id": "s1", "balance": "lots"}]}}"#),
            Err(SnapshotError::Shape(_))
        ));
        assert!(matches!(
            decode(br#"{"type": "swarm_update"}"#),
            Err(SnapshotError::MissingField("data"))
        ));
        assert!(matches!(
            decode(br#"{"type": "mystery"}"#),
            Err(SnapshotError::UnknownEnvelope(_))
        ));
    }

    #[test]
    fn test_duplicate_and_empty_ids_rejected() {
        let dup = json!({"agents": {
            "coordinators": [{"agent_id": "a"}],
            "solvers": [{"agent_id": "a"}]
        }});
        assert!(matches!(decode_value(dup), Err(SnapshotError::DuplicateAgent(id)) if id == "a"));

        let empty = json!({"agents": {"solvers": [{"agent_id": ""}]}});
        assert!(matches!(decode_value(empty), Err(SnapshotError::EmptyAgentId)));
    }
}

//! Chaos scenarios for the scene engine.

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// SV-001: Plain backend feed at the default broadcast rate
    Steady,

    /// SV-002: Roster order shuffled on every snapshot
    Reorder,

    /// SV-003: Every third frame truncated or reshaped
    Corrupt,

    /// SV-004: Agents joining, leaving and being removed from the UI
    Churn,

    /// SV-005: Poisson bursts of announcements and coalesced deliveries
    Burst,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Steady,
            ScenarioId::Reorder,
            ScenarioId::Corrupt,
            ScenarioId::Churn,
            ScenarioId::Burst,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Steady => "steady",
            ScenarioId::Reorder => "reorder",
            ScenarioId::Corrupt => "corrupt",
            ScenarioId::Churn => "churn",
            ScenarioId::Burst => "burst",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Steady => "2 snapshots/s from the synthetic swarm, identity + fade checks",
            ScenarioId::Reorder => "Roster shuffled every frame, positions must not move",
            ScenarioId::Corrupt => "1 in 3 frames malformed, scene must keep last good state",
            ScenarioId::Churn => "Agents join, vanish and get removed via the control API",
            ScenarioId::Burst => "Announcement storms + several frames per tick, dedup check",
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "steady" | "sv-001" => Ok(ScenarioId::Steady),
            "reorder" | "shuffle" | "sv-002" => Ok(ScenarioId::Reorder),
            "corrupt" | "sv-003" => Ok(ScenarioId::Corrupt),
            "churn" | "sv-004" => Ok(ScenarioId::Churn),
            "burst" | "sv-005" => Ok(ScenarioId::Burst),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}

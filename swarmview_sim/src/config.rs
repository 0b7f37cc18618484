//! Simulation configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use swarmview_core::SceneConfig;

/// Configuration for a simulation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Master seed for determinism
    pub seed: u64,

    /// Initial number of coordinator agents
    pub coordinators: usize,

    /// Initial number of solver agents
    pub solvers: usize,

    /// Frame rate in Hz
    pub frame_rate_hz: u32,

    /// Interval between backend broadcasts (default: 500ms, 2 per second)
    pub snapshot_interval_ms: u64,

    /// Range a coordinator waits between task announcements, in seconds
    pub task_interval_secs: (f64, f64),

    /// Time a coordinator collects bids before assigning (default: 10s)
    pub bid_window_secs: f64,

    /// Task lifetime after announcement (default: 30s)
    pub task_deadline_secs: f64,

    /// Length of the transaction window sent with every snapshot
    pub history_len: usize,

    /// Send `msg_type` as the backend's numeric codes instead of names
    pub numeric_msg_types: bool,

    /// Scene settings handed to the engine
    pub scene: SceneConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            coordinators: 2,
            solvers: 6,
            frame_rate_hz: 60,
            snapshot_interval_ms: 500,
            task_interval_secs: (5.0, 15.0),
            bid_window_secs: 10.0,
            task_deadline_secs: 30.0,
            history_len: 30,
            numeric_msg_types: true,
            scene: SceneConfig::default(),
        }
    }
}

impl SimConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.frame_rate_hz.max(1) as f64)
    }

    pub fn snapshot_interval(&self) -> Duration {
        Duration::from_millis(self.snapshot_interval_ms.max(1))
    }

    /// Loads a JSON override file; missing fields keep their defaults.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_backend() {
        let config = SimConfig::default();
        assert_eq!(config.snapshot_interval(), Duration::from_millis(500));
        assert_eq!(config.history_len, 30);
        assert_eq!(config.task_interval_secs, (5.0, 15.0));
    }

    #[test]
    fn test_partial_override() {
        let config = SimConfig::from_json(r#"{"solvers": 12, "scene": {"edge_ttl_ms": 1000}}"#).unwrap();
        assert_eq!(config.solvers, 12);
        assert_eq!(config.coordinators, 2);
        assert_eq!(config.scene.edge_ttl_ms, 1000);
        assert_eq!(config.scene.solver_ring_radius, 25.0);
    }
}

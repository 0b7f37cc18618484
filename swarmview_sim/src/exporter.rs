//! JSON exporter for offline inspection.
//!
//! Dumps scene frames (agent objects, live edges, markers) as JSON so a run
//! can be replayed or plotted without the engine.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::time::Duration;

use swarmview_core::{AgentHandle, AgentRegistry, EdgeAnimator, Role};

/// A single frame of scene data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimFrame {
    /// Simulation time in seconds
    pub time_sec: f64,

    pub agents: Vec<AgentFrame>,
    pub edges: Vec<EdgeFrame>,
    pub markers: Vec<MarkerFrame>,

    /// Events (rejected snapshots, removals, etc.)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<SimEvent>,
}

/// One agent object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentFrame {
    pub agent_id: String,
    pub role: String,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub glow: f32,
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub selected: bool,
}

/// One live transaction edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeFrame {
    pub edge_id: u64,
    pub source: String,
    pub target: String,
    pub opacity: f32,
}

/// One traveling marker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkerFrame {
    pub edge_id: u64,
    pub progress: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Simulation event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimEvent {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

impl SimEvent {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: None,
        }
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: Some("warn".to_string()),
        }
    }
}

impl SimFrame {
    /// Captures the current scene.
    pub fn capture(
        time: Duration,
        registry: &AgentRegistry,
        animator: &EdgeAnimator,
        events: Vec<SimEvent>,
    ) -> Self {
        let agents = registry
            .iter()
            .map(|object| {
                let p = object.position();
                AgentFrame {
                    agent_id: object.id().to_owned(),
                    role: match object.role() {
                        Role::Coordinator => "coordinator".to_string(),
                        Role::Solver => "solver".to_string(),
                    },
                    x: p.x,
                    y: p.y,
                    z: p.z,
                    glow: object.glow_intensity(),
                    selected: object.is_selected(),
                }
            })
            .collect();

        let name = |handle: AgentHandle| {
            registry
                .get(handle)
                .map(|o| o.id().to_owned())
                .unwrap_or_default()
        };
        let edges = animator
            .edges()
            .iter()
            .map(|edge| EdgeFrame {
                edge_id: edge.id.raw(),
                source: name(edge.source),
                target: name(edge.target),
                opacity: edge.opacity,
            })
            .collect();

        let markers = animator
            .markers()
            .iter()
            .map(|marker| {
                let p = marker.position();
                MarkerFrame {
                    edge_id: marker.edge.raw(),
                    progress: marker.progress(),
                    x: p.x,
                    y: p.y,
                    z: p.z,
                }
            })
            .collect();

        Self {
            time_sec: time.as_secs_f64(),
            agents,
            edges,
            markers,
            events,
        }
    }
}

/// Complete simulation export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimExport {
    /// Scenario name
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// Duration in seconds
    pub duration_sec: f64,

    /// All frames
    pub frames: Vec<SimFrame>,

    /// Final results
    pub passed: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl SimExport {
    /// Creates a new export container.
    pub fn new(scenario: &str, seed: u64) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            duration_sec: 0.0,
            frames: Vec::new(),
            passed: false,
            failure_reason: None,
        }
    }

    /// Adds a frame.
    pub fn add_frame(&mut self, frame: SimFrame) {
        self.duration_sec = frame.time_sec;
        self.frames.push(frame);
    }

    /// Finalizes the export.
    pub fn finalize(&mut self, passed: bool, failure_reason: Option<String>) {
        self.passed = passed;
        self.failure_reason = failure_reason;
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swarmview_core::{AgentSnapshot, MessageKind, Roster, SceneConfig, TransactionEvent};

    #[test]
    fn test_capture_names_edge_endpoints() {
        let config = SceneConfig::default();
        let mut registry = AgentRegistry::new(&config);
        registry.reconcile(&Roster {
            coordinators: vec![AgentSnapshot::new("c1", Role::Coordinator)],
            solvers: vec![AgentSnapshot::new("s1", Role::Solver)],
        });
        let mut animator = EdgeAnimator::new(&config);
        animator.ingest(
            &[TransactionEvent::new("c1", MessageKind::TaskAnnouncement, 1.0)],
            &registry,
            Duration::ZERO,
        );

        let frame = SimFrame::capture(Duration::from_millis(500), &registry, &animator, vec![]);
        assert_eq!(frame.agents.len(), 2);
        assert_eq!(frame.edges.len(), 1);
        assert_eq!(frame.edges[0].source, "c1");
        assert_eq!(frame.edges[0].target, "s1");
        assert_eq!(frame.markers.len(), 1);

        let json = serde_json::to_value(&frame).unwrap();
        assert!(json.get("events").is_none());
        assert!(json["agents"][0].get("selected").is_none());
    }

    #[test]
    fn test_export_tracks_duration() {
        let mut export = SimExport::new("steady", 42);
        export.add_frame(SimFrame {
            time_sec: 2.5,
            agents: vec![],
            edges: vec![],
            markers: vec![],
            events: vec![SimEvent::warn("snapshot rejected")],
        });
        export.finalize(true, None);
        assert_eq!(export.duration_sec, 2.5);
        assert!(export.passed);
    }
}

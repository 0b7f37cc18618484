//! SwarmView Core - Live 3D swarm visualization and state reconciliation
//!
//! This library keeps a persistent 3D scene in step with a stream of
//! full-state swarm snapshots:
//! 1. **Identity**: one visual object per agent identifier for the whole
//!    session, placed once on its role ring and never moved
//! 2. **Ephemera**: one fading arc and traveling marker per inter-agent
//!    message, rendered exactly once despite the backend re-sending its
//!    event window
//! 3. **Interaction**: pointer picks resolve to the agent under the cursor
//!    and feed a single selection override back into the scene
//!
//! Rendering goes through the [`render::RenderBackend`] seam; a headless
//! backend ships in-crate and a Rerun backend sits behind the
//! `visualization` feature.

pub mod camera;
pub mod config;
pub mod edges;
pub mod error;
pub mod metrics;
pub mod palette;
pub mod picking;
pub mod registry;
pub mod render;
pub mod runtime;
pub mod scene;
pub mod snapshot;

#[cfg(feature = "visualization")]
pub mod visualization;

// Re-export key types for convenience
pub use camera::{CameraPose, OrbitCamera};
pub use config::{CameraConfig, SceneConfig};
pub use edges::{
    EdgeAnimator, EdgeCurve, EdgeId, IngestReport, MarkerId, SweepReport, TransactionEdge,
    TravelMarker,
};
pub use error::SceneError;
pub use metrics::SceneStats;
pub use picking::{CanvasRect, Ray};
pub use registry::{AgentHandle, AgentRegistry, VisualAgentObject};
pub use render::{
    Frame, HeadlessBackend, HeadlessSurface, RenderBackend, RenderError, SurfaceProvider, Viewport,
};
pub use runtime::{snapshot_channel, SnapshotInbox, SnapshotSender, SwarmView, TickReport};
pub use scene::{ApplyReport, FrameReport, SceneManager};
pub use snapshot::{
    decode, AgentSnapshot, AgentStatus, Delivery, MessageKind, Role, Roster, SnapshotError,
    Specialization, SwarmSnapshot, TransactionEvent,
};

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashMap;
    use std::time::Duration;

    fn roster(coordinators: &[String], solvers: &[String]) -> Roster {
        Roster {
            coordinators: coordinators
                .iter()
                .map(|id| AgentSnapshot::new(id.clone(), Role::Coordinator))
                .collect(),
            solvers: solvers
                .iter()
                .map(|id| AgentSnapshot::new(id.clone(), Role::Solver))
                .collect(),
        }
    }

    fn ids(prefix: &'static str, max: usize) -> impl Strategy<Value = Vec<String>> {
        prop::collection::hash_set(0u16..200, 0..max)
            .prop_map(move |set| set.into_iter().map(|n| format!("{}{}", prefix, n)).collect())
    }

    proptest! {
        #[test]
        fn prop_identity_and_position_stable(
            coordinators in ids("c", 6),
            solvers in ids("s", 12),
            rounds in prop::collection::vec((any::<u64>(), 0usize..=100), 1..6),
        ) {
            let config = SceneConfig::default();
            let mut registry = AgentRegistry::new(&config);
            registry.reconcile(&roster(&coordinators, &solvers));

            let placed: HashMap<String, (AgentHandle, f32, f32)> = registry
                .iter()
                .map(|o| (o.id().to_owned(), (o.handle(), o.position().x, o.position().z)))
                .collect();
            prop_assert_eq!(placed.len(), coordinators.len() + solvers.len());

            for (seed, keep_pct) in rounds {
                // Reordered, thinned rosters never move or duplicate objects
                let mut c = coordinators.clone();
                let mut s = solvers.clone();
                let n = c.len().max(1);
                c.rotate_left(seed as usize % n);
                s.reverse();
                s.truncate(s.len() * keep_pct / 100);
                let report = registry.reconcile(&roster(&c, &s));
                prop_assert!(report.created.is_empty());
                prop_assert_eq!(registry.len(), placed.len());
            }

            for object in registry.iter() {
                let (handle, x, z) = placed[object.id()];
                prop_assert_eq!(object.handle(), handle);
                prop_assert_eq!(object.position().x, x);
                prop_assert_eq!(object.position().z, z);
            }
        }

        #[test]
        fn prop_duplicate_events_spawn_once(
            timestamps in prop::collection::vec(0u32..50, 1..40),
        ) {
            let config = SceneConfig::default();
            let mut registry = AgentRegistry::new(&config);
            registry.reconcile(&roster(&["c1".into(), "c2".into()], &["s1".into()]));
            let mut animator = EdgeAnimator::new(&config);

            let events: Vec<_> = timestamps
                .iter()
                .map(|t| TransactionEvent::new("c1", MessageKind::TaskAnnouncement, *t as f64))
                .collect();
            let distinct: std::collections::HashSet<_> = timestamps.iter().collect();

            let first = animator.ingest(&events, &registry, Duration::ZERO);
            let again = animator.ingest(&events, &registry, Duration::from_millis(10));
            prop_assert_eq!(first.spawned, distinct.len());
            prop_assert_eq!(again.spawned, 0);
            prop_assert_eq!(again.duplicates, events.len());
        }

        #[test]
        fn prop_opacity_monotonic(a in 0u64..5000, b in 0u64..5000) {
            let ttl = Duration::from_millis(3000);
            let (young, old) = if a <= b { (a, b) } else { (b, a) };
            let young = edges::edge_opacity(Duration::from_millis(young), ttl);
            let old = edges::edge_opacity(Duration::from_millis(old), ttl);
            prop_assert!(old <= young);
            prop_assert!((0.0..=1.0).contains(&old));
        }

        #[test]
        fn prop_single_selection(picks in prop::collection::vec(prop::option::of(0usize..8), 1..20)) {
            let config = SceneConfig::default();
            let mut registry = AgentRegistry::new(&config);
            let solvers: Vec<String> = (0..6).map(|i| format!("s{}", i)).collect();
            registry.reconcile(&roster(&["c1".into()], &solvers));

            for pick in picks {
                let id = pick.map(|i| format!("s{}", i));
                registry.select(id.as_deref());
                let selected = registry.iter().filter(|o| o.is_selected()).count();
                prop_assert!(selected <= 1);
                prop_assert_eq!(selected, registry.selected().map_or(0, |_| 1));
            }
        }
    }
}

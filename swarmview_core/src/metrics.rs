//! Scene counters.
//!
//! Plain running totals updated by the scene manager and the runtime. They
//! never affect behavior; the simulator prints them and checks them against
//! its own bookkeeping.

use serde::Serialize;

use crate::edges::{IngestReport, SweepReport};
use crate::registry::ReconcileReport;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SceneStats {
    pub frames: u64,
    pub agents_created: u64,
    pub agents_removed: u64,
    pub edges_spawned: u64,
    pub edges_expired: u64,
    pub markers_finished: u64,
    pub duplicates_skipped: u64,
    pub unresolved_events: u64,
    pub snapshots_applied: u64,
    pub snapshots_rejected: u64,
    pub picks_hit: u64,
    pub picks_missed: u64,
}

impl SceneStats {
    pub(crate) fn record_reconcile(&mut self, report: &ReconcileReport) {
        self.agents_created += report.created.len() as u64;
    }

    pub(crate) fn record_ingest(&mut self, report: &IngestReport) {
        self.edges_spawned += report.spawned as u64;
        self.duplicates_skipped += report.duplicates as u64;
        self.unresolved_events += report.unresolved as u64;
    }

    pub(crate) fn record_sweep(&mut self, report: &SweepReport) {
        self.edges_expired += report.expired.len() as u64;
        self.markers_finished += report.finished_markers.len() as u64;
    }

    pub(crate) fn record_pick(&mut self, hit: bool) {
        if hit {
            self.picks_hit += 1;
        } else {
            self.picks_missed += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let mut stats = SceneStats::default();
        stats.record_ingest(&IngestReport { spawned: 3, duplicates: 2, unresolved: 1 });
        stats.record_ingest(&IngestReport { spawned: 1, duplicates: 0, unresolved: 0 });
        stats.record_pick(true);
        stats.record_pick(false);
        stats.record_pick(false);

        assert_eq!(stats.edges_spawned, 4);
        assert_eq!(stats.duplicates_skipped, 2);
        assert_eq!(stats.unresolved_events, 1);
        assert_eq!(stats.picks_hit, 1);
        assert_eq!(stats.picks_missed, 2);
    }

    #[test]
    fn test_serializes_flat() {
        let json = serde_json::to_value(SceneStats::default()).unwrap();
        assert_eq!(json["frames"], 0);
        assert_eq!(json["picks_missed"], 0);
    }
}

//! The Transaction Edge Animator - ephemeral arcs for inter-agent messages.
//!
//! Every event in a snapshot's transaction list is tested against the dedup
//! memory first, so the sliding event window the backend re-sends on each
//! broadcast renders each message exactly once. A fresh event fans out into
//! one edge per (sender, target) pair:
//! - An arc that fades linearly to zero over the TTL and is swept at expiry
//! - A marker that travels the arc by a fixed step per frame
//!
//! Edges and markers are plain values re-evaluated by [`EdgeAnimator::tick`],
//! which is the only place either is destroyed.

use nalgebra::{Point3, Vector3};
use std::collections::{HashSet, VecDeque};
use std::time::Duration;

use crate::config::SceneConfig;
use crate::palette::{self, Color};
use crate::registry::{AgentHandle, AgentRegistry};
use crate::snapshot::{MessageKind, Role, TransactionEvent};

/// Number of straight segments an arc is drawn with.
pub const ARC_SEGMENTS: usize = 24;

/// Slack for accumulated float error when a marker reaches the end.
const PROGRESS_EPSILON: f32 = 1e-6;

// ============================================================================
// IDENTITY
// ============================================================================

/// Identity of a transaction event: (sender, timestamp).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    sender: String,
    timestamp_bits: u64,
}

impl DedupKey {
    pub fn of(event: &TransactionEvent) -> Self {
        // -0.0 and 0.0 are the same instant
        let timestamp = if event.timestamp == 0.0 { 0.0 } else { event.timestamp };
        Self {
            sender: event.from.clone(),
            timestamp_bits: timestamp.to_bits(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerId(u64);

impl EdgeId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl MarkerId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

// ============================================================================
// GEOMETRY
// ============================================================================

/// Three-point arc: a quadratic Bézier whose control point is the
/// straight-line midpoint raised by the arc height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeCurve {
    pub start: Point3<f32>,
    pub control: Point3<f32>,
    pub end: Point3<f32>,
}

impl EdgeCurve {
    pub fn arc(start: Point3<f32>, end: Point3<f32>, height: f32) -> Self {
        let control = nalgebra::center(&start, &end) + Vector3::y() * height;
        Self { start, control, end }
    }

    /// Point at parameter `t` in [0, 1].
    pub fn point_at(&self, t: f32) -> Point3<f32> {
        let t = t.clamp(0.0, 1.0);
        let u = 1.0 - t;
        let coords = self.start.coords * (u * u)
            + self.control.coords * (2.0 * u * t)
            + self.end.coords * (t * t);
        Point3::from(coords)
    }

    /// Polyline approximation with `segments + 1` points.
    pub fn tessellate(&self, segments: usize) -> Vec<Point3<f32>> {
        let segments = segments.max(1);
        (0..=segments)
            .map(|i| self.point_at(i as f32 / segments as f32))
            .collect()
    }
}

/// Opacity of an edge at a given age: linear from 1 to 0 over the TTL.
pub fn edge_opacity(age: Duration, ttl: Duration) -> f32 {
    if ttl.is_zero() || age >= ttl {
        return 0.0;
    }
    1.0 - (age.as_secs_f32() / ttl.as_secs_f32()).clamp(0.0, 1.0)
}

// ============================================================================
// EPHEMERAL OBJECTS
// ============================================================================

/// One fading arc between two agents.
#[derive(Debug, Clone)]
pub struct TransactionEdge {
    pub id: EdgeId,
    pub kind: MessageKind,
    pub source: AgentHandle,
    pub target: AgentHandle,
    pub curve: EdgeCurve,
    pub color: Color,
    pub created_at: Duration,
    pub opacity: f32,
}

impl TransactionEdge {
    pub fn age(&self, now: Duration) -> Duration {
        now.saturating_sub(self.created_at)
    }
}

/// A point traveling along an arc. Outlives or predeceases its edge
/// independently.
#[derive(Debug, Clone)]
pub struct TravelMarker {
    pub id: MarkerId,
    pub edge: EdgeId,
    pub curve: EdgeCurve,
    pub color: Color,
    frames: u32,
    step: f32,
}

impl TravelMarker {
    /// Normalized progress in [0, 1].
    pub fn progress(&self) -> f32 {
        (self.frames as f32 * self.step).min(1.0)
    }

    pub fn position(&self) -> Point3<f32> {
        self.curve.point_at(self.progress())
    }

    pub fn is_finished(&self) -> bool {
        self.frames as f32 * self.step >= 1.0 - PROGRESS_EPSILON
    }
}

// ============================================================================
// ANIMATOR
// ============================================================================

/// Result of one ingest call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Edges created
    pub spawned: usize,

    /// Events skipped because their key was already rendered
    pub duplicates: usize,

    /// Fresh events whose sender has no object yet
    pub unresolved: usize,
}

/// Result of one per-frame sweep.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepReport {
    pub expired: Vec<EdgeId>,
    pub finished_markers: Vec<MarkerId>,
}

/// Owns every live edge and marker plus the dedup memory.
#[derive(Debug)]
pub struct EdgeAnimator {
    edges: Vec<TransactionEdge>,
    markers: Vec<TravelMarker>,
    seen: HashSet<DedupKey>,
    seen_order: VecDeque<DedupKey>,
    dedup_capacity: usize,
    ttl: Duration,
    marker_step: f32,
    arc_height: f32,
    next_id: u64,
}

impl EdgeAnimator {
    pub fn new(config: &SceneConfig) -> Self {
        Self {
            edges: Vec::new(),
            markers: Vec::new(),
            seen: HashSet::new(),
            seen_order: VecDeque::new(),
            dedup_capacity: config.dedup_capacity.max(1),
            ttl: Duration::from_millis(config.edge_ttl_ms),
            marker_step: config.marker_step.clamp(1e-4, 1.0),
            arc_height: config.arc_height,
            next_id: 0,
        }
    }

    fn remember(&mut self, key: DedupKey) -> bool {
        if !self.seen.insert(key.clone()) {
            return false;
        }
        self.seen_order.push_back(key);
        while self.seen_order.len() > self.dedup_capacity {
            if let Some(oldest) = self.seen_order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        true
    }

    /// Whether an event with this key has already been consumed.
    pub fn has_seen(&self, key: &DedupKey) -> bool {
        self.seen.contains(key)
    }

    /// Spawns edges for every event not rendered before.
    ///
    /// Announcements fan out to every solver; all other kinds go to every
    /// coordinator except the sender.
    pub fn ingest(
        &mut self,
        events: &[TransactionEvent],
        registry: &AgentRegistry,
        now: Duration,
    ) -> IngestReport {
        let mut report = IngestReport::default();

        for event in events {
            if !self.remember(DedupKey::of(event)) {
                report.duplicates += 1;
                continue;
            }

            let Some(source) = registry.lookup(&event.from) else {
                report.unresolved += 1;
                continue;
            };

            let announcement = event.kind == MessageKind::TaskAnnouncement;
            let target_role = if announcement { Role::Solver } else { Role::Coordinator };
            let color = palette::message_color(&event.kind);

            for target in registry.by_role(target_role) {
                if !announcement && target.handle() == source.handle() {
                    continue;
                }
                let curve = EdgeCurve::arc(source.position(), target.position(), self.arc_height);
                let edge_id = EdgeId(self.next_id);
                let marker_id = MarkerId(self.next_id);
                self.next_id += 1;

                self.edges.push(TransactionEdge {
                    id: edge_id,
                    kind: event.kind.clone(),
                    source: source.handle(),
                    target: target.handle(),
                    curve,
                    color,
                    created_at: now,
                    opacity: 1.0,
                });
                self.markers.push(TravelMarker {
                    id: marker_id,
                    edge: edge_id,
                    curve,
                    color,
                    frames: 0,
                    step: self.marker_step,
                });
                report.spawned += 1;
            }
        }

        report
    }

    /// Per-frame sweep: expires edges past the TTL, fades the rest, and
    /// advances every marker by one step.
    pub fn tick(&mut self, now: Duration) -> SweepReport {
        let mut report = SweepReport::default();
        let ttl = self.ttl;

        self.edges.retain_mut(|edge| {
            let age = edge.age(now);
            if age >= ttl {
                report.expired.push(edge.id);
                false
            } else {
                edge.opacity = edge_opacity(age, ttl);
                true
            }
        });

        self.markers.retain_mut(|marker| {
            marker.frames = marker.frames.saturating_add(1);
            if marker.is_finished() {
                report.finished_markers.push(marker.id);
                false
            } else {
                true
            }
        });

        report
    }

    /// Drops every in-flight edge and marker (teardown). The dedup memory
    /// is cleared too.
    pub fn cancel_all(&mut self) -> SweepReport {
        let report = SweepReport {
            expired: self.edges.drain(..).map(|e| e.id).collect(),
            finished_markers: self.markers.drain(..).map(|m| m.id).collect(),
        };
        self.seen.clear();
        self.seen_order.clear();
        report
    }

    pub fn edges(&self) -> &[TransactionEdge] {
        &self.edges
    }

    pub fn markers(&self) -> &[TravelMarker] {
        &self.markers
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

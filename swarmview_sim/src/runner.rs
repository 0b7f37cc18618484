//! Scenario runner - drives the scene engine against the synthetic swarm.
//!
//! Every scenario runs synchronously on a virtual clock: one loop iteration
//! is one frame. The harness feeds oracle snapshots into the runtime inbox,
//! queues pointer presses, forwards removal requests to the oracle, and after
//! every tick re-checks the engine's invariants against its own bookkeeping.

use nalgebra::Point3;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Poisson};
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tracing::{debug, info, warn};

use swarmview_core::edges::DedupKey;
use swarmview_core::{
    decode, AgentHandle, AgentSnapshot, Delivery, EdgeId, HeadlessSurface, IngestReport,
    MessageKind, Role, SceneStats, SnapshotSender, SwarmView, TickReport,
};
use swarmview_env::{RawSnapshot, RemovalAck, SwarmViewContext};

use crate::config::SimConfig;
use crate::context::SimContext;
use crate::error::SimError;
use crate::exporter::{SimEvent, SimExport, SimFrame};
use crate::oracle::SwarmOracle;
use crate::scenarios::ScenarioId;

/// Ticks between two synthetic pointer presses.
const PICK_EVERY_TICKS: u64 = 45;

/// Seconds between two churn events.
const CHURN_EVERY_SECS: u64 = 5;

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Total ticks executed
    pub total_ticks: u64,

    /// Final simulation time in seconds
    pub final_time_secs: f64,

    /// Number of agent objects in the scene at end
    pub final_agent_count: usize,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Metrics collected during run
    pub metrics: ScenarioMetrics,

    /// Engine counters at the end of the run
    pub stats: SceneStats,

    /// Frame dump, when requested
    pub export: Option<SimExport>,
}

impl ScenarioResult {
    fn errored(scenario: ScenarioId, seed: u64, error: SimError) -> Self {
        Self {
            scenario,
            seed,
            passed: false,
            total_ticks: 0,
            final_time_secs: 0.0,
            final_agent_count: 0,
            failure_reason: Some(error.to_string()),
            metrics: ScenarioMetrics::default(),
            stats: SceneStats::default(),
            export: None,
        }
    }
}

/// Metrics collected during scenario execution.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScenarioMetrics {
    /// Frames pushed into the inbox
    pub snapshots_sent: u64,

    /// Frames deliberately broken before sending
    pub snapshots_corrupted: u64,

    /// Synthetic pointer presses
    pub picks_sent: u64,

    pub agents_joined: u64,

    /// Agents the backend dropped without a removal request
    pub agents_vanished: u64,

    pub removals_requested: u64,
    pub removals_confirmed: u64,
    pub removals_declined: u64,

    /// Ticks on which the invariant checks ran
    pub invariant_checks: u64,

    pub max_live_edges: usize,
}

// ============================================================================
// INVARIANT CHECKER
// ============================================================================

/// Independent bookkeeping the engine is checked against.
#[derive(Default)]
struct InvariantChecker {
    /// First handle and position seen for every identifier
    placements: HashMap<String, (AgentHandle, Point3<f32>)>,

    /// Every (sender, timestamp) key applied so far
    seen_events: HashSet<DedupKey>,

    /// Last opacity of every live edge
    opacities: HashMap<EdgeId, f32>,

    /// Confirmed removals; must never come back
    removed: HashSet<String>,

    /// Dropped by the backend; must stay in the scene
    persisting: HashSet<String>,
}

impl InvariantChecker {
    /// Edges spawned by an applied snapshot must match its fresh events.
    fn check_ingest(
        &mut self,
        payload: &[u8],
        ingest: &IngestReport,
        view: &SwarmView<HeadlessSurface>,
    ) -> Result<(), String> {
        let Ok(Delivery::Snapshot(snapshot)) = decode(payload) else {
            return Err("applied frame does not decode".to_string());
        };
        let registry = view.scene().registry();

        let mut expected = 0;
        for event in &snapshot.transactions {
            if !self.seen_events.insert(DedupKey::of(event)) {
                continue;
            }
            let Some(source) = registry.lookup(&event.from) else {
                continue;
            };
            let announcement = event.kind == MessageKind::TaskAnnouncement;
            let target_role = if announcement { Role::Solver } else { Role::Coordinator };
            expected += registry
                .by_role(target_role)
                .filter(|o| announcement || o.handle() != source.handle())
                .count();
        }

        if ingest.spawned != expected {
            return Err(format!(
                "snapshot spawned {} edges, {} fresh edges expected",
                ingest.spawned, expected
            ));
        }
        Ok(())
    }

    fn check_frame(
        &mut self,
        now: Duration,
        view: &SwarmView<HeadlessSurface>,
    ) -> Result<(), String> {
        let scene = view.scene();
        let registry = scene.registry();

        let mut ids = HashSet::with_capacity(registry.len());
        for object in registry.iter() {
            if !ids.insert(object.id()) {
                return Err(format!("agent {} has two objects", object.id()));
            }
            match self.placements.get(object.id()) {
                Some((handle, position)) => {
                    if *handle != object.handle() {
                        return Err(format!("agent {} changed object", object.id()));
                    }
                    if *position != object.position() {
                        return Err(format!("agent {} moved", object.id()));
                    }
                }
                None => {
                    self.placements
                        .insert(object.id().to_owned(), (object.handle(), object.position()));
                }
            }
        }

        if let Some(id) = self
            .removed
            .iter()
            .find(|id| registry.contains(id) || !registry.is_removed(id))
        {
            return Err(format!("removed agent {} is back", id));
        }
        if let Some(id) = self
            .persisting
            .iter()
            .find(|id| !self.removed.contains(*id) && !registry.contains(id))
        {
            return Err(format!("agent {} vanished from the scene", id));
        }

        let animator = scene.animator();
        let ttl = animator.ttl();
        let mut live = HashMap::with_capacity(animator.edges().len());
        for edge in animator.edges() {
            if edge.age(now) >= ttl {
                return Err(format!("edge {} outlived its ttl", edge.id.raw()));
            }
            if !(0.0..=1.0).contains(&edge.opacity) {
                return Err(format!("edge {} opacity {} out of range", edge.id.raw(), edge.opacity));
            }
            if let Some(previous) = self.opacities.get(&edge.id) {
                if edge.opacity > *previous + 1e-6 {
                    return Err(format!("edge {} brightened", edge.id.raw()));
                }
            }
            live.insert(edge.id, edge.opacity);
        }
        self.opacities = live;

        let selected = registry.iter().filter(|o| o.is_selected()).count();
        if selected > 1 {
            return Err(format!("{} objects selected", selected));
        }
        let published = view.selection().map(|s| s.agent_id);
        let actual = registry.selected().map(|o| o.id().to_owned());
        if published != actual {
            return Err(format!(
                "selection output {:?} disagrees with scene {:?}",
                published, actual
            ));
        }
        Ok(())
    }
}

// ============================================================================
// HARNESS
// ============================================================================

struct Harness {
    scenario: ScenarioId,
    seed: u64,
    ctx: SimContext,
    oracle: SwarmOracle,
    surface: HeadlessSurface,
    view: SwarmView<HeadlessSurface>,
    sender: SnapshotSender,
    rng: ChaCha8Rng,
    checker: InvariantChecker,
    metrics: ScenarioMetrics,
    export: Option<SimExport>,
    events: Vec<SimEvent>,
    last_pushed: Option<Vec<u8>>,
    frame_dt: Duration,
    frame_rate_hz: u64,
    ticks: u64,
    failure: Option<String>,
}

impl Harness {
    fn new(
        scenario: ScenarioId,
        config: &SimConfig,
        oracle: SwarmOracle,
        export: bool,
    ) -> Result<Self, SimError> {
        let surface = HeadlessSurface::new();
        let (mut view, sender) = SwarmView::new(surface.clone(), config.scene.clone());
        view.initialize()?;

        Ok(Self {
            scenario,
            seed: config.seed,
            ctx: SimContext::new(config.seed),
            oracle,
            surface,
            view,
            sender,
            // Scenario chaos uses its own stream so it never perturbs the swarm
            rng: ChaCha8Rng::seed_from_u64(config.seed.wrapping_mul(0x9e3779b97f4a7c15)),
            checker: InvariantChecker::default(),
            metrics: ScenarioMetrics::default(),
            export: export.then(|| SimExport::new(scenario.name(), config.seed)),
            events: Vec::new(),
            last_pushed: None,
            frame_dt: config.frame_interval(),
            frame_rate_hz: config.frame_rate_hz.max(1) as u64,
            ticks: 0,
            failure: None,
        })
    }

    fn ticks_per_snapshot(&self) -> u64 {
        let interval = self.oracle.config().snapshot_interval().as_secs_f64();
        ((interval * self.frame_rate_hz as f64).round() as u64).max(1)
    }

    fn fail(&mut self, reason: String) {
        if self.failure.is_none() {
            warn!("✗ {}: {}", self.scenario.name(), reason);
            self.events.push(SimEvent::warn(reason.clone()));
            self.failure = Some(reason);
        }
    }

    /// Moves the clock and the backend forward by one frame.
    fn advance(&mut self) {
        self.ctx.advance_time(self.frame_dt);
        self.oracle.step(self.frame_dt);
    }

    fn push(&mut self, payload: Vec<u8>) {
        self.metrics.snapshots_sent += 1;
        let received_at_ms = self.ctx.now().as_millis() as u64;
        self.sender.push(RawSnapshot::new(payload.clone(), received_at_ms));
        self.last_pushed = Some(payload);
    }

    fn push_snapshot(&mut self) -> Result<(), SimError> {
        let payload = self.oracle.snapshot_bytes()?;
        self.push(payload);
        Ok(())
    }

    /// Queues a press on a random object or on empty space.
    fn press(&mut self) {
        let scene = self.view.scene();
        let Some(camera) = scene.camera() else {
            return;
        };
        let viewport = scene.viewport();
        let targets: Vec<Point3<f32>> = scene.registry().iter().map(|o| o.position()).collect();

        let (x, y) = match targets.choose(&mut self.rng) {
            Some(target) if self.rng.gen_bool(0.75) => {
                let ndc = camera.project(target);
                (
                    (ndc.x + 1.0) / 2.0 * viewport.width as f32,
                    (1.0 - ndc.y) / 2.0 * viewport.height as f32,
                )
            }
            _ => (2.0, 2.0),
        };
        self.metrics.picks_sent += 1;
        self.view.on_pointer(x, y);
    }

    fn request_removal(&mut self, agent_id: &str) {
        if self.view.request_removal(agent_id).is_some() {
            self.metrics.removals_requested += 1;
            self.events
                .push(SimEvent::info(format!("removal requested for {}", agent_id)));
        }
    }

    fn tick(&mut self) -> Result<TickReport, SimError> {
        let pushed = self.last_pushed.take();
        let before: Option<Vec<(String, AgentSnapshot)>> = pushed.as_ref().map(|_| {
            self.view
                .scene()
                .registry()
                .iter()
                .map(|o| (o.id().to_owned(), o.snapshot().clone()))
                .collect()
        });

        let now = self.ctx.now();
        let report = self.view.tick(now)?;
        self.ticks += 1;

        if let Some(e) = &report.rejected {
            self.events.push(SimEvent::warn(format!("snapshot rejected: {}", e)));
            let after: Vec<(String, AgentSnapshot)> = self
                .view
                .scene()
                .registry()
                .iter()
                .map(|o| (o.id().to_owned(), o.snapshot().clone()))
                .collect();
            if before.as_ref() != Some(&after) {
                self.fail("rejected snapshot changed the registry".to_string());
            }
        }
        if let (Some(applied), Some(payload)) = (&report.applied, &pushed) {
            if let Err(reason) = self.checker.check_ingest(payload, &applied.ingest, &self.view) {
                self.fail(reason);
            }
        }

        self.forward_removals()?;

        self.metrics.invariant_checks += 1;
        if let Err(reason) = self.checker.check_frame(now, &self.view) {
            self.fail(reason);
        }
        let live_edges = self.view.scene().animator().edges().len();
        self.metrics.max_live_edges = self.metrics.max_live_edges.max(live_edges);

        if self.ticks % self.ticks_per_snapshot() == 0 {
            let events = std::mem::take(&mut self.events);
            if let Some(export) = self.export.as_mut() {
                let scene = self.view.scene();
                export.add_frame(SimFrame::capture(
                    now,
                    scene.registry(),
                    scene.animator(),
                    events,
                ));
            }
        }
        if self.ticks % self.frame_rate_hz == 0 {
            debug!(
                "  t={:.1}s | agents={} | edges={} | markers={}",
                now.as_secs_f64(),
                self.view.scene().registry().len(),
                live_edges,
                self.view.scene().animator().markers().len()
            );
        }

        Ok(report)
    }

    /// Answers removal requests the way the backend's control API does.
    fn forward_removals(&mut self) -> Result<(), SimError> {
        for request in self.view.drain_removal_requests() {
            let accepted = self.oracle.remove_agent(&request.agent_id);
            let ack = RemovalAck {
                request_id: request.request_id,
                agent_id: request.agent_id.clone(),
                accepted,
            };
            if self.view.confirm_removal(&ack)? {
                self.metrics.removals_confirmed += 1;
                self.checker.removed.insert(request.agent_id);
            } else {
                self.metrics.removals_declined += 1;
            }
        }
        Ok(())
    }

    fn stats(&self) -> SceneStats {
        self.view.stats()
    }

    fn finish(mut self, requirements: &[(bool, String)]) -> ScenarioResult {
        let stats = self.view.stats();
        let final_agent_count = self.view.scene().registry().len();

        self.view.teardown();
        if !self.surface.log().released {
            self.fail("render surface not released on teardown".to_string());
        }

        let failure = self.failure.take().or_else(|| {
            requirements
                .iter()
                .find(|(ok, _)| !ok)
                .map(|(_, reason)| reason.clone())
        });
        let passed = failure.is_none();
        let export = self.export.take().map(|mut export| {
            export.finalize(passed, failure.clone());
            export
        });

        ScenarioResult {
            scenario: self.scenario,
            seed: self.seed,
            passed,
            total_ticks: self.ticks,
            final_time_secs: self.ctx.now().as_secs_f64(),
            final_agent_count,
            failure_reason: failure,
            metrics: self.metrics,
            stats,
            export,
        }
    }
}

// ============================================================================
// RUNNER
// ============================================================================

/// Runs chaos scenarios.
pub struct ScenarioRunner {
    config: SimConfig,

    /// Simulated duration in seconds
    max_duration_secs: f64,

    /// Record frames for `--export`
    export: bool,
}

impl ScenarioRunner {
    /// Creates a runner with the default swarm.
    pub fn new(seed: u64) -> Self {
        Self::with_config(SimConfig::default().with_seed(seed))
    }

    pub fn with_config(config: SimConfig) -> Self {
        Self {
            config,
            max_duration_secs: 30.0,
            export: false,
        }
    }

    /// Sets the simulated duration.
    pub fn with_duration(mut self, secs: f64) -> Self {
        self.max_duration_secs = secs;
        self
    }

    pub fn with_export(mut self, export: bool) -> Self {
        self.export = export;
        self
    }

    pub fn seed(&self) -> u64 {
        self.config.seed
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.config.seed);

        let outcome = match scenario {
            ScenarioId::Steady => self.run_steady(),
            ScenarioId::Reorder => self.run_reorder(),
            ScenarioId::Corrupt => self.run_corrupt(),
            ScenarioId::Churn => self.run_churn(),
            ScenarioId::Burst => self.run_burst(),
        };
        outcome.unwrap_or_else(|e| ScenarioResult::errored(scenario, self.config.seed, e))
    }

    fn target_ticks(&self) -> u64 {
        (self.max_duration_secs * self.config.frame_rate_hz as f64) as u64
    }

    fn harness(&self, scenario: ScenarioId, oracle: SwarmOracle) -> Result<Harness, SimError> {
        let mut harness = Harness::new(scenario, &self.config, oracle, self.export)?;
        let initial = harness.oracle.initial_state_bytes()?;
        harness.push(initial);
        Ok(harness)
    }

    /// Runs the frame loop; `per_tick` may push frames or perturb the swarm
    /// before each tick.
    fn run_loop<F>(&self, h: &mut Harness, mut per_tick: F) -> Result<(), SimError>
    where
        F: FnMut(&mut Harness, u64) -> Result<(), SimError>,
    {
        for tick in 0..self.target_ticks() {
            if tick > 0 {
                h.advance();
                per_tick(h, tick)?;
                if tick % PICK_EVERY_TICKS == 0 {
                    h.press();
                }
            }
            h.tick()?;
        }
        Ok(())
    }

    /// SV-001: Steady - plain backend feed.
    ///
    /// **Assertion**: invariants hold every tick; edges spawn and expire.
    fn run_steady(&self) -> Result<ScenarioResult, SimError> {
        info!("SV-001: Steady - plain backend feed");
        let mut h = self.harness(ScenarioId::Steady, SwarmOracle::new(self.config.clone()))?;
        let snapshot_every = h.ticks_per_snapshot();

        self.run_loop(&mut h, |h, tick| {
            if tick % snapshot_every == 0 {
                h.push_snapshot()?;
            }
            Ok(())
        })?;

        let stats = h.stats();
        info!(
            "✓ Steady complete: {} snapshots, {} edges spawned, {} expired",
            stats.snapshots_applied, stats.edges_spawned, stats.edges_expired
        );
        Ok(h.finish(&[
            (stats.snapshots_applied > 0, "no snapshot applied".to_string()),
            (stats.edges_spawned > 0, "no transaction edges spawned".to_string()),
            (stats.edges_expired > 0, "no edge reached its ttl".to_string()),
        ]))
    }

    /// SV-002: Reorder - roster shuffled on every snapshot.
    ///
    /// **Assertion**: no object is created after the first snapshot and no
    /// object moves.
    fn run_reorder(&self) -> Result<ScenarioResult, SimError> {
        info!("SV-002: Reorder - shuffled rosters");
        let oracle = SwarmOracle::new(self.config.clone()).with_shuffled_roster(true);
        let initial_agents = oracle.agent_count() as u64;
        let mut h = self.harness(ScenarioId::Reorder, oracle)?;
        let snapshot_every = h.ticks_per_snapshot();

        self.run_loop(&mut h, |h, tick| {
            if tick % snapshot_every == 0 {
                h.push_snapshot()?;
            }
            Ok(())
        })?;

        let stats = h.stats();
        info!(
            "✓ Reorder complete: {} snapshots, {} objects created",
            stats.snapshots_applied, stats.agents_created
        );
        Ok(h.finish(&[
            (stats.snapshots_applied > 1, "fewer than two snapshots applied".to_string()),
            (
                stats.agents_created == initial_agents,
                format!(
                    "{} objects created for {} agents",
                    stats.agents_created, initial_agents
                ),
            ),
        ]))
    }

    /// SV-003: Corrupt - every third frame is broken.
    ///
    /// **Assertion**: every broken frame is rejected without touching the
    /// registry; good frames keep applying.
    fn run_corrupt(&self) -> Result<ScenarioResult, SimError> {
        info!("SV-003: Corrupt - malformed frames");
        let mut h = self.harness(ScenarioId::Corrupt, SwarmOracle::new(self.config.clone()))?;
        let snapshot_every = h.ticks_per_snapshot();
        let mut sent = 0u64;

        self.run_loop(&mut h, |h, tick| {
            if tick % snapshot_every != 0 {
                return Ok(());
            }
            sent += 1;
            let payload = h.oracle.snapshot_bytes()?;
            if sent % 3 == 0 {
                let broken = corrupt(payload, &mut h.rng)?;
                h.metrics.snapshots_corrupted += 1;
                h.push(broken);
            } else {
                h.push(payload);
            }
            Ok(())
        })?;

        let stats = h.stats();
        let corrupted = h.metrics.snapshots_corrupted;
        info!(
            "✓ Corrupt complete: {} applied, {}/{} corrupted frames rejected",
            stats.snapshots_applied, stats.snapshots_rejected, corrupted
        );
        Ok(h.finish(&[
            (corrupted > 0, "no frame corrupted".to_string()),
            (
                stats.snapshots_rejected == corrupted,
                format!("{} rejected, {} corrupted", stats.snapshots_rejected, corrupted),
            ),
            (stats.snapshots_applied > 0, "no snapshot applied".to_string()),
        ]))
    }

    /// SV-004: Churn - agents join, vanish and get removed.
    ///
    /// **Assertion**: vanished agents keep their objects; removed agents
    /// stay gone; joiners get exactly one new object.
    fn run_churn(&self) -> Result<ScenarioResult, SimError> {
        info!("SV-004: Churn - joins, departures and removals");
        let oracle = SwarmOracle::new(self.config.clone());
        let initial_agents = oracle.agent_count() as u64;
        let mut h = self.harness(ScenarioId::Churn, oracle)?;
        let snapshot_every = h.ticks_per_snapshot();
        let churn_every = CHURN_EVERY_SECS * h.frame_rate_hz;
        let mut round = 0u64;

        self.run_loop(&mut h, |h, tick| {
            if tick % churn_every == 0 {
                match round % 3 {
                    0 => {
                        let role = if h.rng.gen_bool(0.3) {
                            Role::Coordinator
                        } else {
                            Role::Solver
                        };
                        let id = h.oracle.add_agent(role);
                        h.metrics.agents_joined += 1;
                        h.events.push(SimEvent::info(format!("{} joined", id)));
                    }
                    1 => {
                        let ids = h.oracle.agent_ids(Role::Solver);
                        if let Some(id) = ids.choose(&mut h.rng).cloned() {
                            h.oracle.remove_agent(&id);
                            if h.view.scene().registry().contains(&id) {
                                h.checker.persisting.insert(id.clone());
                            }
                            h.metrics.agents_vanished += 1;
                            h.events.push(SimEvent::info(format!("{} left the swarm", id)));
                        }
                    }
                    _ => {
                        let live: Vec<String> = h
                            .view
                            .scene()
                            .registry()
                            .iter()
                            .map(|o| o.id().to_owned())
                            .filter(|id| h.oracle.contains(id))
                            .collect();
                        if let Some(id) = live.choose(&mut h.rng).cloned() {
                            h.request_removal(&id);
                        }
                    }
                }
                round += 1;
            }
            if tick % snapshot_every == 0 {
                h.push_snapshot()?;
            }
            Ok(())
        })?;

        let stats = h.stats();
        let joined = h.metrics.agents_joined;
        info!(
            "✓ Churn complete: {} joined, {} vanished, {} removed",
            joined, h.metrics.agents_vanished, h.metrics.removals_confirmed
        );
        let confirmed = h.metrics.removals_confirmed;
        let long_enough = h.ticks > churn_every;
        Ok(h.finish(&[
            (joined > 0 || !long_enough, "no agent joined".to_string()),
            (
                stats.agents_created == initial_agents + joined,
                format!(
                    "{} objects created for {} agents",
                    stats.agents_created,
                    initial_agents + joined
                ),
            ),
            (
                stats.agents_removed == confirmed,
                format!("{} objects removed, {} removals confirmed", stats.agents_removed, confirmed),
            ),
        ]))
    }

    /// SV-005: Burst - announcement storms, several frames per tick.
    ///
    /// **Assertion**: coalesced frames never double-spawn edges and every
    /// repeated event is skipped.
    fn run_burst(&self) -> Result<ScenarioResult, SimError> {
        info!("SV-005: Burst - announcement storms");
        let announcements = Poisson::new(3.0).map_err(|e| SimError::Distribution(e.to_string()))?;
        let extra_frames = Poisson::new(1.5).map_err(|e| SimError::Distribution(e.to_string()))?;
        let mut h = self.harness(ScenarioId::Burst, SwarmOracle::new(self.config.clone()))?;
        let snapshot_every = h.ticks_per_snapshot();

        self.run_loop(&mut h, |h, tick| {
            if h.rng.gen_bool(0.1) {
                let frames = 1 + extra_frames.sample(&mut h.rng) as u64;
                for _ in 0..frames {
                    let count = announcements.sample(&mut h.rng) as u64;
                    for _ in 0..count {
                        h.oracle.force_announcement();
                    }
                    h.push_snapshot()?;
                }
            } else if tick % snapshot_every == 0 {
                h.push_snapshot()?;
            }
            Ok(())
        })?;

        let stats = h.stats();
        info!(
            "✓ Burst complete: {} frames sent, {} applied, {} duplicates skipped",
            h.metrics.snapshots_sent, stats.snapshots_applied, stats.duplicates_skipped
        );
        let sent = h.metrics.snapshots_sent;
        Ok(h.finish(&[
            (
                sent > stats.snapshots_applied,
                "no frames were coalesced".to_string(),
            ),
            (stats.duplicates_skipped > 0, "no duplicate event skipped".to_string()),
            (stats.edges_spawned > 0, "no transaction edges spawned".to_string()),
        ]))
    }
}

/// Breaks a frame in one of several structural ways.
fn corrupt(payload: Vec<u8>, rng: &mut ChaCha8Rng) -> Result<Vec<u8>, SimError> {
    let mut frame: Value = serde_json::from_slice(&payload)?;
    match rng.gen_range(0..5) {
        0 => {
            let mut truncated = payload;
            truncated.truncate(truncated.len() / 2);
            return Ok(truncated);
        }
        1 => frame["data"]["agents"] = Value::from("corrupted"),
        2 => frame["data"]["transactions"] = Value::from(42),
        3 => frame["type"] = Value::from("swarm_upgrade"),
        _ => match frame["data"]["agents"]["solvers"].get(0).cloned() {
            Some(first) => {
                if let Some(solvers) = frame["data"]["agents"]["solvers"].as_array_mut() {
                    solvers.push(first);
                }
            }
            None => frame["data"] = Value::from("corrupted"),
        },
    }
    Ok(serde_json::to_vec(&frame)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runner(seed: u64) -> ScenarioRunner {
        ScenarioRunner::new(seed).with_duration(30.0)
    }

    #[test]
    fn test_steady_passes() {
        let result = runner(42).run(ScenarioId::Steady);
        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.total_ticks, 1800);
        assert_eq!(result.final_agent_count, 8);
        assert!(result.stats.edges_spawned > 0);
        assert!(result.metrics.picks_sent > 0);
    }

    #[test]
    fn test_reorder_keeps_objects() {
        let result = runner(7).run(ScenarioId::Reorder);
        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.stats.agents_created, 8);
    }

    #[test]
    fn test_corrupt_frames_rejected() {
        let result = runner(42).run(ScenarioId::Corrupt);
        assert!(result.passed, "{:?}", result.failure_reason);
        assert!(result.metrics.snapshots_corrupted > 0);
        assert_eq!(result.stats.snapshots_rejected, result.metrics.snapshots_corrupted);
    }

    #[test]
    fn test_churn_removes_through_control_path() {
        let result = runner(42).run(ScenarioId::Churn);
        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.metrics.agents_joined, 2);
        assert_eq!(result.metrics.removals_confirmed, 1);
        assert_eq!(result.stats.agents_removed, 1);
    }

    #[test]
    fn test_burst_coalesces() {
        let result = runner(42).run(ScenarioId::Burst);
        assert!(result.passed, "{:?}", result.failure_reason);
        assert!(result.metrics.snapshots_sent > result.stats.snapshots_applied);
    }

    #[test]
    fn test_same_seed_same_result() {
        let a = runner(99).run(ScenarioId::Burst);
        let b = runner(99).run(ScenarioId::Burst);
        assert_eq!(a.stats, b.stats);
        assert_eq!(a.metrics.snapshots_sent, b.metrics.snapshots_sent);
    }

    #[test]
    fn test_export_records_frames() {
        let result = ScenarioRunner::new(3)
            .with_duration(5.0)
            .with_export(true)
            .run(ScenarioId::Steady);
        let export = result.export.expect("export requested");
        assert_eq!(export.scenario, "steady");
        assert_eq!(export.frames.len(), 10);
        assert!(export.frames.iter().all(|f| f.agents.len() == 8));
    }

    #[test]
    fn test_corrupt_always_breaks_decoding() {
        let mut oracle = SwarmOracle::new(SimConfig::default());
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..50 {
            let broken = corrupt(oracle.snapshot_bytes().unwrap(), &mut rng).unwrap();
            assert!(decode(&broken).is_err());
        }
    }
}

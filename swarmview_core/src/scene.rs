//! Scene Manager - owns the surface, camera, lights and the frame loop.
//!
//! Lifecycle: `new` → `initialize` (acquires the backend exactly once) →
//! any number of `apply_snapshot`/`tick`/`resize`/`pick` → `teardown`.
//! Backend resources live in a [`SceneContext`] whose `Drop` releases them,
//! so a panic or an early return still frees the surface.

use std::time::Duration;
use tracing::{debug, info};

use crate::camera::{CameraPose, OrbitCamera};
use crate::config::SceneConfig;
use crate::edges::{EdgeAnimator, EdgeId, IngestReport, MarkerId};
use crate::error::SceneError;
use crate::metrics::SceneStats;
use crate::picking::{self, CanvasRect};
use crate::registry::{AgentRegistry, ReconcileReport};
use crate::render::{default_lights, Frame, Light, RenderBackend, RenderError, SurfaceProvider, Viewport};
use crate::snapshot::{AgentSnapshot, SwarmSnapshot};

/// Resources that exist only between `initialize` and `teardown`.
struct SceneContext<B: RenderBackend> {
    backend: B,
    camera: OrbitCamera,
    lights: Vec<Light>,
    canvas: CanvasRect,
    frame_index: u64,
}

impl<B: RenderBackend> Drop for SceneContext<B> {
    fn drop(&mut self) {
        self.backend.release();
    }
}

/// Result of applying one snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplyReport {
    pub reconcile: ReconcileReport,
    pub ingest: IngestReport,
}

/// Result of one rendered frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub index: u64,
    pub edges_expired: usize,
    pub markers_finished: usize,
    pub live_edges: usize,
    pub live_markers: usize,
}

pub struct SceneManager<P: SurfaceProvider> {
    provider: P,
    config: SceneConfig,
    viewport: Viewport,
    registry: AgentRegistry,
    animator: EdgeAnimator,
    context: Option<SceneContext<P::Backend>>,

    /// Retirements not yet delivered to the backend; kept until a frame
    /// renders successfully
    retired_agents: Vec<String>,
    retired_edges: Vec<EdgeId>,
    retired_markers: Vec<MarkerId>,
    torn_down: bool,
    stats: SceneStats,
}

impl<P: SurfaceProvider> SceneManager<P> {
    pub fn new(provider: P, config: SceneConfig) -> Self {
        let viewport = Viewport::new(config.viewport_width, config.viewport_height);
        Self {
            provider,
            registry: AgentRegistry::new(&config),
            animator: EdgeAnimator::new(&config),
            config,
            viewport,
            context: None,
            retired_agents: Vec::new(),
            retired_edges: Vec::new(),
            retired_markers: Vec::new(),
            torn_down: false,
            stats: SceneStats::default(),
        }
    }

    fn ensure_live(&self) -> Result<(), SceneError> {
        if self.torn_down {
            Err(SceneError::TornDown)
        } else {
            Ok(())
        }
    }

    /// Acquires the render backend and builds camera and lights. Calling it
    /// again on an initialized scene is a no-op.
    pub fn initialize(&mut self) -> Result<(), SceneError> {
        self.ensure_live()?;
        if self.context.is_some() {
            return Ok(());
        }

        let backend = self.provider.acquire(self.viewport).map_err(|e| match e {
            RenderError::SurfaceUnavailable(reason) | RenderError::Backend(reason) => {
                SceneError::SurfaceUnavailable(reason)
            }
        })?;

        self.context = Some(SceneContext {
            backend,
            camera: OrbitCamera::new(
                self.config.camera.clone(),
                self.viewport.width,
                self.viewport.height,
            ),
            lights: default_lights(),
            canvas: CanvasRect::full(self.viewport.width, self.viewport.height),
            frame_index: 0,
        });

        info!(
            "🎬 Scene initialized ({}x{})",
            self.viewport.width, self.viewport.height
        );
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.context.is_some()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Reconciles the roster and ingests the transaction list of one
    /// already-validated snapshot.
    pub fn apply_snapshot(
        &mut self,
        snapshot: &SwarmSnapshot,
        now: Duration,
    ) -> Result<ApplyReport, SceneError> {
        self.ensure_live()?;

        let reconcile = self.registry.reconcile(&snapshot.roster);
        let ingest = self.animator.ingest(&snapshot.transactions, &self.registry, now);

        self.stats.record_reconcile(&reconcile);
        self.stats.record_ingest(&ingest);
        self.stats.snapshots_applied += 1;

        Ok(ApplyReport { reconcile, ingest })
    }

    pub(crate) fn record_rejected(&mut self) {
        self.stats.snapshots_rejected += 1;
    }

    /// Orbits the camera, sweeps edges and markers, and renders one frame.
    pub fn tick(&mut self, now: Duration) -> Result<FrameReport, SceneError> {
        self.ensure_live()?;
        let ctx = self.context.as_mut().ok_or(SceneError::NotInitialized)?;

        ctx.camera.orbit(now);
        let sweep = self.animator.tick(now);
        self.stats.record_sweep(&sweep);
        self.retired_edges.extend_from_slice(&sweep.expired);
        self.retired_markers.extend_from_slice(&sweep.finished_markers);

        let frame = Frame {
            index: ctx.frame_index,
            time: now,
            camera: ctx.camera.pose(),
            lights: &ctx.lights,
            agents: &self.registry,
            edges: &self.animator,
            retired_edges: &self.retired_edges,
            retired_markers: &self.retired_markers,
            retired_agents: &self.retired_agents,
        };
        ctx.backend.render(&frame)?;

        self.retired_agents.clear();
        self.retired_edges.clear();
        self.retired_markers.clear();

        let report = FrameReport {
            index: ctx.frame_index,
            edges_expired: sweep.expired.len(),
            markers_finished: sweep.finished_markers.len(),
            live_edges: self.animator.edges().len(),
            live_markers: self.animator.markers().len(),
        };
        ctx.frame_index += 1;
        self.stats.frames += 1;
        Ok(report)
    }

    /// Resizes the viewport. Zero-sized requests (minimized canvas) are
    /// ignored.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), SceneError> {
        self.ensure_live()?;
        let viewport = Viewport::new(width, height);
        if viewport.is_empty() {
            debug!("Ignoring zero-sized resize {}x{}", width, height);
            return Ok(());
        }
        self.viewport = viewport;

        if let Some(ctx) = self.context.as_mut() {
            ctx.camera.set_viewport(width, height);
            ctx.canvas = CanvasRect::full(width, height);
            ctx.backend.resize(viewport)?;
        }
        Ok(())
    }

    /// Resolves a pointer position at scene time `t`. Returns `None` without
    /// touching the selection when the scene is not running.
    pub fn pick(&mut self, x: f32, y: f32, t: Duration) -> Option<AgentSnapshot> {
        if self.torn_down {
            return None;
        }
        let ctx = self.context.as_ref()?;
        let hit = picking::pick(&mut self.registry, ctx.camera.pose(), &ctx.canvas, (x, y), t);
        self.stats.record_pick(hit.is_some());
        hit
    }

    /// Sets or clears the selection by identifier.
    pub fn select(&mut self, agent_id: Option<&str>) -> Option<AgentSnapshot> {
        self.registry
            .select(agent_id)
            .map(|object| object.snapshot().clone())
    }

    /// Removes an agent object. Only the confirmed control path calls this.
    pub fn remove_agent(&mut self, agent_id: &str) -> Result<bool, SceneError> {
        self.ensure_live()?;
        match self.registry.remove(agent_id) {
            Some(_) => {
                info!("🗑️  Removed agent object {}", agent_id);
                self.retired_agents.push(agent_id.to_owned());
                self.stats.agents_removed += 1;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Cancels in-flight markers, drops every object and releases the
    /// backend. Safe to call more than once.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        let cancelled = self.animator.cancel_all();
        let dropped = self.registry.clear();
        self.retired_agents.clear();
        self.retired_edges.clear();
        self.retired_markers.clear();

        if let Some(mut ctx) = self.context.take() {
            ctx.backend.release();
        }

        info!(
            "🧹 Scene torn down: {} objects, {} edges, {} markers released",
            dropped.len(),
            cancelled.expired.len(),
            cancelled.finished_markers.len()
        );
    }

    pub fn camera(&self) -> Option<&CameraPose> {
        self.context.as_ref().map(|ctx| ctx.camera.pose())
    }

    pub fn lights(&self) -> &[Light] {
        self.context
            .as_ref()
            .map(|ctx| ctx.lights.as_slice())
            .unwrap_or_default()
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    pub fn animator(&self) -> &EdgeAnimator {
        &self.animator
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn stats(&self) -> SceneStats {
        self.stats
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }
}

impl<P: SurfaceProvider> Drop for SceneManager<P> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{HeadlessBackend, HeadlessSurface};
    use crate::snapshot::{MessageKind, Role, Roster, TransactionEvent};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    /// Headless surface whose frames can be made to fail on demand.
    struct FlakySurface {
        inner: HeadlessSurface,
        failing: Arc<AtomicBool>,
    }

    struct FlakyBackend {
        inner: HeadlessBackend,
        failing: Arc<AtomicBool>,
    }

    impl RenderBackend for FlakyBackend {
        fn render(&mut self, frame: &Frame<'_>) -> Result<(), RenderError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(RenderError::Backend("frame dropped".into()));
            }
            self.inner.render(frame)
        }

        fn resize(&mut self, viewport: Viewport) -> Result<(), RenderError> {
            self.inner.resize(viewport)
        }

        fn release(&mut self) {
            self.inner.release();
        }
    }

    impl SurfaceProvider for FlakySurface {
        type Backend = FlakyBackend;

        fn acquire(&mut self, viewport: Viewport) -> Result<FlakyBackend, RenderError> {
            Ok(FlakyBackend {
                inner: self.inner.acquire(viewport)?,
                failing: Arc::clone(&self.failing),
            })
        }
    }

    fn snapshot(solvers: &[&str], transactions: Vec<TransactionEvent>) -> SwarmSnapshot {
        SwarmSnapshot {
            roster: Roster {
                coordinators: vec![AgentSnapshot::new("c1", Role::Coordinator)],
                solvers: solvers
                    .iter()
                    .map(|id| AgentSnapshot::new(*id, Role::Solver))
                    .collect(),
            },
            transactions,
            timestamp: None,
        }
    }

    fn scene() -> SceneManager<HeadlessSurface> {
        SceneManager::new(HeadlessSurface::new(), SceneConfig::default())
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let mut scene = scene();
        scene.initialize().unwrap();
        scene.initialize().unwrap();
        assert_eq!(scene.provider().log().acquisitions, 1);
        assert_eq!(scene.lights().len(), 2);
    }

    #[test]
    fn test_surface_failure_is_fatal() {
        let mut scene = SceneManager::new(HeadlessSurface::unavailable("lost"), SceneConfig::default());
        assert!(matches!(
            scene.initialize(),
            Err(SceneError::SurfaceUnavailable(reason)) if reason == "lost"
        ));
        assert!(!scene.is_initialized());
        assert!(matches!(scene.tick(Duration::ZERO), Err(SceneError::NotInitialized)));
    }

    #[test]
    fn test_tick_renders_and_expires() {
        let mut scene = scene();
        scene.initialize().unwrap();

        let events = vec![TransactionEvent::new("c1", MessageKind::TaskAnnouncement, 100.0)];
        let applied = scene
            .apply_snapshot(&snapshot(&["s1", "s2"], events), Duration::from_millis(100))
            .unwrap();
        assert_eq!(applied.reconcile.created.len(), 3);
        assert_eq!(applied.ingest.spawned, 2);

        let first = scene.tick(Duration::from_millis(116)).unwrap();
        assert_eq!(first.index, 0);
        assert_eq!(first.live_edges, 2);
        assert_eq!(scene.provider().log().live_edges.len(), 2);

        let last = scene.tick(Duration::from_millis(3100)).unwrap();
        assert_eq!(last.edges_expired, 2);
        assert_eq!(last.live_edges, 0);
        assert!(scene.provider().log().live_edges.is_empty());
        assert_eq!(scene.stats().frames, 2);
        assert_eq!(scene.stats().edges_expired, 2);
    }

    #[test]
    fn test_failed_render_keeps_retirements() {
        let log = HeadlessSurface::new();
        let failing = Arc::new(AtomicBool::new(false));
        let surface = FlakySurface {
            inner: log.clone(),
            failing: Arc::clone(&failing),
        };
        let mut scene = SceneManager::new(surface, SceneConfig::default());
        scene.initialize().unwrap();

        let events = vec![TransactionEvent::new("c1", MessageKind::TaskAnnouncement, 100.0)];
        scene
            .apply_snapshot(&snapshot(&["s1", "s2"], events), Duration::from_millis(100))
            .unwrap();
        scene.tick(Duration::from_millis(116)).unwrap();
        assert_eq!(log.log().live_edges.len(), 2);

        failing.store(true, Ordering::SeqCst);
        assert!(scene.tick(Duration::from_millis(3100)).is_err());
        assert!(scene.animator().edges().is_empty());
        assert_eq!(scene.stats().edges_expired, 2);
        assert_eq!(log.log().live_edges.len(), 2);

        // The next good frame delivers the expiries the failed one dropped
        failing.store(false, Ordering::SeqCst);
        scene.tick(Duration::from_millis(3116)).unwrap();
        assert!(log.log().live_edges.is_empty());
        assert!(log.log().live_markers.is_empty());
        assert_eq!(scene.stats().edges_expired, 2);
    }

    #[test]
    fn test_zero_resize_ignored() {
        let mut scene = scene();
        scene.initialize().unwrap();
        scene.resize(0, 0).unwrap();
        assert_eq!(scene.viewport(), Viewport::new(1280, 720));
        scene.resize(800, 600).unwrap();
        assert_eq!(scene.provider().log().viewport, Some(Viewport::new(800, 600)));
    }

    #[test]
    fn test_pick_uninitialized_is_none() {
        let mut scene = scene();
        scene.apply_snapshot(&snapshot(&["s1"], vec![]), Duration::ZERO).unwrap();
        assert!(scene.pick(640.0, 360.0, Duration::ZERO).is_none());
        assert_eq!(scene.stats().picks_missed, 0);
    }

    #[test]
    fn test_removed_agent_retired_next_frame() {
        let mut scene = scene();
        scene.initialize().unwrap();
        scene.apply_snapshot(&snapshot(&["s1"], vec![]), Duration::ZERO).unwrap();
        scene.tick(Duration::ZERO).unwrap();
        assert!(scene.provider().log().live_agents.contains("s1"));

        assert!(scene.remove_agent("s1").unwrap());
        assert!(!scene.remove_agent("s1").unwrap());
        scene.tick(Duration::from_millis(16)).unwrap();
        assert!(!scene.provider().log().live_agents.contains("s1"));
        assert_eq!(scene.stats().agents_removed, 1);
    }

    #[test]
    fn test_teardown_releases_everything() {
        let mut scene = scene();
        scene.initialize().unwrap();
        let events = vec![TransactionEvent::new("c1", MessageKind::TaskAnnouncement, 1.0)];
        scene.apply_snapshot(&snapshot(&["s1"], events), Duration::ZERO).unwrap();
        scene.tick(Duration::ZERO).unwrap();

        scene.teardown();
        let log = scene.provider().log();
        assert!(log.released);
        assert!(log.live_edges.is_empty());
        assert!(scene.animator().markers().is_empty());
        assert!(scene.registry().is_empty());

        assert!(matches!(scene.tick(Duration::ZERO), Err(SceneError::TornDown)));
        assert!(matches!(scene.initialize(), Err(SceneError::TornDown)));
        scene.teardown();
    }

    #[test]
    fn test_drop_releases_backend() {
        let surface = HeadlessSurface::new();
        {
            let mut scene = SceneManager::new(surface.clone(), SceneConfig::default());
            scene.initialize().unwrap();
        }
        assert!(surface.log().released);
    }
}

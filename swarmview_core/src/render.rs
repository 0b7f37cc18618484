//! Render seam.
//!
//! The engine never talks to a GPU directly. A [`SurfaceProvider`] hands out a
//! [`RenderBackend`] once per scene lifetime; the backend receives one
//! [`Frame`] per tick with read-only views of the registry and edge set, plus
//! the ids retired since the previous frame so retained-mode backends can
//! drop what they built for them.
//!
//! [`HeadlessSurface`] is the in-process backend used by the simulator and
//! the tests. The Rerun backend lives in `visualization` behind a feature.

use nalgebra::Point3;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;

use crate::camera::CameraPose;
use crate::edges::{EdgeAnimator, EdgeId, MarkerId};
use crate::palette::Color;
use crate::registry::AgentRegistry;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("Render surface unavailable: {0}")]
    SurfaceUnavailable(String),

    #[error("Render backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightKind {
    Ambient,
    Point,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    pub color: Color,
    pub intensity: f32,
    /// `None` for ambient light
    pub position: Option<Point3<f32>>,
}

/// One dim ambient light plus a point light above the origin.
pub fn default_lights() -> Vec<Light> {
    vec![
        Light {
            kind: LightKind::Ambient,
            color: [255, 255, 255, 255],
            intensity: 0.4,
            position: None,
        },
        Light {
            kind: LightKind::Point,
            color: [255, 255, 255, 255],
            intensity: 1.0,
            position: Some(Point3::new(0.0, 50.0, 0.0)),
        },
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Everything a backend needs to draw one frame.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub index: u64,
    /// Scene time since initialization
    pub time: Duration,
    pub camera: &'a CameraPose,
    pub lights: &'a [Light],
    pub agents: &'a AgentRegistry,
    pub edges: &'a EdgeAnimator,
    pub retired_edges: &'a [EdgeId],
    pub retired_markers: &'a [MarkerId],
    pub retired_agents: &'a [String],
}

pub trait RenderBackend {
    fn render(&mut self, frame: &Frame<'_>) -> Result<(), RenderError>;

    fn resize(&mut self, viewport: Viewport) -> Result<(), RenderError>;

    /// Frees every resource held by the backend. Must be idempotent.
    fn release(&mut self);
}

/// Source of render backends. `acquire` is called at most once per scene.
pub trait SurfaceProvider {
    type Backend: RenderBackend;

    fn acquire(&mut self, viewport: Viewport) -> Result<Self::Backend, RenderError>;
}

// ============================================================================
// HEADLESS
// ============================================================================

/// What the headless backend has been asked to draw so far.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeadlessLog {
    pub acquisitions: u32,
    pub frames: u64,
    pub viewport: Option<Viewport>,
    pub live_agents: HashSet<String>,
    pub live_edges: HashSet<EdgeId>,
    pub live_markers: HashSet<MarkerId>,
    pub released: bool,
    pub last_frame_time: Option<Duration>,
}

/// Surface that records frames instead of drawing them.
#[derive(Debug, Clone, Default)]
pub struct HeadlessSurface {
    log: Arc<Mutex<HeadlessLog>>,
    unavailable: Option<String>,
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// A surface whose acquisition always fails.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            log: Arc::default(),
            unavailable: Some(reason.into()),
        }
    }

    /// Copy of the current log.
    pub fn log(&self) -> HeadlessLog {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl SurfaceProvider for HeadlessSurface {
    type Backend = HeadlessBackend;

    fn acquire(&mut self, viewport: Viewport) -> Result<HeadlessBackend, RenderError> {
        if let Some(reason) = &self.unavailable {
            return Err(RenderError::SurfaceUnavailable(reason.clone()));
        }
        let mut log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
        log.acquisitions += 1;
        log.viewport = Some(viewport);
        log.released = false;
        Ok(HeadlessBackend {
            log: Arc::clone(&self.log),
            released: false,
        })
    }
}

#[derive(Debug)]
pub struct HeadlessBackend {
    log: Arc<Mutex<HeadlessLog>>,
    released: bool,
}

impl RenderBackend for HeadlessBackend {
    fn render(&mut self, frame: &Frame<'_>) -> Result<(), RenderError> {
        if self.released {
            return Err(RenderError::Backend("backend already released".into()));
        }
        let mut log = self.log.lock().unwrap_or_else(PoisonError::into_inner);

        for id in frame.retired_agents {
            log.live_agents.remove(id);
        }
        for id in frame.retired_edges {
            log.live_edges.remove(id);
        }
        for id in frame.retired_markers {
            log.live_markers.remove(id);
        }

        log.live_agents
            .extend(frame.agents.iter().map(|object| object.id().to_owned()));
        log.live_edges.extend(frame.edges.edges().iter().map(|e| e.id));
        log.live_markers.extend(frame.edges.markers().iter().map(|m| m.id));

        log.frames += 1;
        log.last_frame_time = Some(frame.time);
        Ok(())
    }

    fn resize(&mut self, viewport: Viewport) -> Result<(), RenderError> {
        let mut log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
        log.viewport = Some(viewport);
        Ok(())
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        let mut log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
        log.live_agents.clear();
        log.live_edges.clear();
        log.live_markers.clear();
        log.released = true;
    }
}

//! Rerun render backend.
//!
//! Streams each frame to a Rerun viewer (or an `.rrd` file):
//! - Agent bodies as points sized by pulse, rings as line strips
//! - Transaction edges as tessellated arcs with fading alpha
//! - Travel markers as small points
//!
//! Retired edges, markers and agents are cleared by entity path. Enable with
//! the `visualization` feature flag.

use rerun::{RecordingStream, RecordingStreamBuilder};
use std::f32::consts::TAU;

use crate::edges::{EdgeId, MarkerId, ARC_SEGMENTS};
use crate::palette;
use crate::render::{Frame, RenderBackend, RenderError, SurfaceProvider, Viewport};

const RING_SEGMENTS: usize = 32;
const RING_RADIUS_SCALE: f32 = 1.6;
const MARKER_RADIUS: f32 = 0.25;

fn backend_error(e: impl std::fmt::Display) -> RenderError {
    RenderError::Backend(e.to_string())
}

/// Where the recording goes.
#[derive(Debug, Clone)]
pub enum RerunTarget {
    /// Spawn a local viewer
    Spawn,
    /// Write an `.rrd` file (for sharing)
    File(String),
}

#[derive(Debug, Clone)]
pub struct RerunSurface {
    app_id: String,
    target: RerunTarget,
}

impl RerunSurface {
    pub fn new(app_id: impl Into<String>, target: RerunTarget) -> Self {
        Self {
            app_id: app_id.into(),
            target,
        }
    }
}

impl SurfaceProvider for RerunSurface {
    type Backend = RerunBackend;

    fn acquire(&mut self, viewport: Viewport) -> Result<RerunBackend, RenderError> {
        let builder = RecordingStreamBuilder::new(self.app_id.as_str());
        let rec = match &self.target {
            RerunTarget::Spawn => builder.spawn(),
            RerunTarget::File(path) => builder.save(path),
        }
        .map_err(|e| RenderError::SurfaceUnavailable(e.to_string()))?;

        rec.log_static("world", &rerun::ViewCoordinates::RIGHT_HAND_Y_UP())
            .map_err(|e| RenderError::SurfaceUnavailable(e.to_string()))?;

        tracing::info!(
            "Rerun visualization enabled ({}x{})",
            viewport.width, viewport.height
        );
        Ok(RerunBackend { rec: Some(rec) })
    }
}

pub struct RerunBackend {
    rec: Option<RecordingStream>,
}

fn ring(center: [f32; 3], radius: f32) -> Vec<[f32; 3]> {
    (0..=RING_SEGMENTS)
        .map(|i| {
            let angle = i as f32 / RING_SEGMENTS as f32 * TAU;
            [
                center[0] + radius * angle.cos(),
                center[1],
                center[2] + radius * angle.sin(),
            ]
        })
        .collect()
}

impl RerunBackend {
    fn log_agents(&self, rec: &RecordingStream, frame: &Frame<'_>) -> Result<(), RenderError> {
        for object in frame.agents.iter() {
            let path = format!("world/agents/{}", object.id());
            let p = object.position();
            let center = [p.x, p.y, p.z];
            let radius = object.pick_radius_at(frame.time);
            let body = if object.is_selected() {
                palette::SELECTION
            } else {
                object.body_color()
            };

            rec.log(
                format!("{}/body", path),
                &rerun::Points3D::new([center])
                    .with_colors([body])
                    .with_radii([radius * object.glow_intensity() / 2.0])
                    .with_labels([object.id()]),
            )
            .map_err(backend_error)?;

            rec.log(
                format!("{}/ring", path),
                &rerun::LineStrips3D::new([ring(center, radius * RING_RADIUS_SCALE)])
                    .with_colors([palette::with_opacity(object.accent_color(), object.ring_opacity())]),
            )
            .map_err(backend_error)?;
        }
        Ok(())
    }

    fn log_edges(&self, rec: &RecordingStream, frame: &Frame<'_>) -> Result<(), RenderError> {
        for edge in frame.edges.edges() {
            let strip: Vec<[f32; 3]> = edge
                .curve
                .tessellate(ARC_SEGMENTS)
                .into_iter()
                .map(|p| [p.x, p.y, p.z])
                .collect();
            rec.log(
                edge_path(edge.id),
                &rerun::LineStrips3D::new([strip])
                    .with_colors([palette::with_opacity(edge.color, edge.opacity)]),
            )
            .map_err(backend_error)?;
        }

        for marker in frame.edges.markers() {
            let p = marker.position();
            rec.log(
                marker_path(marker.id),
                &rerun::Points3D::new([[p.x, p.y, p.z]])
                    .with_colors([marker.color])
                    .with_radii([MARKER_RADIUS]),
            )
            .map_err(backend_error)?;
        }
        Ok(())
    }

    fn clear_retired(&self, rec: &RecordingStream, frame: &Frame<'_>) -> Result<(), RenderError> {
        let paths = frame
            .retired_edges
            .iter()
            .map(|id| edge_path(*id))
            .chain(frame.retired_markers.iter().map(|id| marker_path(*id)))
            .chain(frame.retired_agents.iter().map(|id| format!("world/agents/{}", id)));
        for path in paths {
            rec.log(path, &rerun::Clear::recursive()).map_err(backend_error)?;
        }
        Ok(())
    }
}

fn edge_path(id: EdgeId) -> String {
    format!("world/edges/{}", id.raw())
}

fn marker_path(id: MarkerId) -> String {
    format!("world/markers/{}", id.raw())
}

impl RenderBackend for RerunBackend {
    fn render(&mut self, frame: &Frame<'_>) -> Result<(), RenderError> {
        let rec = self
            .rec
            .as_ref()
            .ok_or_else(|| RenderError::Backend("recording already released".into()))?;

        rec.set_duration_secs("scene_time", frame.time.as_secs_f64());
        self.clear_retired(rec, frame)?;
        self.log_agents(rec, frame)?;
        self.log_edges(rec, frame)?;

        let eye = frame.camera.eye;
        rec.log(
            "world/camera",
            &rerun::Points3D::new([[eye.x, eye.y, eye.z]]).with_radii([0.2]),
        )
        .map_err(backend_error)?;
        Ok(())
    }

    fn resize(&mut self, _viewport: Viewport) -> Result<(), RenderError> {
        // The viewer owns its own window
        Ok(())
    }

    fn release(&mut self) {
        if let Some(rec) = self.rec.take() {
            let _ = rec.flush_blocking();
        }
    }
}

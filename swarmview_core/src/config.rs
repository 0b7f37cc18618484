//! Scene configuration.
//!
//! Every constant the engine depends on lives here with its default. The
//! struct deserializes with `#[serde(default)]`, so an override file only
//! needs the fields it changes.

use serde::{Deserialize, Serialize};

/// Configuration for the orbiting camera.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Horizontal distance from the origin (default: 60)
    pub orbit_radius: f32,

    /// Eye height above the ring plane (default: 30)
    pub height: f32,

    /// Orbit speed in radians per second (default: 0.1)
    pub angular_speed: f32,

    /// Vertical field of view in degrees (default: 60)
    pub fov_degrees: f32,

    pub near: f32,
    pub far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            orbit_radius: 60.0,
            height: 30.0,
            angular_speed: 0.1,
            fov_degrees: 60.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

/// Configuration for the scene engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Ring radius for coordinator objects (default: 15)
    pub coordinator_ring_radius: f32,

    /// Ring radius for solver objects (default: 25)
    pub solver_ring_radius: f32,

    /// Edge time-to-live in milliseconds (default: 3000)
    pub edge_ttl_ms: u64,

    /// Normalized marker advance per frame (default: 0.02, ~50 frames)
    pub marker_step: f32,

    /// Height the edge midpoint is raised above the straight line (default: 5)
    pub arc_height: f32,

    /// Number of dedup keys remembered before the oldest is evicted (default: 4096)
    pub dedup_capacity: usize,

    /// Initial canvas width in pixels
    pub viewport_width: u32,

    /// Initial canvas height in pixels
    pub viewport_height: u32,

    pub camera: CameraConfig,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            coordinator_ring_radius: 15.0,
            solver_ring_radius: 25.0,
            edge_ttl_ms: 3000,
            marker_step: 0.02,
            arc_height: 5.0,
            dedup_capacity: 4096,
            viewport_width: 1280,
            viewport_height: 720,
            camera: CameraConfig::default(),
        }
    }
}

impl SceneConfig {
    /// Parses a JSON override; absent fields keep their defaults.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

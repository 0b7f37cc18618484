//! Orbiting camera.
//!
//! The eye circles the origin at a fixed radius and height; its angle is a
//! pure function of elapsed scene time, so two runs fed the same clock render
//! the same views. Nothing outside this module moves the camera.

use nalgebra::{Isometry3, Perspective3, Point2, Point3, Unit, Vector3};
use std::time::Duration;

use crate::config::CameraConfig;
use crate::picking::Ray;

/// Camera state for one frame.
#[derive(Debug, Clone, Copy)]
pub struct CameraPose {
    pub eye: Point3<f32>,
    pub target: Point3<f32>,

    /// World → camera transform
    pub view: Isometry3<f32>,

    pub projection: Perspective3<f32>,
}

impl CameraPose {
    fn looking_at(eye: Point3<f32>, projection: Perspective3<f32>) -> Self {
        let target = Point3::origin();
        Self {
            eye,
            target,
            view: Isometry3::look_at_rh(&eye, &target, &Vector3::y()),
            projection,
        }
    }

    /// World-space ray through a point in normalized device coordinates.
    pub fn ray_through(&self, ndc: Point2<f32>) -> Ray {
        let near = self.projection.unproject_point(&Point3::new(ndc.x, ndc.y, -1.0));
        let far = self.projection.unproject_point(&Point3::new(ndc.x, ndc.y, 1.0));
        let to_world = self.view.inverse();
        let near = to_world * near;
        let far = to_world * far;
        Ray {
            origin: near,
            direction: Unit::new_normalize(far - near),
        }
    }

    /// Projects a world point to normalized device coordinates.
    pub fn project(&self, point: &Point3<f32>) -> Point3<f32> {
        self.projection.project_point(&(self.view * point))
    }
}

/// The scene camera.
#[derive(Debug, Clone)]
pub struct OrbitCamera {
    config: CameraConfig,
    pose: CameraPose,
}

impl OrbitCamera {
    pub fn new(config: CameraConfig, width: u32, height: u32) -> Self {
        let projection = Self::projection_for(&config, width, height);
        let pose = CameraPose::looking_at(eye_at(&config, Duration::ZERO), projection);
        Self { config, pose }
    }

    fn projection_for(config: &CameraConfig, width: u32, height: u32) -> Perspective3<f32> {
        let aspect = width.max(1) as f32 / height.max(1) as f32;
        Perspective3::new(aspect, config.fov_degrees.to_radians(), config.near, config.far)
    }

    /// Moves the eye to its orbit position at `elapsed`.
    pub fn orbit(&mut self, elapsed: Duration) -> &CameraPose {
        self.pose = CameraPose::looking_at(eye_at(&self.config, elapsed), self.pose.projection);
        &self.pose
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.pose.projection = Self::projection_for(&self.config, width, height);
    }

    pub fn pose(&self) -> &CameraPose {
        &self.pose
    }
}

/// Eye position on the orbit at `elapsed`.
pub fn eye_at(config: &CameraConfig, elapsed: Duration) -> Point3<f32> {
    let theta = config.angular_speed * elapsed.as_secs_f32();
    Point3::new(
        config.orbit_radius * theta.cos(),
        config.height,
        config.orbit_radius * theta.sin(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_orbit_is_deterministic() {
        let config = CameraConfig::default();
        let mut a = OrbitCamera::new(config.clone(), 800, 600);
        let mut b = OrbitCamera::new(config, 800, 600);
        let t = Duration::from_millis(12_345);
        assert_eq!(a.orbit(t).eye, b.orbit(t).eye);
    }

    #[test]
    fn test_orbit_keeps_radius_and_height() {
        let config = CameraConfig::default();
        for secs in [0.0, 1.0, 17.5, 600.0] {
            let eye = eye_at(&config, Duration::from_secs_f32(secs));
            assert_relative_eq!(eye.y, config.height);
            assert_relative_eq!(
                (eye.x * eye.x + eye.z * eye.z).sqrt(),
                config.orbit_radius,
                epsilon = 1e-3
            );
        }
    }

    #[test]
    fn test_center_ray_hits_origin_direction() {
        let camera = OrbitCamera::new(CameraConfig::default(), 800, 600);
        let ray = camera.pose().ray_through(Point2::new(0.0, 0.0));
        let to_origin = (Point3::origin() - camera.pose().eye).normalize();
        assert_relative_eq!(ray.direction.dot(&to_origin), 1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_origin_projects_to_center() {
        let camera = OrbitCamera::new(CameraConfig::default(), 800, 600);
        let ndc = camera.pose().project(&Point3::origin());
        assert_relative_eq!(ndc.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(ndc.y, 0.0, epsilon = 1e-5);
    }
}

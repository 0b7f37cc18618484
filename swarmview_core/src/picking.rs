//! Picking/Interaction - pointer position to agent selection.
//!
//! Only the agent registry is hit-tested; edges and markers are decoration.
//! Each agent is a sphere of its pulse-scaled pick radius and the nearest hit
//! along the ray wins. Cost is one ray/sphere test per agent.

use nalgebra::{Point2, Point3, Unit, Vector3};
use std::time::Duration;

use crate::camera::CameraPose;
use crate::registry::{AgentHandle, AgentRegistry};
use crate::snapshot::AgentSnapshot;

/// A half-line in world space.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Point3<f32>,
    pub direction: Unit<Vector3<f32>>,
}

impl Ray {
    /// Distance along the ray to the first intersection with a sphere.
    pub fn intersect_sphere(&self, center: &Point3<f32>, radius: f32) -> Option<f32> {
        let oc = self.origin - center;
        let b = oc.dot(&self.direction);
        let c = oc.norm_squared() - radius * radius;
        let discriminant = b * b - c;
        if discriminant < 0.0 {
            return None;
        }
        let root = discriminant.sqrt();
        let near = -b - root;
        if near >= 0.0 {
            return Some(near);
        }
        // Origin inside the sphere
        let far = -b + root;
        (far >= 0.0).then_some(far)
    }
}

/// Screen rectangle the scene is drawn into, in CSS/window pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl CanvasRect {
    /// A full-viewport canvas anchored at the window origin.
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            width: width as f32,
            height: height as f32,
        }
    }

    /// Converts a pointer position to normalized device coordinates.
    /// `None` for a degenerate (zero-sized) canvas.
    pub fn to_ndc(&self, x: f32, y: f32) -> Option<Point2<f32>> {
        if self.width <= 0.0 || self.height <= 0.0 {
            return None;
        }
        Some(Point2::new(
            ((x - self.left) / self.width) * 2.0 - 1.0,
            -((y - self.top) / self.height) * 2.0 + 1.0,
        ))
    }
}

/// The nearest agent struck by a ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickHit {
    pub handle: AgentHandle,
    pub distance: f32,
}

/// Nearest agent along `ray` at scene time `t`.
pub fn raycast(registry: &AgentRegistry, ray: &Ray, t: Duration) -> Option<PickHit> {
    registry
        .iter()
        .filter_map(|object| {
            ray.intersect_sphere(&object.position(), object.pick_radius_at(t))
                .map(|distance| PickHit {
                    handle: object.handle(),
                    distance,
                })
        })
        .min_by(|a, b| a.distance.total_cmp(&b.distance))
}

/// Resolves a pointer event into a selection.
///
/// A hit selects the struck agent and returns a copy of its current
/// snapshot; a miss (or a degenerate canvas) clears the selection.
pub fn pick(
    registry: &mut AgentRegistry,
    camera: &CameraPose,
    canvas: &CanvasRect,
    pointer: (f32, f32),
    t: Duration,
) -> Option<AgentSnapshot> {
    let hit = canvas
        .to_ndc(pointer.0, pointer.1)
        .map(|ndc| camera.ray_through(ndc))
        .and_then(|ray| raycast(registry, &ray, t));

    let agent_id = hit
        .and_then(|h| registry.get(h.handle))
        .map(|object| object.id().to_owned());

    registry
        .select(agent_id.as_deref())
        .map(|object| object.snapshot().clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::OrbitCamera;
    use crate::config::SceneConfig;
    use crate::snapshot::{Role, Roster};
    use approx::assert_relative_eq;

    const WIDTH: u32 = 1280;
    const HEIGHT: u32 = 720;

    fn setup() -> (AgentRegistry, OrbitCamera, CanvasRect) {
        let config = SceneConfig::default();
        let mut registry = AgentRegistry::new(&config);
        registry.reconcile(&Roster {
            coordinators: vec![AgentSnapshot::new("c1", Role::Coordinator)],
            solvers: vec![
                AgentSnapshot::new("s1", Role::Solver),
                AgentSnapshot::new("s2", Role::Solver),
            ],
        });
        let camera = OrbitCamera::new(config.camera, WIDTH, HEIGHT);
        (registry, camera, CanvasRect::full(WIDTH, HEIGHT))
    }

    fn screen_of(camera: &OrbitCamera, canvas: &CanvasRect, point: Point3<f32>) -> (f32, f32) {
        let ndc = camera.pose().project(&point);
        (
            canvas.left + (ndc.x + 1.0) / 2.0 * canvas.width,
            canvas.top + (1.0 - ndc.y) / 2.0 * canvas.height,
        )
    }

    #[test]
    fn test_ndc_corners() {
        let canvas = CanvasRect { left: 10.0, top: 20.0, width: 100.0, height: 50.0 };
        let tl = canvas.to_ndc(10.0, 20.0).unwrap();
        assert_relative_eq!(tl.x, -1.0);
        assert_relative_eq!(tl.y, 1.0);
        let br = canvas.to_ndc(110.0, 70.0).unwrap();
        assert_relative_eq!(br.x, 1.0);
        assert_relative_eq!(br.y, -1.0);
        assert!(CanvasRect::full(0, 0).to_ndc(0.0, 0.0).is_none());
    }

    #[test]
    fn test_ray_sphere() {
        let ray = Ray {
            origin: Point3::new(0.0, 0.0, -10.0),
            direction: Vector3::z_axis(),
        };
        assert_relative_eq!(ray.intersect_sphere(&Point3::origin(), 1.0).unwrap(), 9.0);
        assert!(ray.intersect_sphere(&Point3::new(5.0, 0.0, 0.0), 1.0).is_none());
        assert!(ray.intersect_sphere(&Point3::new(0.0, 0.0, -20.0), 1.0).is_none());
    }

    #[test]
    fn test_pick_miss_then_hit() {
        let (mut registry, camera, canvas) = setup();
        registry.select(Some("s1"));

        // Top-left corner looks over the rings.
        let miss = pick(&mut registry, camera.pose(), &canvas, (0.0, 0.0), Duration::ZERO);
        assert!(miss.is_none());
        assert!(registry.selected().is_none());

        let c1 = registry.lookup("c1").unwrap().position();
        let pointer = screen_of(&camera, &canvas, c1);
        let hit = pick(&mut registry, camera.pose(), &canvas, pointer, Duration::ZERO).unwrap();
        assert_eq!(hit.agent_id, "c1");
        assert!(registry.lookup("c1").unwrap().is_selected());
    }

    #[test]
    fn test_pick_switches_selection() {
        let (mut registry, camera, canvas) = setup();
        for id in ["s1", "s2", "c1"] {
            let pointer = screen_of(&camera, &canvas, registry.lookup(id).unwrap().position());
            let hit = pick(&mut registry, camera.pose(), &canvas, pointer, Duration::ZERO);
            assert_eq!(hit.map(|s| s.agent_id), Some(id.to_string()));
            assert_eq!(registry.iter().filter(|o| o.is_selected()).count(), 1);
        }
    }

    #[test]
    fn test_empty_registry_picks_nothing() {
        let config = SceneConfig::default();
        let mut registry = AgentRegistry::new(&config);
        let camera = OrbitCamera::new(config.camera, WIDTH, HEIGHT);
        let canvas = CanvasRect::full(WIDTH, HEIGHT);
        assert!(pick(&mut registry, camera.pose(), &canvas, (640.0, 360.0), Duration::ZERO).is_none());
    }
}

//! The Agent Reconciler - persistent visual objects keyed by agent identifier.
//!
//! Objects live in an owned arena and are addressed by [`AgentHandle`]. The
//! identifier index maps each agent to exactly one handle for the lifetime of
//! the scene, so reconciliation is a lookup, never a rebuild:
//! 1. Unknown identifier → new object on its role's ring, angle fixed forever
//! 2. Known identifier → refresh display fields from the new snapshot only
//!
//! Removed agents leave a tombstone slot; handles are never reused and the
//! identifier is never placed again, even if a stale roster still lists it.

use nalgebra::Point3;
use std::collections::{HashMap, HashSet};
use std::f32::consts::TAU;
use std::time::Duration;
use tracing::debug;

use crate::config::SceneConfig;
use crate::palette::{self, Color};
use crate::snapshot::{AgentSnapshot, Role, Roster};

// ============================================================================
// DISPLAY CONSTANTS
// ============================================================================

/// Glow intensity range derived from reputation.
pub const GLOW_MIN: f32 = 0.8;
pub const GLOW_MAX: f32 = 2.0;

/// Values forced onto the selected object.
pub const SELECTED_GLOW: f32 = GLOW_MAX;
pub const SELECTED_RING_OPACITY: f32 = 1.0;

const ACTIVE_RING_OPACITY: f32 = 0.8;
const IDLE_RING_OPACITY: f32 = 0.3;

const COORDINATOR_PICK_RADIUS: f32 = 1.5;
const SOLVER_PICK_RADIUS: f32 = 1.0;

/// Glow intensity for a reputation value.
pub fn glow_for_reputation(reputation: f64) -> f32 {
    ((reputation / 100.0) as f32).clamp(GLOW_MIN, GLOW_MAX)
}

// ============================================================================
// HANDLES & PULSE
// ============================================================================

/// Index of an object in the registry arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AgentHandle(usize);

impl AgentHandle {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Breathing animation of an object's ring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PulseState {
    /// Relative scale swing (0.25 = ±25%)
    pub amplitude: f32,

    /// Radians per second
    pub speed: f32,

    /// Per-object offset so neighbours do not pulse in lockstep
    pub phase: f32,
}

impl PulseState {
    fn for_activity(active: bool, phase: f32) -> Self {
        if active {
            Self { amplitude: 0.25, speed: 4.0, phase }
        } else {
            Self { amplitude: 0.05, speed: 1.5, phase }
        }
    }

    /// Scale factor at scene time `t`.
    pub fn scale_at(&self, t: Duration) -> f32 {
        1.0 + self.amplitude * (self.speed * t.as_secs_f32() + self.phase).sin()
    }
}

// ============================================================================
// VISUAL AGENT OBJECT
// ============================================================================

/// One persistent agent in the scene.
///
/// The position and angle are written once in the constructor and have no
/// setters; everything else is derived from the latest snapshot.
#[derive(Debug, Clone)]
pub struct VisualAgentObject {
    handle: AgentHandle,
    position: Point3<f32>,
    angle: f32,
    body_color: Color,
    accent_color: Color,
    pick_radius: f32,
    pulse: PulseState,
    glow_intensity: f32,
    ring_opacity: f32,
    selected: bool,
    snapshot: AgentSnapshot,
}

impl VisualAgentObject {
    fn new(handle: AgentHandle, snapshot: AgentSnapshot, radius: f32, angle: f32) -> Self {
        let position = Point3::new(radius * angle.cos(), 0.0, radius * angle.sin());
        let pick_radius = match snapshot.role {
            Role::Coordinator => COORDINATOR_PICK_RADIUS,
            Role::Solver => SOLVER_PICK_RADIUS,
        };
        let phase = (handle.index() as f32 * 0.7) % TAU;
        let mut object = Self {
            handle,
            position,
            angle,
            body_color: palette::role_color(snapshot.role),
            accent_color: palette::specialization_color(snapshot.specialization),
            pick_radius,
            pulse: PulseState::for_activity(false, phase),
            glow_intensity: GLOW_MIN,
            ring_opacity: IDLE_RING_OPACITY,
            selected: false,
            snapshot,
        };
        object.refresh();
        object
    }

    /// Recomputes every display-derived field from the snapshot and the
    /// selection flag.
    fn refresh(&mut self) {
        let active = self.snapshot.is_active();
        self.body_color = palette::role_color(self.snapshot.role);
        self.accent_color = palette::specialization_color(self.snapshot.specialization);
        self.pulse = PulseState::for_activity(active, self.pulse.phase);

        if self.selected {
            self.glow_intensity = SELECTED_GLOW;
            self.ring_opacity = SELECTED_RING_OPACITY;
        } else {
            self.glow_intensity = glow_for_reputation(self.snapshot.reputation);
            self.ring_opacity = if active { ACTIVE_RING_OPACITY } else { IDLE_RING_OPACITY };
        }
    }

    fn update(&mut self, snapshot: &AgentSnapshot) {
        self.snapshot.clone_from(snapshot);
        self.refresh();
    }

    fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
        self.refresh();
    }

    pub fn handle(&self) -> AgentHandle {
        self.handle
    }

    pub fn id(&self) -> &str {
        &self.snapshot.agent_id
    }

    pub fn role(&self) -> Role {
        self.snapshot.role
    }

    pub fn position(&self) -> Point3<f32> {
        self.position
    }

    /// Angle on the ring in radians, fixed at creation.
    pub fn angle(&self) -> f32 {
        self.angle
    }

    pub fn body_color(&self) -> Color {
        self.body_color
    }

    pub fn accent_color(&self) -> Color {
        self.accent_color
    }

    pub fn pulse(&self) -> PulseState {
        self.pulse
    }

    pub fn glow_intensity(&self) -> f32 {
        self.glow_intensity
    }

    pub fn ring_opacity(&self) -> f32 {
        self.ring_opacity
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn snapshot(&self) -> &AgentSnapshot {
        &self.snapshot
    }

    /// Hit-test radius at scene time `t`, following the pulse.
    pub fn pick_radius_at(&self, t: Duration) -> f32 {
        self.pick_radius * self.pulse.scale_at(t)
    }
}

// ============================================================================
// REGISTRY
// ============================================================================

/// Result of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileReport {
    /// Objects created in this pass, in roster order
    pub created: Vec<AgentHandle>,

    /// Objects whose display fields were refreshed
    pub updated: usize,
}

/// Owned mapping from agent identifier to visual object.
#[derive(Debug)]
pub struct AgentRegistry {
    slots: Vec<Option<VisualAgentObject>>,
    index: HashMap<String, AgentHandle>,

    /// Identifiers removed through the control path
    removed: HashSet<String>,
    selected: Option<AgentHandle>,
    coordinator_radius: f32,
    solver_radius: f32,
}

impl AgentRegistry {
    pub fn new(config: &SceneConfig) -> Self {
        Self {
            slots: Vec::new(),
            index: HashMap::new(),
            removed: HashSet::new(),
            selected: None,
            coordinator_radius: config.coordinator_ring_radius,
            solver_radius: config.solver_ring_radius,
        }
    }

    fn ring_radius(&self, role: Role) -> f32 {
        match role {
            Role::Coordinator => self.coordinator_radius,
            Role::Solver => self.solver_radius,
        }
    }

    /// Brings the registry in line with the latest roster.
    ///
    /// The roster has already passed structural validation, so this cannot
    /// fail part way. Agents absent from the roster are left untouched.
    pub fn reconcile(&mut self, roster: &Roster) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        for role in [Role::Coordinator, Role::Solver] {
            let group = roster.group(role);
            let group_len = group.len();

            for (ordinal, snapshot) in group.iter().enumerate() {
                if let Some(&handle) = self.index.get(&snapshot.agent_id) {
                    if let Some(object) = self.slots[handle.0].as_mut() {
                        object.update(snapshot);
                        report.updated += 1;
                    }
                    continue;
                }
                if self.removed.contains(&snapshot.agent_id) {
                    continue;
                }

                let angle = TAU * ordinal as f32 / group_len as f32;
                let handle = AgentHandle(self.slots.len());
                let object =
                    VisualAgentObject::new(handle, snapshot.clone(), self.ring_radius(role), angle);
                debug!(
                    "➕ {} placed at ({:.1}, {:.1}, {:.1})",
                    snapshot.agent_id, object.position.x, object.position.y, object.position.z
                );
                self.slots.push(Some(object));
                self.index.insert(snapshot.agent_id.clone(), handle);
                report.created.push(handle);
            }
        }

        report
    }

    /// Moves the selection override to `agent_id`, or clears it.
    ///
    /// The previous holder is switched off in the same call. An unknown
    /// identifier clears the selection. Returns the new holder.
    pub fn select(&mut self, agent_id: Option<&str>) -> Option<&VisualAgentObject> {
        let next = agent_id.and_then(|id| self.index.get(id).copied());
        if next != self.selected {
            if let Some(previous) = self.selected.take() {
                if let Some(object) = self.slots[previous.0].as_mut() {
                    object.set_selected(false);
                }
            }
            if let Some(handle) = next {
                if let Some(object) = self.slots[handle.0].as_mut() {
                    object.set_selected(true);
                }
            }
            self.selected = next;
        }
        self.selected.and_then(|h| self.get(h))
    }

    pub fn selected(&self) -> Option<&VisualAgentObject> {
        self.selected.and_then(|h| self.get(h))
    }

    /// Tombstones an agent's slot. Returns the removed object.
    pub fn remove(&mut self, agent_id: &str) -> Option<VisualAgentObject> {
        let handle = self.index.remove(agent_id)?;
        self.removed.insert(agent_id.to_owned());
        if self.selected == Some(handle) {
            self.selected = None;
        }
        self.slots[handle.0].take()
    }

    /// Drops every object, returning their identifiers.
    pub fn clear(&mut self) -> Vec<String> {
        self.selected = None;
        self.slots.clear();
        self.index.drain().map(|(id, _)| id).collect()
    }

    pub fn get(&self, handle: AgentHandle) -> Option<&VisualAgentObject> {
        self.slots.get(handle.0).and_then(Option::as_ref)
    }

    pub fn lookup(&self, agent_id: &str) -> Option<&VisualAgentObject> {
        self.index.get(agent_id).and_then(|&h| self.get(h))
    }

    pub fn contains(&self, agent_id: &str) -> bool {
        self.index.contains_key(agent_id)
    }

    /// Whether the agent was removed and will not be placed again.
    pub fn is_removed(&self, agent_id: &str) -> bool {
        self.removed.contains(agent_id)
    }

    /// Live objects in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &VisualAgentObject> {
        self.slots.iter().filter_map(Option::as_ref)
    }

    pub fn by_role(&self, role: Role) -> impl Iterator<Item = &VisualAgentObject> {
        self.iter().filter(move |o| o.role() == role)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::AgentStatus;
    use approx::assert_relative_eq;

    fn registry() -> AgentRegistry {
        AgentRegistry::new(&SceneConfig::default())
    }

    fn roster(coordinators: &[&str], solvers: &[&str]) -> Roster {
        Roster {
            coordinators: coordinators
                .iter()
                .map(|id| AgentSnapshot::new(*id, Role::Coordinator))
                .collect(),
            solvers: solvers.iter().map(|id| AgentSnapshot::new(*id, Role::Solver)).collect(),
        }
    }

    #[test]
    fn test_single_coordinator_at_angle_zero() {
        let mut reg = registry();
        let report = reg.reconcile(&roster(&["c1"], &[]));

        assert_eq!(report.created.len(), 1);
        let c1 = reg.lookup("c1").unwrap();
        assert_relative_eq!(c1.angle(), 0.0);
        assert_relative_eq!(c1.position().x, 15.0);
        assert_relative_eq!(c1.position().z, 0.0);
        assert_relative_eq!(c1.position().coords.norm(), 15.0, epsilon = 1e-5);
    }

    #[test]
    fn test_same_roster_twice_creates_nothing() {
        let mut reg = registry();
        reg.reconcile(&roster(&["c1"], &["s1", "s2"]));
        let before: Vec<_> = reg.iter().map(|o| (o.handle(), o.position())).collect();

        let report = reg.reconcile(&roster(&["c1"], &["s1", "s2"]));
        assert!(report.created.is_empty());
        assert_eq!(report.updated, 3);
        let after: Vec<_> = reg.iter().map(|o| (o.handle(), o.position())).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_reordering_does_not_move_objects() {
        let mut reg = registry();
        reg.reconcile(&roster(&[], &["s1", "s2", "s3", "s4"]));
        let s1 = reg.lookup("s1").unwrap().position();
        let s4 = reg.lookup("s4").unwrap().position();

        reg.reconcile(&roster(&[], &["s4", "s3", "s2", "s1"]));
        assert_eq!(reg.lookup("s1").unwrap().position(), s1);
        assert_eq!(reg.lookup("s4").unwrap().position(), s4);
        for object in reg.by_role(Role::Solver) {
            assert_relative_eq!(object.position().coords.norm(), 25.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_missing_agents_are_kept() {
        let mut reg = registry();
        reg.reconcile(&roster(&["c1"], &["s1"]));
        reg.reconcile(&roster(&["c1"], &[]));
        assert!(reg.contains("s1"));
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn test_activity_drives_display_fields() {
        let mut reg = registry();
        reg.reconcile(&roster(&[], &["s1"]));
        let idle = reg.lookup("s1").unwrap().clone();

        let mut busy = AgentSnapshot::new("s1", Role::Solver);
        busy.status = AgentStatus::Working;
        busy.reputation = 150.0;
        reg.reconcile(&Roster { coordinators: vec![], solvers: vec![busy] });
        let active = reg.lookup("s1").unwrap();

        assert!(active.pulse().amplitude > idle.pulse().amplitude);
        assert!(active.ring_opacity() > idle.ring_opacity());
        assert_relative_eq!(active.glow_intensity(), 1.5);
        assert_eq!(active.handle(), idle.handle());
    }

    #[test]
    fn test_glow_is_clamped() {
        assert_relative_eq!(glow_for_reputation(0.0), GLOW_MIN);
        assert_relative_eq!(glow_for_reputation(1.0), GLOW_MIN);
        assert_relative_eq!(glow_for_reputation(500.0), GLOW_MAX);
    }

    #[test]
    fn test_selection_moves_atomically() {
        let mut reg = registry();
        reg.reconcile(&roster(&["c1"], &["s1"]));

        reg.select(Some("c1"));
        assert!(reg.lookup("c1").unwrap().is_selected());
        assert_relative_eq!(reg.lookup("c1").unwrap().glow_intensity(), SELECTED_GLOW);

        reg.select(Some("s1"));
        assert!(!reg.lookup("c1").unwrap().is_selected());
        assert!(reg.lookup("s1").unwrap().is_selected());
        assert_eq!(reg.iter().filter(|o| o.is_selected()).count(), 1);
        assert_relative_eq!(reg.lookup("s1").unwrap().ring_opacity(), SELECTED_RING_OPACITY);

        reg.select(Some("ghost"));
        assert!(reg.selected().is_none());
        assert_eq!(reg.iter().filter(|o| o.is_selected()).count(), 0);
    }

    #[test]
    fn test_override_survives_reconcile() {
        let mut reg = registry();
        reg.reconcile(&roster(&[], &["s1"]));
        reg.select(Some("s1"));
        reg.reconcile(&roster(&[], &["s1"]));
        let s1 = reg.lookup("s1").unwrap();
        assert_relative_eq!(s1.glow_intensity(), SELECTED_GLOW);
        assert_relative_eq!(s1.ring_opacity(), SELECTED_RING_OPACITY);
    }

    #[test]
    fn test_remove_tombstones_handle() {
        let mut reg = registry();
        reg.reconcile(&roster(&[], &["s1", "s2"]));
        let s1 = reg.lookup("s1").unwrap().handle();
        reg.select(Some("s1"));

        assert!(reg.remove("s1").is_some());
        assert!(reg.get(s1).is_none());
        assert!(reg.selected().is_none());
        assert_eq!(reg.len(), 1);

        // A stale roster still listing s1 must not bring it back
        let s2 = reg.lookup("s2").unwrap().position();
        let report = reg.reconcile(&roster(&[], &["s1", "s2"]));
        assert!(report.created.is_empty());
        assert!(!reg.contains("s1"));
        assert!(reg.is_removed("s1"));
        assert_eq!(reg.lookup("s2").unwrap().position(), s2);
        assert_eq!(reg.len(), 1);
    }
}

//! Colors used by the scene. RGBA, straight alpha.

use crate::snapshot::{MessageKind, Role, Specialization};

pub type Color = [u8; 4];

pub const COORDINATOR: Color = [255, 170, 0, 255]; // Amber
pub const SOLVER: Color = [0, 212, 255, 255]; // Cyan
pub const NEUTRAL: Color = [128, 128, 128, 255];

pub const ANNOUNCEMENT: Color = [0, 255, 136, 255]; // Green
pub const BID: Color = [255, 200, 0, 255]; // Yellow
pub const SOLUTION: Color = [170, 100, 255, 255]; // Violet
pub const DEFAULT_EDGE: Color = [200, 200, 200, 255];

pub const SELECTION: Color = [255, 255, 255, 255];

/// Body color of an agent object.
pub fn role_color(role: Role) -> Color {
    match role {
        Role::Coordinator => COORDINATOR,
        Role::Solver => SOLVER,
    }
}

/// Accent (ring) color; neutral when the agent has no specialization.
pub fn specialization_color(specialization: Option<Specialization>) -> Color {
    match specialization {
        Some(Specialization::PrimeFinding) => [255, 100, 100, 255],
        Some(Specialization::HashCracking) => [100, 255, 140, 255],
        Some(Specialization::Sorting) => [100, 100, 255, 255],
        Some(Specialization::DataSearch) => [255, 100, 255, 255],
        None => NEUTRAL,
    }
}

/// Edge color by message kind.
pub fn message_color(kind: &MessageKind) -> Color {
    match kind {
        MessageKind::TaskAnnouncement => ANNOUNCEMENT,
        MessageKind::TaskBid => BID,
        MessageKind::SolutionSubmission => SOLUTION,
        MessageKind::Other(_) => DEFAULT_EDGE,
    }
}

/// Applies an opacity in [0, 1] to a color's alpha channel.
pub fn with_opacity(color: Color, opacity: f32) -> Color {
    let alpha = (color[3] as f32 * opacity.clamp(0.0, 1.0)).round() as u8;
    [color[0], color[1], color[2], alpha]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_opacity() {
        assert_eq!(with_opacity(SOLVER, 1.0)[3], 255);
        assert_eq!(with_opacity(SOLVER, 0.0)[3], 0);
        assert_eq!(with_opacity(SOLVER, 2.0)[3], 255);
    }

    #[test]
    fn test_unknown_kind_uses_default() {
        assert_eq!(message_color(&MessageKind::Other("7".into())), DEFAULT_EDGE);
        assert_eq!(specialization_color(None), NEUTRAL);
    }
}

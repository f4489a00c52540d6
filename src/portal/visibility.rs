//! Front/back test of a portal quad against a viewer

use crate::scene::{forward_of, translation_of};
use crate::{VisibilityPolicy, MAX_HYSTERESIS_MARGIN_DEGREES, OCCLUSION_ANGLE_DEGREES};
use glam::{Mat4, Vec3};

/// Whether a preview's portal is seen from the front
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreviewState {
    /// Pipeline enabled, quad samples the off-screen output
    Visible,
    /// Pipeline disabled, quad samples the placeholder
    Occluded,
}

impl PreviewState {
    pub fn is_visible(self) -> bool {
        self == PreviewState::Visible
    }
}

/// Angle in degrees between the viewer-to-quad direction and the quad normal.
///
/// `None` when the viewer sits on the quad center or the quad transform has
/// no usable normal.
pub fn view_angle_degrees(viewer: Vec3, quad_world: &Mat4) -> Option<f32> {
    let to_quad = translation_of(quad_world) - viewer;
    let normal = forward_of(quad_world);

    let lengths = to_quad.length() * normal.length();
    if !lengths.is_finite() || lengths <= f32::EPSILON {
        return None;
    }

    let cos = (to_quad.dot(normal) / lengths).clamp(-1.0, 1.0);
    Some(cos.acos().to_degrees())
}

impl VisibilityPolicy {
    /// Effective margin around the boundary, in `[0, MAX_HYSTERESIS_MARGIN_DEGREES]`
    pub fn margin_degrees(&self) -> f32 {
        match *self {
            VisibilityPolicy::Stateless => 0.0,
            VisibilityPolicy::Hysteresis { margin_degrees } if margin_degrees.is_nan() => 0.0,
            VisibilityPolicy::Hysteresis { margin_degrees } => {
                margin_degrees.abs().min(MAX_HYSTERESIS_MARGIN_DEGREES)
            }
        }
    }

    /// Same policy with its margin stored as it is applied
    pub fn normalized(self) -> Self {
        match self {
            VisibilityPolicy::Stateless => self,
            VisibilityPolicy::Hysteresis { .. } => VisibilityPolicy::Hysteresis {
                margin_degrees: self.margin_degrees(),
            },
        }
    }

    /// State for this frame given the previous one and the current angle
    pub fn next_state(&self, current: PreviewState, angle_degrees: f32) -> PreviewState {
        let threshold = match current {
            PreviewState::Visible => OCCLUSION_ANGLE_DEGREES + self.margin_degrees(),
            PreviewState::Occluded => OCCLUSION_ANGLE_DEGREES - self.margin_degrees(),
        };

        if angle_degrees < threshold {
            PreviewState::Visible
        } else {
            PreviewState::Occluded
        }
    }
}

//! Portal camera
//!
//! A portal camera does not own a pose. Each eye looks through a screen node
//! from an eye node, so the projection is the off-axis frustum spanned by the
//! screen rectangle as seen from the eye.

use super::RenderMask;
use crate::scene::{translation_of, NodeId, SceneGraph};
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};

/// Which eye of a (possibly stereo) camera
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Eye {
    Left,
    Right,
}

/// Screen and eye node one eye renders from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EyeTargets {
    pub screen: NodeId,
    pub eye: NodeId,
}

/// Camera rendering a scene through a portal screen
#[derive(Debug, Clone, PartialEq)]
pub struct PortalCamera {
    /// Name of the scene graph this camera renders
    pub scene: String,
    pub render_mask: RenderMask,
    pub left: EyeTargets,
    pub right: Option<EyeTargets>,
    pub near: f32,
    pub far: f32,
}

impl PortalCamera {
    pub fn mono(scene: impl Into<String>, render_mask: RenderMask, screen: NodeId, eye: NodeId) -> Self {
        Self {
            scene: scene.into(),
            render_mask,
            left: EyeTargets { screen, eye },
            right: None,
            near: 0.1,
            far: 1000.0,
        }
    }

    pub fn stereo(
        scene: impl Into<String>,
        render_mask: RenderMask,
        screen: NodeId,
        left_eye: NodeId,
        right_eye: NodeId,
    ) -> Self {
        Self {
            right: Some(EyeTargets {
                screen,
                eye: right_eye,
            }),
            ..Self::mono(scene, render_mask, screen, left_eye)
        }
    }

    pub fn is_stereo(&self) -> bool {
        self.right.is_some()
    }

    pub fn targets(&self, eye: Eye) -> Option<EyeTargets> {
        match eye {
            Eye::Left => Some(self.left),
            Eye::Right => self.right,
        }
    }

    /// Off-axis frustum for one eye, from the current world transforms.
    ///
    /// Returns `None` when a node is missing or the eye is not in front of
    /// the screen plane.
    pub fn frustum(&self, scene: &SceneGraph, eye: Eye) -> Option<EyeFrustum> {
        let targets = self.targets(eye)?;
        let extent = scene.extent(targets.screen)?;
        let screen_world = scene.world_transform(targets.screen)?;
        let eye_world = scene.world_transform(targets.eye)?;

        // Eye position in screen space; the screen spans the XY plane at z = 0
        let local = screen_world.inverse().transform_point3(translation_of(&eye_world));
        let distance = local.z;
        if distance <= f32::EPSILON {
            return None;
        }

        let to_near = self.near / distance;
        let half_w = extent.width * 0.5;
        let half_h = extent.height * 0.5;

        let projection = frustum_rh(
            (-half_w - local.x) * to_near,
            (half_w - local.x) * to_near,
            (-half_h - local.y) * to_near,
            (half_h - local.y) * to_near,
            self.near,
            self.far,
        );
        let view = (screen_world * Mat4::from_translation(local)).inverse();

        Some(EyeFrustum {
            view,
            projection,
            position: translation_of(&eye_world),
            near: self.near,
            far: self.far,
        })
    }
}

/// View and projection of one eye
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeFrustum {
    pub view: Mat4,
    pub projection: Mat4,
    /// Eye position in world space
    pub position: Vec3,
    pub near: f32,
    pub far: f32,
}

impl EyeFrustum {
    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }

    /// Build camera uniform data for shaders
    pub fn uniform_data(&self) -> CameraUniformData {
        CameraUniformData {
            view: self.view,
            proj: self.projection,
            view_proj: self.view_projection(),
            inv_view: self.view.inverse(),
            inv_proj: self.projection.inverse(),
            position: self.position.extend(1.0),
            near_far: Vec4::new(self.near, self.far, 0.0, 0.0),
        }
    }
}

/// Right-handed off-center perspective projection with a [0, 1] depth range
pub fn frustum_rh(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
    let inv_width = 1.0 / (right - left);
    let inv_height = 1.0 / (top - bottom);
    let depth = far / (near - far);

    Mat4::from_cols(
        Vec4::new(2.0 * near * inv_width, 0.0, 0.0, 0.0),
        Vec4::new(0.0, 2.0 * near * inv_height, 0.0, 0.0),
        Vec4::new(
            (right + left) * inv_width,
            (top + bottom) * inv_height,
            depth,
            -1.0,
        ),
        Vec4::new(0.0, 0.0, depth * near, 0.0),
    )
}

/// Camera uniform data for GPU
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct CameraUniformData {
    pub view: Mat4,
    pub proj: Mat4,
    pub view_proj: Mat4,
    pub inv_view: Mat4,
    pub inv_proj: Mat4,
    pub position: Vec4,
    pub near_far: Vec4,
}

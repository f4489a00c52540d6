//! Portal Mirror - per-viewer portal previews for multi-user scene graphs
//!
//! Portals are windows into another part of a shared scene. A replication
//! layer publishes portal descriptors under a well-known node; this crate
//! mirrors each descriptor locally and keeps, for every (view, portal) pair,
//! a virtual camera posed so that looking through the portal quad from the
//! real viewer position is equivalent to standing inside the portal content.
//!
//! # Features
//! - Scene graph facade with path lookup and one-way field bindings
//! - At-most-once mirroring of replicated portal descriptors, with removal
//! - Per-view previews: off-axis camera, off-screen pipeline, composited quad
//! - Per-frame pose recomputation and front/back visibility switching
//!
//! The renderer is external: it consumes each view's [`render::PreRenderList`]
//! and the quads and masks placed in the scene graph.

pub mod error;
pub mod frame;
pub mod portal;
pub mod render;
pub mod scene;
pub mod view;

pub use error::{PortalError, PortalResult};
pub use frame::{FrameReport, PortalSession};
pub use portal::{
    output_texture_name, PortalDescriptor, PortalListener, PortalMirror, PortalPreview,
    PortalRegistry, PreviewOutcome, PreviewState,
};
pub use scene::{NodeId, SceneGraph};
pub use view::{View, ViewId, ViewInfo};

use glam::{UVec2, Vec3};
use render::BackgroundMode;

/// Angle between the viewer direction and the portal normal past which a
/// portal is seen from behind
pub const OCCLUSION_ANGLE_DEGREES: f32 = 90.0;

/// Largest hysteresis margin; wider margins could never switch back
pub const MAX_HYSTERESIS_MARGIN_DEGREES: f32 = 45.0;

/// How previews switch between visible and occluded
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum VisibilityPolicy {
    /// Decide from the current angle alone, exactly at the 90 degree boundary
    #[default]
    Stateless,
    /// Require the angle to cross the boundary by `margin_degrees` before
    /// switching, which suppresses flicker when a viewer hovers at the edge.
    /// The margin is used as `|margin|` clamped to
    /// [`MAX_HYSTERESIS_MARGIN_DEGREES`].
    Hysteresis { margin_degrees: f32 },
}

/// Configuration for the portal subsystem
#[derive(Debug, Clone)]
pub struct PortalConfig {
    /// Replicated node whose children are portal descriptors
    pub replicated_root: String,
    /// Node under which `platform_<id>` nodes live
    pub platform_root: String,
    /// Local node mirrors are attached to, created on demand
    pub local_portal_root: String,
    /// Off-screen resolution per eye
    pub offscreen_resolution: UVec2,
    /// Inter-eye distance for stereo views without their own setting
    pub eye_distance: f32,
    /// Group portal cameras never render
    pub hidden_group: String,
    /// Texture shown on a quad while its portal is seen from behind
    pub placeholder_texture: String,
    pub background: BackgroundMode,
    /// Initial offset of a preview's view node before its pose is known
    pub preview_offset: Vec3,
    /// Attach debug geometry (screen outlines, eye markers)
    pub debug_geometry: bool,
    pub screen_geometry: String,
    pub eye_geometry: String,
    pub debug_material: String,
    pub border_material: String,
    pub visibility: VisibilityPolicy,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            replicated_root: "/net/portal_group".to_string(),
            platform_root: "/net".to_string(),
            local_portal_root: "/local_portal_group".to_string(),
            offscreen_resolution: UVec2::new(1000, 1000),
            eye_distance: 0.06,
            hidden_group: "do_not_display_group".to_string(),
            placeholder_texture: "data/textures/tiles_diffuse.jpg".to_string(),
            background: BackgroundMode::SkymapTexture("data/textures/sky.jpg".to_string()),
            preview_offset: Vec3::new(0.0, 0.0, 0.6),
            debug_geometry: true,
            screen_geometry: "data/objects/screen.obj".to_string(),
            eye_geometry: "data/objects/sphere.obj".to_string(),
            debug_material: "data/materials/ShadelessBlack.gmd".to_string(),
            border_material: "data/materials/ShadelessBlue.gmd".to_string(),
            visibility: VisibilityPolicy::Stateless,
        }
    }
}

impl PortalConfig {
    /// Set the visibility policy; hysteresis margins are normalized
    pub fn with_visibility(mut self, visibility: VisibilityPolicy) -> Self {
        let normalized = visibility.normalized();
        if normalized != visibility {
            log::warn!(
                "Visibility policy {:?} adjusted to {:?}",
                visibility,
                normalized
            );
        }
        self.visibility = normalized;
        self
    }

    pub fn with_offscreen_resolution(mut self, width: u32, height: u32) -> Self {
        self.offscreen_resolution = UVec2::new(width, height);
        self
    }

    pub fn with_eye_distance(mut self, eye_distance: f32) -> Self {
        self.eye_distance = eye_distance;
        self
    }

    pub fn with_debug_geometry(mut self, enabled: bool) -> Self {
        self.debug_geometry = enabled;
        self
    }

    pub fn with_replicated_root(mut self, path: impl Into<String>) -> Self {
        self.replicated_root = path.into();
        self
    }
}

//! Virtual eye placement
//!
//! A viewer stands on a platform; the slot pose is expressed in the scaled
//! platform frame. The portal pose is in world space. The virtual eye is the
//! slot re-expressed relative to the portal frame, which is then placed in
//! the portal's content frame by attaching it under the content node:
//!
//! ```text
//! eye = inverse(inverse(scale) * inverse(platform) * portal) * slot
//!     = inverse(portal) * platform * scale * slot
//! ```

use crate::scene::{NodeId, SceneGraph};
use glam::Mat4;

/// Matrices whose determinant is this small are treated as singular
const SINGULAR_DETERMINANT: f32 = 1e-8;

/// Nodes a preview reads its poses from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoseSources {
    pub platform: NodeId,
    pub platform_scale: NodeId,
    pub portal: NodeId,
    pub slot: NodeId,
}

impl PoseSources {
    /// Locate the platform chain of a view. `None` until the platform, its
    /// scale node and the slot node all exist.
    pub fn resolve(scene: &SceneGraph, platform_path: &str, slot_name: &str, portal: NodeId) -> Option<Self> {
        let platform = scene.find(platform_path)?;
        let platform_scale = scene.child_by_name(platform, "scale")?;
        let slot = scene.child_by_name(platform_scale, slot_name)?;

        scene.contains(portal).then_some(Self {
            platform,
            platform_scale,
            portal,
            slot,
        })
    }

    /// Current local transforms, or `None` if a source node is gone
    pub fn read(&self, scene: &SceneGraph) -> Option<PoseSnapshot> {
        Some(PoseSnapshot {
            platform: scene.transform(self.platform)?,
            platform_scale: scene.transform(self.platform_scale)?,
            portal: scene.transform(self.portal)?,
            slot: scene.transform(self.slot)?,
        })
    }
}

/// Local transforms of the four pose sources for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseSnapshot {
    pub platform: Mat4,
    pub platform_scale: Mat4,
    pub portal: Mat4,
    pub slot: Mat4,
}

impl PoseSnapshot {
    /// Transform of the virtual view node inside the portal content frame
    pub fn virtual_eye(&self) -> Option<Mat4> {
        if self.portal.determinant().abs() < SINGULAR_DETERMINANT {
            return None;
        }

        let eye = self.portal.inverse() * self.platform * self.platform_scale * self.slot;
        eye.is_finite().then_some(eye)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::translation_of;
    use glam::{Quat, Vec3};

    fn snapshot(platform: Mat4, portal: Mat4, slot: Mat4) -> PoseSnapshot {
        PoseSnapshot {
            platform,
            platform_scale: Mat4::IDENTITY,
            portal,
            slot,
        }
    }

    #[test]
    fn eye_is_slot_relative_to_portal() {
        let poses = snapshot(
            Mat4::IDENTITY,
            Mat4::from_translation(Vec3::new(0.0, 0.0, -2.0)),
            Mat4::from_translation(Vec3::new(0.3, 1.7, 0.0)),
        );
        let eye = poses.virtual_eye().unwrap();
        assert!((translation_of(&eye) - Vec3::new(0.3, 1.7, 2.0)).length() < 1e-5);
    }

    #[test]
    fn platform_motion_cancels_out() {
        // Portal and platform both moved by the same offset
        let offset = Vec3::new(5.0, 0.0, 0.0);
        let poses = snapshot(
            Mat4::from_translation(offset),
            Mat4::from_translation(offset + Vec3::new(0.0, 0.0, -2.0)),
            Mat4::from_translation(Vec3::new(0.3, 1.7, 0.0)),
        );
        let eye = poses.virtual_eye().unwrap();
        assert!((translation_of(&eye) - Vec3::new(0.3, 1.7, 2.0)).length() < 1e-5);

        // Relative placement of the portal is unchanged too
        let portal = (poses.platform * poses.platform_scale).inverse() * poses.portal;
        assert!((translation_of(&portal) - Vec3::new(0.0, 0.0, -2.0)).length() < 1e-5);
    }

    #[test]
    fn equals_inverse_of_relative_portal_times_slot() {
        let poses = PoseSnapshot {
            platform: Mat4::from_rotation_translation(Quat::from_rotation_y(0.4), Vec3::new(1.0, 0.0, 3.0)),
            platform_scale: Mat4::from_scale(Vec3::splat(2.0)),
            portal: Mat4::from_rotation_translation(Quat::from_rotation_y(-1.1), Vec3::new(-2.0, 1.0, 0.5)),
            slot: Mat4::from_translation(Vec3::new(0.2, 1.6, 0.4)),
        };

        let portal_in_platform = (poses.platform * poses.platform_scale).inverse() * poses.portal;
        let expected = portal_in_platform.inverse() * poses.slot;
        assert!(poses.virtual_eye().unwrap().abs_diff_eq(expected, 1e-4));
    }

    #[test]
    fn portal_rotation_mirrors_viewpoint() {
        // Portal turned around: a viewer in front of it looks from the other side
        let poses = snapshot(
            Mat4::IDENTITY,
            Mat4::from_rotation_y(std::f32::consts::PI),
            Mat4::from_translation(Vec3::new(0.0, 0.0, 2.0)),
        );
        let eye = poses.virtual_eye().unwrap();
        assert!((translation_of(&eye) - Vec3::new(0.0, 0.0, -2.0)).length() < 1e-5);
    }

    #[test]
    fn different_viewers_get_different_eyes() {
        let portal = Mat4::from_translation(Vec3::new(0.0, 1.0, -3.0));
        let a = snapshot(Mat4::IDENTITY, portal, Mat4::from_translation(Vec3::new(-1.0, 1.6, 0.0)));
        let b = snapshot(Mat4::IDENTITY, portal, Mat4::from_translation(Vec3::new(1.0, 1.6, 0.0)));

        let eye_a = translation_of(&a.virtual_eye().unwrap());
        let eye_b = translation_of(&b.virtual_eye().unwrap());
        assert!((eye_a - Vec3::new(-1.0, 0.6, 3.0)).length() < 1e-5);
        assert!((eye_b - Vec3::new(1.0, 0.6, 3.0)).length() < 1e-5);
    }

    #[test]
    fn singular_portal_has_no_eye() {
        let poses = snapshot(Mat4::IDENTITY, Mat4::from_scale(Vec3::ZERO), Mat4::IDENTITY);
        assert!(poses.virtual_eye().is_none());
    }

    #[test]
    fn resolve_waits_for_the_platform_chain() {
        let mut scene = SceneGraph::new("main");
        let portal = scene.add_node(scene.root(), "portal_matrix", Mat4::IDENTITY).unwrap();
        assert!(PoseSources::resolve(&scene, "/net/platform_0", "s0_slot0", portal).is_none());

        let platform = scene.ensure_path("/net/platform_0").unwrap();
        let scale = scene.add_node(platform, "scale", Mat4::IDENTITY).unwrap();
        assert!(PoseSources::resolve(&scene, "/net/platform_0", "s0_slot0", portal).is_none());

        let slot = scene.add_node(scale, "s0_slot0", Mat4::IDENTITY).unwrap();
        let sources = PoseSources::resolve(&scene, "/net/platform_0", "s0_slot0", portal).unwrap();
        assert_eq!(sources.slot, slot);
        assert!(sources.read(&scene).is_some());

        scene.remove_subtree(scale).unwrap();
        assert!(sources.read(&scene).is_none());
    }
}

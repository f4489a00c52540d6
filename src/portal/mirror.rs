//! Local mirrors of replicated portals

use super::PortalDescriptor;
use crate::error::PortalResult;
use crate::scene::{BoundField, MeshNode, NodeId, SceneGraph, Transform};
use crate::PortalConfig;
use glam::{Mat4, Vec3};

/// Local, renderable copy of one portal descriptor.
///
/// ```text
/// <name>
/// ├── portal_matrix        bound to descriptor frame
/// └── scene_matrix         bound to descriptor content
///     ├── portal_screen    extent bound to descriptor screen
///     └── screen_visualization
/// ```
///
/// Pose, content and screen extent are driven by bindings only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalMirror {
    descriptor: NodeId,
    name: String,
    frame: NodeId,
    pose: NodeId,
    content: NodeId,
    screen: NodeId,
    debug_quad: Option<NodeId>,
}

impl PortalMirror {
    /// Build a mirror of `descriptor` under `parent`. A failed build leaves
    /// no partial subtree behind.
    pub fn build(
        scene: &mut SceneGraph,
        parent: NodeId,
        descriptor: &PortalDescriptor,
        config: &PortalConfig,
    ) -> PortalResult<Self> {
        let frame = scene.add_node(parent, &descriptor.name, Mat4::IDENTITY)?;

        match Self::assemble(scene, frame, descriptor, config) {
            Ok(mirror) => Ok(mirror),
            Err(err) => {
                scene.remove_subtree(frame)?;
                Err(err)
            }
        }
    }

    fn assemble(
        scene: &mut SceneGraph,
        frame: NodeId,
        descriptor: &PortalDescriptor,
        config: &PortalConfig,
    ) -> PortalResult<Self> {
        let pose = scene.add_node(frame, "portal_matrix", Mat4::IDENTITY)?;
        scene.bind(descriptor.frame, pose, BoundField::Transform)?;

        let content = scene.add_node(frame, "scene_matrix", Mat4::IDENTITY)?;
        scene.bind(descriptor.content, content, BoundField::Transform)?;

        let screen = scene.add_screen(content, "portal_screen", 0.0, 0.0)?;
        scene.bind(descriptor.screen, screen, BoundField::Extent)?;

        let debug_quad = if config.debug_geometry {
            let extent = scene.extent(screen).unwrap_or_default();
            let scale = Transform::from_scale(Vec3::new(extent.width, extent.height, 1.0));
            Some(scene.add_mesh(
                content,
                "screen_visualization",
                MeshNode::new(&config.screen_geometry, &config.debug_material),
                scale.matrix(),
            )?)
        } else {
            None
        };

        Ok(Self {
            descriptor: descriptor.node,
            name: descriptor.name.clone(),
            frame,
            pose,
            content,
            screen,
            debug_quad,
        })
    }

    /// Whether this mirrors the descriptor node `descriptor`
    pub fn is_mirror_of(&self, descriptor: NodeId) -> bool {
        self.descriptor == descriptor
    }

    pub fn descriptor(&self) -> NodeId {
        self.descriptor
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Root node of the mirror; also its identity
    pub fn frame(&self) -> NodeId {
        self.frame
    }

    /// Portal placement, bound to the descriptor frame
    pub fn pose(&self) -> NodeId {
        self.pose
    }

    /// Content frame previews attach their view nodes to
    pub fn content(&self) -> NodeId {
        self.content
    }

    pub fn screen(&self) -> NodeId {
        self.screen
    }

    pub fn debug_quad(&self) -> Option<NodeId> {
        self.debug_quad
    }

    /// Remove the mirror subtree and its bindings
    pub fn remove(self, scene: &mut SceneGraph) -> PortalResult<()> {
        if scene.contains(self.frame) {
            scene.remove_subtree(self.frame)?;
        }
        Ok(())
    }
}

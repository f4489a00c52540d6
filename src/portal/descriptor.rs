//! Replicated portal descriptors

use crate::error::{PortalError, PortalResult};
use crate::scene::{Extent, NodeId, SceneGraph};

/// Structural view of a descriptor subtree.
///
/// ```text
/// <descriptor>
/// ├── frame      portal placement
/// └── content    content transform
///     └── screen width / height
/// ```
///
/// The replication layer owns these nodes; they are only read and bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalDescriptor {
    pub node: NodeId,
    pub name: String,
    pub frame: NodeId,
    pub content: NodeId,
    pub screen: NodeId,
}

impl PortalDescriptor {
    /// Read the descriptor rooted at `node`
    pub fn parse(scene: &SceneGraph, node: NodeId) -> PortalResult<Self> {
        let name = scene
            .node_name(node)
            .ok_or(PortalError::NodeNotFound(node))?
            .to_string();

        let malformed = |reason: &str| PortalError::MalformedDescriptor {
            name: name.clone(),
            reason: reason.to_string(),
        };

        let children = scene.children(node);
        let frame = *children.first().ok_or_else(|| malformed("missing frame node"))?;
        let content = *children.get(1).ok_or_else(|| malformed("missing content node"))?;
        let screen = *scene
            .children(content)
            .first()
            .ok_or_else(|| malformed("missing screen node"))?;

        if scene.extent(screen).is_none() {
            return Err(malformed("screen node has no width/height"));
        }

        Ok(Self {
            node,
            name,
            frame,
            content,
            screen,
        })
    }

    pub fn screen_extent(&self, scene: &SceneGraph) -> Option<Extent> {
        scene.extent(self.screen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Mat4;

    #[test]
    fn parses_well_formed_descriptor() {
        let mut scene = SceneGraph::new("main");
        let node = scene.add_node(scene.root(), "portal_0", Mat4::IDENTITY).unwrap();
        let frame = scene.add_node(node, "frame", Mat4::IDENTITY).unwrap();
        let content = scene.add_node(node, "content", Mat4::IDENTITY).unwrap();
        let screen = scene.add_screen(content, "screen", 1.2, 0.8).unwrap();

        let descriptor = PortalDescriptor::parse(&scene, node).unwrap();
        assert_eq!(descriptor.name, "portal_0");
        assert_eq!(descriptor.frame, frame);
        assert_eq!(descriptor.content, content);
        assert_eq!(descriptor.screen, screen);
        assert_eq!(descriptor.screen_extent(&scene), Some(Extent::new(1.2, 0.8)));
    }

    #[test]
    fn missing_children_are_malformed() {
        let mut scene = SceneGraph::new("main");
        let node = scene.add_node(scene.root(), "portal_0", Mat4::IDENTITY).unwrap();
        scene.add_node(node, "frame", Mat4::IDENTITY).unwrap();
        assert!(matches!(
            PortalDescriptor::parse(&scene, node),
            Err(PortalError::MalformedDescriptor { .. })
        ));

        let content = scene.add_node(node, "content", Mat4::IDENTITY).unwrap();
        assert!(PortalDescriptor::parse(&scene, node).is_err());

        // A screen child without an extent is still malformed
        scene.add_node(content, "screen", Mat4::IDENTITY).unwrap();
        assert!(PortalDescriptor::parse(&scene, node).is_err());
    }
}

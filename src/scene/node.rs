//! Node components stored in the scene world

use bevy_ecs::prelude::*;
use glam::Mat4;

/// Handle to a scene node.
///
/// Identity is the underlying entity, so a node that was removed and a new
/// node created later never compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) Entity);

/// Node name, unique among siblings for path lookup
#[derive(Component, Debug, Clone, PartialEq, Eq)]
pub struct NodeName(pub String);

/// Transform relative to the parent node
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct LocalTransform(pub Mat4);

/// Parent link, absent on the root
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parent(pub NodeId);

/// Ordered child list with a revision counter bumped on every change
#[derive(Component, Debug, Clone, Default)]
pub struct Children {
    nodes: Vec<NodeId>,
    revision: u64,
}

impl Children {
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) fn push(&mut self, node: NodeId) {
        self.nodes.push(node);
        self.revision += 1;
    }

    pub(crate) fn remove(&mut self, node: NodeId) -> bool {
        let before = self.nodes.len();
        self.nodes.retain(|n| *n != node);
        let removed = self.nodes.len() != before;
        if removed {
            self.revision += 1;
        }
        removed
    }
}

/// Width and height of a screen or quad, in meters
#[derive(Component, Debug, Clone, Copy, Default, PartialEq)]
pub struct Extent {
    pub width: f32,
    pub height: f32,
}

impl Extent {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Marker for screen nodes (projection surfaces for cameras)
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Screen;

/// Visibility groups a node belongs to, matched against render masks
#[derive(Component, Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupNames(pub Vec<String>);

/// Quad that samples a named texture
#[derive(Component, Debug, Clone, PartialEq, Eq)]
pub struct TexturedQuad {
    pub texture: String,
    pub stereo: bool,
}

/// Geometry loaded by the renderer from a file
#[derive(Component, Debug, Clone, PartialEq, Eq)]
pub struct MeshNode {
    pub geometry: String,
    pub material: String,
    pub casts_shadow: bool,
}

impl MeshNode {
    pub fn new(geometry: impl Into<String>, material: impl Into<String>) -> Self {
        Self {
            geometry: geometry.into(),
            material: material.into(),
            casts_shadow: false,
        }
    }
}

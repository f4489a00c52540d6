//! Scene graph facade
//!
//! Nodes live in a bevy `World`; hierarchy, names and transforms are plain
//! components. Fields that mirror other nodes are driven by a [`BindingTable`]
//! and may not be written directly.

mod binding;
mod node;
mod transform;

pub use binding::*;
pub use node::*;
pub use transform::*;

use crate::error::{PortalError, PortalResult};
use bevy_ecs::prelude::*;
use glam::Mat4;
use std::collections::HashSet;

/// Hierarchical node store for one named scene
pub struct SceneGraph {
    name: String,
    world: World,
    root: NodeId,
    bindings: BindingTable,
}

impl SceneGraph {
    pub fn new(name: impl Into<String>) -> Self {
        let mut world = World::new();
        let root = world
            .spawn((
                NodeName(String::new()),
                LocalTransform(Mat4::IDENTITY),
                Children::default(),
            ))
            .id();

        Self {
            name: name.into(),
            world,
            root: NodeId(root),
            bindings: BindingTable::default(),
        }
    }

    /// Scene identifier cameras refer to
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.world.get::<NodeName>(node.0).is_some()
    }

    fn require(&self, node: NodeId) -> PortalResult<()> {
        if self.contains(node) {
            Ok(())
        } else {
            Err(PortalError::NodeNotFound(node))
        }
    }

    // Node creation

    /// Create a transform node under `parent`
    pub fn add_node(&mut self, parent: NodeId, name: &str, transform: Mat4) -> PortalResult<NodeId> {
        self.require(parent)?;

        let id = NodeId(
            self.world
                .spawn((
                    NodeName(name.to_string()),
                    LocalTransform(transform),
                    Parent(parent),
                    Children::default(),
                ))
                .id(),
        );

        if let Some(mut children) = self.world.get_mut::<Children>(parent.0) {
            children.push(id);
        }
        Ok(id)
    }

    /// Create a screen node with the given extent
    pub fn add_screen(
        &mut self,
        parent: NodeId,
        name: &str,
        width: f32,
        height: f32,
    ) -> PortalResult<NodeId> {
        let id = self.add_node(parent, name, Mat4::IDENTITY)?;
        self.world
            .entity_mut(id.0)
            .insert((Screen, Extent::new(width, height)));
        Ok(id)
    }

    /// Create a textured quad node of the given extent
    pub fn add_textured_quad(
        &mut self,
        parent: NodeId,
        name: &str,
        quad: TexturedQuad,
        extent: Extent,
    ) -> PortalResult<NodeId> {
        let id = self.add_node(parent, name, Mat4::IDENTITY)?;
        self.world.entity_mut(id.0).insert((quad, extent));
        Ok(id)
    }

    /// Create a geometry node
    pub fn add_mesh(
        &mut self,
        parent: NodeId,
        name: &str,
        mesh: MeshNode,
        transform: Mat4,
    ) -> PortalResult<NodeId> {
        let id = self.add_node(parent, name, transform)?;
        self.world.entity_mut(id.0).insert(mesh);
        Ok(id)
    }

    /// Remove `node` and all of its descendants, together with every binding
    /// touching them. Returns the number of removed nodes.
    pub fn remove_subtree(&mut self, node: NodeId) -> PortalResult<usize> {
        self.require(node)?;
        if node == self.root {
            return Err(PortalError::RootRemoval);
        }

        if let Some(parent) = self.parent(node) {
            if let Some(mut children) = self.world.get_mut::<Children>(parent.0) {
                children.remove(node);
            }
        }

        let mut removed = HashSet::new();
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            stack.extend_from_slice(self.children(current));
            removed.insert(current);
        }

        for id in &removed {
            self.world.despawn(id.0);
        }
        self.bindings.forget_nodes(&removed);

        Ok(removed.len())
    }

    // Hierarchy and lookup

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.world.get::<Parent>(node.0).map(|p| p.0)
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.world
            .get::<Children>(node.0)
            .map(|c| c.nodes())
            .unwrap_or(&[])
    }

    /// Revision of the child list, bumped on every attach or detach
    pub fn children_revision(&self, node: NodeId) -> Option<u64> {
        self.world.get::<Children>(node.0).map(|c| c.revision())
    }

    pub fn node_name(&self, node: NodeId) -> Option<&str> {
        self.world.get::<NodeName>(node.0).map(|n| n.0.as_str())
    }

    pub fn child_by_name(&self, node: NodeId, name: &str) -> Option<NodeId> {
        self.children(node)
            .iter()
            .copied()
            .find(|c| self.node_name(*c) == Some(name))
    }

    /// Resolve an absolute path such as `/net/platform_0/scale`
    pub fn find(&self, path: &str) -> Option<NodeId> {
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .try_fold(self.root, |node, segment| self.child_by_name(node, segment))
    }

    /// Like [`find`](Self::find) but reports the missing path
    pub fn resolve(&self, path: &str) -> PortalResult<NodeId> {
        self.find(path)
            .ok_or_else(|| PortalError::PathNotFound(path.to_string()))
    }

    /// Resolve a path, creating identity transform nodes for missing segments
    pub fn ensure_path(&mut self, path: &str) -> PortalResult<NodeId> {
        let mut node = self.root;
        for segment in path.split('/').filter(|segment| !segment.is_empty()) {
            node = match self.child_by_name(node, segment) {
                Some(child) => child,
                None => self.add_node(node, segment, Mat4::IDENTITY)?,
            };
        }
        Ok(node)
    }

    /// Absolute path of a node
    pub fn path_of(&self, node: NodeId) -> Option<String> {
        self.require(node).ok()?;

        let mut segments = Vec::new();
        let mut current = node;
        while let Some(parent) = self.parent(current) {
            segments.push(self.node_name(current)?.to_string());
            current = parent;
        }
        segments.reverse();
        Some(format!("/{}", segments.join("/")))
    }

    // Fields

    pub fn transform(&self, node: NodeId) -> Option<Mat4> {
        self.world.get::<LocalTransform>(node.0).map(|t| t.0)
    }

    /// Write a local transform. Fails on bound transforms.
    pub fn set_transform(&mut self, node: NodeId, transform: Mat4) -> PortalResult<()> {
        self.require(node)?;
        if self.bindings.is_bound(node, BoundField::Transform) {
            return Err(PortalError::FieldBound {
                node,
                field: BoundField::Transform.name(),
            });
        }
        self.write_transform(node, transform);
        Ok(())
    }

    fn write_transform(&mut self, node: NodeId, transform: Mat4) -> bool {
        match self.world.get_mut::<LocalTransform>(node.0) {
            Some(mut local) if local.0 != transform => {
                local.0 = transform;
                true
            }
            _ => false,
        }
    }

    /// Product of all local transforms from the root down to `node`
    pub fn world_transform(&self, node: NodeId) -> Option<Mat4> {
        let mut matrix = self.transform(node)?;
        let mut current = node;
        while let Some(parent) = self.parent(current) {
            matrix = self.transform(parent)? * matrix;
            current = parent;
        }
        Some(matrix)
    }

    pub fn extent(&self, node: NodeId) -> Option<Extent> {
        self.world.get::<Extent>(node.0).copied()
    }

    /// Write an extent. Fails on bound extents.
    pub fn set_extent(&mut self, node: NodeId, extent: Extent) -> PortalResult<()> {
        self.require(node)?;
        if self.bindings.is_bound(node, BoundField::Extent) {
            return Err(PortalError::FieldBound {
                node,
                field: BoundField::Extent.name(),
            });
        }
        self.write_extent(node, extent);
        Ok(())
    }

    fn write_extent(&mut self, node: NodeId, extent: Extent) -> bool {
        if !self.contains(node) {
            return false;
        }
        if self.world.get::<Extent>(node.0).is_none() {
            self.world.entity_mut(node.0).insert(extent);
            return true;
        }
        match self.world.get_mut::<Extent>(node.0) {
            Some(mut current) if *current != extent => {
                *current = extent;
                true
            }
            _ => false,
        }
    }

    pub fn groups(&self, node: NodeId) -> &[String] {
        self.world
            .get::<GroupNames>(node.0)
            .map(|g| g.0.as_slice())
            .unwrap_or(&[])
    }

    pub fn set_groups(&mut self, node: NodeId, groups: Vec<String>) -> PortalResult<()> {
        self.require(node)?;
        self.world.entity_mut(node.0).insert(GroupNames(groups));
        Ok(())
    }

    pub fn textured_quad(&self, node: NodeId) -> Option<&TexturedQuad> {
        self.world.get::<TexturedQuad>(node.0)
    }

    /// Point a quad at another texture
    pub fn set_quad_texture(&mut self, node: NodeId, texture: &str) -> PortalResult<()> {
        let mut quad = self
            .world
            .get_mut::<TexturedQuad>(node.0)
            .ok_or(PortalError::MissingComponent {
                node,
                component: "TexturedQuad",
            })?;
        if quad.texture != texture {
            quad.texture = texture.to_string();
        }
        Ok(())
    }

    pub fn mesh(&self, node: NodeId) -> Option<&MeshNode> {
        self.world.get::<MeshNode>(node.0)
    }

    pub fn is_screen(&self, node: NodeId) -> bool {
        self.world.get::<Screen>(node.0).is_some()
    }

    // Bindings

    /// Bind `field` of `target` to follow `source`. The target is synced
    /// immediately and then once per [`propagate_bindings`](Self::propagate_bindings).
    pub fn bind(&mut self, source: NodeId, target: NodeId, field: BoundField) -> PortalResult<BindingId> {
        self.require(source)?;
        self.require(target)?;

        match field {
            BoundField::Transform => {
                let value = self.transform(source).ok_or(PortalError::MissingComponent {
                    node: source,
                    component: "LocalTransform",
                })?;
                self.write_transform(target, value);
            }
            BoundField::Extent => {
                let value = self.extent(source).ok_or(PortalError::MissingComponent {
                    node: source,
                    component: "Extent",
                })?;
                self.write_extent(target, value);
            }
        }

        Ok(self.bindings.add(source, target, field))
    }

    pub fn unbind(&mut self, id: BindingId) -> bool {
        self.bindings.remove(id)
    }

    pub fn bindings(&self) -> &BindingTable {
        &self.bindings
    }

    /// Copy every bound field from its source, in registration order.
    /// Returns the number of targets whose value changed.
    pub fn propagate_bindings(&mut self) -> usize {
        let mut changed = 0;

        for index in 0..self.bindings.len() {
            let Some(binding) = self.bindings.get(index) else {
                break;
            };

            let updated = match binding.field {
                BoundField::Transform => match self.transform(binding.source) {
                    Some(value) => self.write_transform(binding.target, value),
                    None => false,
                },
                BoundField::Extent => match self.extent(binding.source) {
                    Some(value) => self.write_extent(binding.target, value),
                    None => false,
                },
            };

            if updated {
                changed += 1;
            }
        }

        changed
    }
}

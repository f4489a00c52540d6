//! One-way field bindings between scene nodes
//!
//! A binding copies a field from a source node to a target node. Bindings are
//! evaluated once per frame in registration order, so a binding whose source
//! is itself a bound target sees the value written earlier in the same pass.

use super::NodeId;
use std::collections::HashSet;

/// Fields that can be bound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoundField {
    Transform,
    Extent,
}

impl BoundField {
    pub fn name(self) -> &'static str {
        match self {
            BoundField::Transform => "transform",
            BoundField::Extent => "extent",
        }
    }
}

/// Handle to a registered binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldBinding {
    pub id: BindingId,
    pub source: NodeId,
    pub target: NodeId,
    pub field: BoundField,
}

/// Bindings in registration order
#[derive(Debug, Default)]
pub struct BindingTable {
    bindings: Vec<FieldBinding>,
    next_id: u64,
}

impl BindingTable {
    /// Register a binding. A target field has at most one source, so an
    /// existing binding on the same target field is replaced.
    pub fn add(&mut self, source: NodeId, target: NodeId, field: BoundField) -> BindingId {
        self.bindings
            .retain(|b| !(b.target == target && b.field == field));

        let id = BindingId(self.next_id);
        self.next_id += 1;
        self.bindings.push(FieldBinding {
            id,
            source,
            target,
            field,
        });
        id
    }

    pub fn remove(&mut self, id: BindingId) -> bool {
        let before = self.bindings.len();
        self.bindings.retain(|b| b.id != id);
        self.bindings.len() != before
    }

    /// Whether `field` on `target` is driven by a binding
    pub fn is_bound(&self, target: NodeId, field: BoundField) -> bool {
        self.bindings
            .iter()
            .any(|b| b.target == target && b.field == field)
    }

    /// Drop every binding that reads from or writes to a removed node
    pub fn forget_nodes(&mut self, removed: &HashSet<NodeId>) -> usize {
        let before = self.bindings.len();
        self.bindings
            .retain(|b| !removed.contains(&b.source) && !removed.contains(&b.target));
        before - self.bindings.len()
    }

    pub fn get(&self, index: usize) -> Option<FieldBinding> {
        self.bindings.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldBinding> {
        self.bindings.iter()
    }
}

//! Error type shared by the scene facade, registry and previews

use crate::scene::NodeId;
use thiserror::Error;

/// Portal subsystem error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PortalError {
    #[error("Scene node {0:?} does not exist")]
    NodeNotFound(NodeId),
    #[error("The scene root cannot be removed")]
    RootRemoval,
    #[error("No node at path {0}")]
    PathNotFound(String),
    #[error("Malformed portal descriptor '{name}': {reason}")]
    MalformedDescriptor { name: String, reason: String },
    #[error("Field {field} of node {node:?} is bound and cannot be written directly")]
    FieldBound { node: NodeId, field: &'static str },
    #[error("Node {node:?} has no {component} component")]
    MissingComponent {
        node: NodeId,
        component: &'static str,
    },
    #[error("View {view} already has a preview for portal '{portal}'")]
    DuplicatePreview { view: String, portal: String },
    #[error("View {0} is already registered")]
    DuplicateView(String),
    #[error("Unknown view {0}")]
    UnknownView(String),
    #[error("Invalid render mask '{0}'")]
    InvalidRenderMask(String),
}

pub type PortalResult<T> = Result<T, PortalError>;

//! Portal mirroring and per-view previews
//!
//! The [`PortalRegistry`] watches the replicated descriptor list and builds
//! one [`PortalMirror`] per descriptor. Every [`PortalListener`] (normally a
//! [`View`](crate::View)) then builds a [`PortalPreview`] for each mirror.

mod descriptor;
mod mirror;
mod pose;
mod preview;
mod registry;
mod visibility;

pub use descriptor::PortalDescriptor;
pub use mirror::PortalMirror;
pub use pose::{PoseSnapshot, PoseSources};
pub use preview::{output_texture_name, PortalPreview, PreviewEyes, PreviewOutcome};
pub use registry::{PortalListener, PortalRegistry, ScanReport};
pub use visibility::{view_angle_degrees, PreviewState};

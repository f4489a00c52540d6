//! Render-facing state produced for the external renderer
//!
//! Nothing here draws. Cameras, pipelines and masks describe what the
//! renderer should draw, from where, and whether to draw it at all.

mod camera;
mod mask;
mod pipeline;

pub use camera::*;
pub use mask::*;
pub use pipeline::*;

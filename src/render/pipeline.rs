//! Off-screen pipelines and the per-view pre-render list

use super::PortalCamera;
use glam::UVec2;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// How the pipeline clears its target before drawing
#[derive(Debug, Clone, PartialEq)]
pub enum BackgroundMode {
    Color([f32; 3]),
    SkymapTexture(String),
}

impl Default for BackgroundMode {
    fn default() -> Self {
        BackgroundMode::Color([0.0, 0.0, 0.0])
    }
}

/// A camera rendering into a named texture instead of a window
#[derive(Debug, Clone, PartialEq)]
pub struct OffscreenPipeline {
    pub enabled: bool,
    pub camera: PortalCamera,
    pub left_resolution: UVec2,
    /// Present for stereo pipelines
    pub right_resolution: Option<UVec2>,
    /// Texture name other passes sample the result by
    pub output_texture: String,
    pub background: BackgroundMode,
}

impl OffscreenPipeline {
    pub fn is_stereo(&self) -> bool {
        self.right_resolution.is_some()
    }
}

/// Unique identifier for a registered pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineId(u64);

static NEXT_PIPELINE_ID: AtomicU64 = AtomicU64::new(0);

/// Shared handle to a pipeline.
///
/// The owning preview writes to it during the frame update; the renderer
/// reads it through the view's [`PreRenderList`].
#[derive(Debug, Clone)]
pub struct PipelineHandle {
    id: PipelineId,
    inner: Arc<RwLock<OffscreenPipeline>>,
}

impl PipelineHandle {
    pub fn new(pipeline: OffscreenPipeline) -> Self {
        Self {
            id: PipelineId(NEXT_PIPELINE_ID.fetch_add(1, Ordering::Relaxed)),
            inner: Arc::new(RwLock::new(pipeline)),
        }
    }

    pub fn id(&self) -> PipelineId {
        self.id
    }

    pub fn read(&self) -> RwLockReadGuard<'_, OffscreenPipeline> {
        self.inner.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, OffscreenPipeline> {
        self.inner.write()
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.read().enabled
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.inner.write().enabled = enabled;
    }
}

/// Pipelines a view renders before its own pass, in registration order
#[derive(Debug, Default)]
pub struct PreRenderList {
    pipelines: Vec<PipelineHandle>,
}

impl PreRenderList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, pipeline: PipelineHandle) {
        self.pipelines.push(pipeline);
    }

    /// Remove a pipeline; the renderer stops seeing it on the next frame
    pub fn unregister(&mut self, id: PipelineId) -> bool {
        let before = self.pipelines.len();
        self.pipelines.retain(|p| p.id() != id);
        self.pipelines.len() != before
    }

    pub fn contains(&self, id: PipelineId) -> bool {
        self.pipelines.iter().any(|p| p.id() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PipelineHandle> {
        self.pipelines.iter()
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }

    pub fn enabled_count(&self) -> usize {
        self.pipelines.iter().filter(|p| p.is_enabled()).count()
    }

    /// Output textures the renderer produces this frame, in order
    pub fn enabled_outputs(&self) -> Vec<String> {
        self.pipelines
            .iter()
            .filter_map(|p| {
                let pipeline = p.read();
                pipeline.enabled.then(|| pipeline.output_texture.clone())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RenderMask;
    use crate::scene::SceneGraph;
    use glam::Mat4;

    fn pipeline(output: &str) -> OffscreenPipeline {
        let mut scene = SceneGraph::new("main");
        let screen = scene.add_screen(scene.root(), "screen", 1.0, 1.0).unwrap();
        let eye = scene.add_node(scene.root(), "eye", Mat4::IDENTITY).unwrap();
        OffscreenPipeline {
            enabled: true,
            camera: PortalCamera::mono("main", RenderMask::all(), screen, eye),
            left_resolution: UVec2::new(1000, 1000),
            right_resolution: None,
            output_texture: output.to_string(),
            background: BackgroundMode::default(),
        }
    }

    #[test]
    fn list_keeps_registration_order() {
        let mut list = PreRenderList::new();
        let a = PipelineHandle::new(pipeline("a"));
        let b = PipelineHandle::new(pipeline("b"));
        list.register(a.clone());
        list.register(b.clone());

        assert_ne!(a.id(), b.id());
        assert_eq!(list.enabled_outputs(), vec!["a".to_string(), "b".to_string()]);

        a.set_enabled(false);
        assert_eq!(list.enabled_count(), 1);
        assert_eq!(list.enabled_outputs(), vec!["b".to_string()]);
    }

    #[test]
    fn unregister_removes_only_that_pipeline() {
        let mut list = PreRenderList::new();
        let a = PipelineHandle::new(pipeline("a"));
        let b = PipelineHandle::new(pipeline("b"));
        list.register(a.clone());
        list.register(b.clone());

        assert!(list.unregister(a.id()));
        assert!(!list.unregister(a.id()));
        assert!(!list.contains(a.id()));
        assert!(list.contains(b.id()));
        assert_eq!(list.len(), 1);
    }
}

//! Views: one display output for one user slot
//!
//! The display/slot configuration lives elsewhere; a [`View`] carries only
//! what portal previews need from it, plus the previews it owns and the
//! pipelines it renders before its own pass.

use crate::error::{PortalError, PortalResult};
use crate::portal::{PortalListener, PortalMirror, PortalPreview, PreviewOutcome, PreviewState};
use crate::render::{PreRenderList, RenderMask};
use crate::scene::{NodeId, SceneGraph};
use crate::PortalConfig;
use glam::UVec2;
use log::{info, warn};
use std::fmt;

/// Identity of a view: screen number on the platform plus slot id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId {
    pub screen_num: u32,
    pub slot_id: u32,
}

impl ViewId {
    /// Render mask term matching the group of every view
    pub const GROUP_PATTERN: &'static str = "s*_slot*";

    pub fn new(screen_num: u32, slot_id: u32) -> Self {
        Self {
            screen_num,
            slot_id,
        }
    }

    /// Visibility group and node name of this view: `s<screen>_slot<slot>`
    pub fn group_name(&self) -> String {
        format!("s{}_slot{}", self.screen_num, self.slot_id)
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}_slot{}", self.screen_num, self.slot_id)
    }
}

/// Read-only description of a view
#[derive(Debug, Clone)]
pub struct ViewInfo {
    pub id: ViewId,
    pub stereo: bool,
    pub platform_id: u32,
    /// Output size in pixels
    pub screen_size: UVec2,
    /// Scene graph this view renders
    pub scene: String,
    /// Base mask of the view's own camera, before per-view groups are added
    pub render_mask: RenderMask,
    /// Overrides [`PortalConfig::eye_distance`]
    pub eye_distance: Option<f32>,
}

impl ViewInfo {
    pub fn new(id: ViewId, platform_id: u32, scene: impl Into<String>) -> Self {
        Self {
            id,
            stereo: false,
            platform_id,
            screen_size: UVec2::new(1920, 1080),
            scene: scene.into(),
            render_mask: RenderMask::all(),
            eye_distance: None,
        }
    }

    pub fn with_stereo(mut self, stereo: bool) -> Self {
        self.stereo = stereo;
        self
    }

    pub fn with_screen_size(mut self, width: u32, height: u32) -> Self {
        self.screen_size = UVec2::new(width, height);
        self
    }

    pub fn with_render_mask(mut self, render_mask: RenderMask) -> Self {
        self.render_mask = render_mask;
        self
    }

    pub fn with_eye_distance(mut self, eye_distance: f32) -> Self {
        self.eye_distance = Some(eye_distance);
        self
    }

    /// Mask of this view's own camera given the other views of the scene.
    ///
    /// Quads tagged with the own group pass; quads of every peer are hidden.
    pub fn view_mask(&self, peers: &[ViewId]) -> RenderMask {
        let own = self.id.group_name();
        let mut mask = self.render_mask.clone();
        if mask.has_includes() {
            mask = mask.including(own);
        }
        for peer in peers.iter().filter(|p| **p != self.id) {
            mask = mask.excluding(peer.group_name());
        }
        mask
    }

    /// Path of the platform node this view's slot is mounted on
    pub fn platform_path(&self, config: &PortalConfig) -> String {
        format!(
            "{}/platform_{}",
            config.platform_root.trim_end_matches('/'),
            self.platform_id
        )
    }
}

/// Preview counts from one frame of a view
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewFrameStats {
    pub visible: usize,
    pub occluded: usize,
    pub unresolved: usize,
    pub failed: usize,
}

/// A display output with its portal previews
#[derive(Debug)]
pub struct View {
    info: ViewInfo,
    render_mask: RenderMask,
    pre_render: PreRenderList,
    previews: Vec<PortalPreview>,
}

impl View {
    pub fn new(info: ViewInfo) -> Self {
        Self {
            render_mask: info.view_mask(&[]),
            info,
            pre_render: PreRenderList::new(),
            previews: Vec::new(),
        }
    }

    pub fn id(&self) -> ViewId {
        self.info.id
    }

    pub fn info(&self) -> &ViewInfo {
        &self.info
    }

    /// Mask the renderer applies to this view's own camera
    pub fn render_mask(&self) -> &RenderMask {
        &self.render_mask
    }

    /// Recompute the view mask after views joined or left the scene
    pub fn set_peers(&mut self, peers: &[ViewId]) {
        self.render_mask = self.info.view_mask(peers);
    }

    /// Pipelines to render before this view's own pass
    pub fn pre_render(&self) -> &PreRenderList {
        &self.pre_render
    }

    pub fn previews(&self) -> &[PortalPreview] {
        &self.previews
    }

    /// Preview of the mirror whose frame node is `mirror`
    pub fn preview_for(&self, mirror: NodeId) -> Option<&PortalPreview> {
        self.previews.iter().find(|p| p.mirror() == mirror)
    }

    /// Build the preview of a newly mirrored portal.
    ///
    /// Each mirror gets exactly one preview per view; asking twice is an error.
    pub fn create_preview(
        &mut self,
        scene: &mut SceneGraph,
        mirror: &PortalMirror,
        config: &PortalConfig,
    ) -> PortalResult<()> {
        if self.preview_for(mirror.frame()).is_some() {
            return Err(PortalError::DuplicatePreview {
                view: self.info.id.to_string(),
                portal: mirror.name().to_string(),
            });
        }

        let preview = PortalPreview::build(scene, mirror, &self.info, &mut self.pre_render, config)?;
        info!(
            "Created preview {} for view {}",
            preview.output_texture(),
            self.info.id
        );
        self.previews.push(preview);
        Ok(())
    }

    /// Release the preview of a mirror, if this view has one
    pub fn release_preview(&mut self, scene: &mut SceneGraph, mirror: NodeId) -> PortalResult<bool> {
        let Some(index) = self.previews.iter().position(|p| p.mirror() == mirror) else {
            return Ok(false);
        };

        let preview = self.previews.remove(index);
        info!(
            "Released preview {} of view {}",
            preview.output_texture(),
            self.info.id
        );
        preview.release(scene, &mut self.pre_render)?;
        Ok(true)
    }

    /// Release every preview, e.g. when the view goes away
    pub fn release_all(&mut self, scene: &mut SceneGraph) -> PortalResult<()> {
        for preview in self.previews.drain(..) {
            preview.release(scene, &mut self.pre_render)?;
        }
        Ok(())
    }

    /// Recompute pose and visibility of every preview. A failing preview is
    /// logged and does not stop the others.
    pub fn update_previews(&mut self, scene: &mut SceneGraph, config: &PortalConfig) -> ViewFrameStats {
        let mut stats = ViewFrameStats::default();

        for preview in &mut self.previews {
            match preview.update(scene, config) {
                Ok(PreviewOutcome::Evaluated(PreviewState::Visible)) => stats.visible += 1,
                Ok(PreviewOutcome::Evaluated(PreviewState::Occluded)) => stats.occluded += 1,
                Ok(PreviewOutcome::PoseUnresolved) => stats.unresolved += 1,
                Err(err) => {
                    warn!(
                        "Preview {} of view {} failed to update: {}",
                        preview.output_texture(),
                        self.info.id,
                        err
                    );
                    stats.failed += 1;
                }
            }
        }

        stats
    }
}

impl PortalListener for View {
    fn on_portal_added(
        &mut self,
        scene: &mut SceneGraph,
        mirror: &PortalMirror,
        config: &PortalConfig,
    ) -> PortalResult<()> {
        self.create_preview(scene, mirror, config)
    }

    fn on_portal_removed(&mut self, scene: &mut SceneGraph, mirror: &PortalMirror) -> PortalResult<()> {
        self.release_preview(scene, mirror.frame()).map(|_| ())
    }
}

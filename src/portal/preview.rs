//! Per-view portal previews
//!
//! A preview is the (view, portal) pair: a virtual view node inside the
//! portal content, an off-screen pipeline rendering from it, and a quad over
//! the portal that only the owning viewer sees.

use super::pose::PoseSources;
use super::visibility::{view_angle_degrees, PreviewState};
use super::PortalMirror;
use crate::error::{PortalError, PortalResult};
use crate::render::{
    OffscreenPipeline, PipelineHandle, PortalCamera, PreRenderList, RenderMask,
};
use crate::scene::{
    translation_of, BoundField, Extent, MeshNode, NodeId, SceneGraph, TexturedQuad, Transform,
};
use crate::view::{ViewId, ViewInfo};
use crate::PortalConfig;
use glam::{Mat4, Vec3};
use log::{debug, trace};

/// Texture a preview renders into: `<mirror>_s<screen>_slot<slot>`
pub fn output_texture_name(mirror_name: &str, view: ViewId) -> String {
    format!("{}_{}", mirror_name, view.group_name())
}

/// Result of one preview update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewOutcome {
    /// Pose written and visibility decided
    Evaluated(PreviewState),
    /// Platform chain not found yet; nothing changed this frame
    PoseUnresolved,
}

/// Eye nodes of a preview, under its view node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewEyes {
    Mono { eye: NodeId, marker: Option<NodeId> },
    Stereo { left: NodeId, right: NodeId },
}

/// One portal as seen by one view
#[derive(Debug)]
pub struct PortalPreview {
    mirror: NodeId,
    mirror_pose: NodeId,
    mirror_screen: NodeId,
    view_id: ViewId,
    platform_path: String,
    view_node: NodeId,
    eyes: PreviewEyes,
    quad: NodeId,
    border: NodeId,
    output_texture: String,
    pipeline: PipelineHandle,
    sources: Option<PoseSources>,
    state: PreviewState,
}

impl PortalPreview {
    /// Build the preview of `mirror` for the view described by `info` and
    /// register its pipeline in `pre_render`.
    ///
    /// On failure every node created so far is removed and nothing is
    /// registered.
    pub fn build(
        scene: &mut SceneGraph,
        mirror: &PortalMirror,
        info: &ViewInfo,
        pre_render: &mut PreRenderList,
        config: &PortalConfig,
    ) -> PortalResult<Self> {
        let mut created = Vec::new();

        match Self::assemble(scene, mirror, info, config, &mut created) {
            Ok(preview) => {
                pre_render.register(preview.pipeline.clone());
                Ok(preview)
            }
            Err(err) => {
                for node in created.into_iter().rev() {
                    if scene.contains(node) {
                        scene.remove_subtree(node)?;
                    }
                }
                Err(err)
            }
        }
    }

    /// Create the preview nodes and pipeline; top-level nodes are recorded in
    /// `created` as they appear
    fn assemble(
        scene: &mut SceneGraph,
        mirror: &PortalMirror,
        info: &ViewInfo,
        config: &PortalConfig,
        created: &mut Vec<NodeId>,
    ) -> PortalResult<Self> {
        let group = info.id.group_name();
        let output_texture = output_texture_name(mirror.name(), info.id);

        // Virtual viewer inside the portal content
        let offset = Transform::from_position(config.preview_offset);
        let view_node = scene.add_node(mirror.content(), &group, offset.matrix())?;
        created.push(view_node);

        let eyes = if info.stereo {
            let half = info.eye_distance.unwrap_or(config.eye_distance) * 0.5;
            PreviewEyes::Stereo {
                left: scene.add_node(view_node, "eyeL", Mat4::from_translation(Vec3::new(-half, 0.0, 0.0)))?,
                right: scene.add_node(view_node, "eyeR", Mat4::from_translation(Vec3::new(half, 0.0, 0.0)))?,
            }
        } else {
            let eye = scene.add_node(view_node, "eye", Mat4::IDENTITY)?;
            let marker = if config.debug_geometry {
                let marker = scene.add_mesh(
                    eye,
                    "eye_visualization",
                    MeshNode::new(&config.eye_geometry, &config.debug_material),
                    Mat4::from_scale(Vec3::splat(0.03)),
                )?;
                scene.set_groups(marker, vec![config.hidden_group.clone()])?;
                Some(marker)
            } else {
                None
            };
            PreviewEyes::Mono { eye, marker }
        };

        // Portal cameras never draw portal quads, whichever view owns them
        let mask = RenderMask::all()
            .excluding(config.hidden_group.clone())
            .excluding(ViewId::GROUP_PATTERN);
        let camera = match eyes {
            PreviewEyes::Stereo { left, right } => {
                PortalCamera::stereo(info.scene.clone(), mask, mirror.screen(), left, right)
            }
            PreviewEyes::Mono { eye, .. } => {
                PortalCamera::mono(info.scene.clone(), mask, mirror.screen(), eye)
            }
        };

        // Quad over the portal, visible to this viewer only
        let extent = scene.extent(mirror.screen()).unwrap_or_default();
        let quad = scene.add_textured_quad(
            mirror.pose(),
            &format!("texture_{}", group),
            TexturedQuad {
                texture: output_texture.clone(),
                stereo: info.stereo,
            },
            extent,
        )?;
        created.push(quad);
        scene.bind(mirror.screen(), quad, BoundField::Extent)?;
        scene.set_groups(quad, vec![group.clone()])?;

        let border = scene.add_mesh(
            mirror.pose(),
            &format!("border_{}", group),
            MeshNode::new(&config.screen_geometry, &config.border_material),
            border_matrix(extent),
        )?;
        created.push(border);
        scene.set_groups(border, vec![group])?;

        let pipeline = PipelineHandle::new(OffscreenPipeline {
            enabled: true,
            camera,
            left_resolution: config.offscreen_resolution,
            right_resolution: info.stereo.then_some(config.offscreen_resolution),
            output_texture: output_texture.clone(),
            background: config.background.clone(),
        });

        Ok(Self {
            mirror: mirror.frame(),
            mirror_pose: mirror.pose(),
            mirror_screen: mirror.screen(),
            view_id: info.id,
            platform_path: info.platform_path(config),
            view_node,
            eyes,
            quad,
            border,
            output_texture,
            pipeline,
            sources: None,
            state: PreviewState::Visible,
        })
    }

    /// Frame node of the mirror this preview belongs to
    pub fn mirror(&self) -> NodeId {
        self.mirror
    }

    pub fn view_id(&self) -> ViewId {
        self.view_id
    }

    pub fn output_texture(&self) -> &str {
        &self.output_texture
    }

    pub fn pipeline(&self) -> &PipelineHandle {
        &self.pipeline
    }

    pub fn view_node(&self) -> NodeId {
        self.view_node
    }

    pub fn eyes(&self) -> PreviewEyes {
        self.eyes
    }

    pub fn quad(&self) -> NodeId {
        self.quad
    }

    pub fn border(&self) -> NodeId {
        self.border
    }

    pub fn state(&self) -> PreviewState {
        self.state
    }

    /// Pose sources, once the platform chain has been found
    pub fn sources(&self) -> Option<PoseSources> {
        self.sources
    }

    /// Recompute the virtual pose and the visibility state
    pub fn update(&mut self, scene: &mut SceneGraph, config: &PortalConfig) -> PortalResult<PreviewOutcome> {
        let Some(sources) = self.resolve_sources(scene) else {
            debug!(
                "Pose chain of preview {} not resolvable yet",
                self.output_texture
            );
            return Ok(PreviewOutcome::PoseUnresolved);
        };

        let Some(poses) = sources.read(scene) else {
            // A source node went away; look the chain up again next frame
            self.sources = None;
            return Ok(PreviewOutcome::PoseUnresolved);
        };
        let Some(eye) = poses.virtual_eye() else {
            debug!("Portal pose of preview {} is singular", self.output_texture);
            return Ok(PreviewOutcome::PoseUnresolved);
        };
        scene.set_transform(self.view_node, eye)?;

        if let Some(extent) = scene.extent(self.mirror_screen) {
            scene.set_transform(self.border, border_matrix(extent))?;
        }

        let viewer = scene
            .world_transform(sources.slot)
            .map(|m| translation_of(&m))
            .ok_or(PortalError::NodeNotFound(sources.slot))?;
        let quad_world = scene
            .world_transform(self.quad)
            .ok_or(PortalError::NodeNotFound(self.quad))?;

        // Degenerate geometry keeps the previous state
        let next = match view_angle_degrees(viewer, &quad_world) {
            Some(angle) => config.visibility.next_state(self.state, angle),
            None => self.state,
        };
        if next != self.state {
            trace!(
                "Preview {} switched {:?} -> {:?}",
                self.output_texture,
                self.state,
                next
            );
        }

        self.apply_state(scene, config, next)?;
        Ok(PreviewOutcome::Evaluated(next))
    }

    fn resolve_sources(&mut self, scene: &SceneGraph) -> Option<PoseSources> {
        if self.sources.is_none() {
            self.sources = PoseSources::resolve(
                scene,
                &self.platform_path,
                &self.view_id.group_name(),
                self.mirror_pose,
            );
        }
        self.sources
    }

    /// Pipeline flag and quad texture always agree with `state`
    fn apply_state(
        &mut self,
        scene: &mut SceneGraph,
        config: &PortalConfig,
        state: PreviewState,
    ) -> PortalResult<()> {
        self.state = state;
        self.pipeline.set_enabled(state.is_visible());

        let texture = match state {
            PreviewState::Visible => self.output_texture.as_str(),
            PreviewState::Occluded => config.placeholder_texture.as_str(),
        };
        scene.set_quad_texture(self.quad, texture)
    }

    /// Unregister the pipeline and remove every node the preview created
    pub fn release(self, scene: &mut SceneGraph, pre_render: &mut PreRenderList) -> PortalResult<()> {
        self.pipeline.set_enabled(false);
        pre_render.unregister(self.pipeline.id());

        for node in [self.view_node, self.quad, self.border] {
            if scene.contains(node) {
                scene.remove_subtree(node)?;
            }
        }
        Ok(())
    }
}

fn border_matrix(extent: Extent) -> Mat4 {
    Mat4::from_scale(Vec3::new(extent.width, extent.height, 1.0))
}

//! Frame driver tying the registry and the views together

use crate::error::{PortalError, PortalResult};
use crate::portal::PortalRegistry;
use crate::scene::SceneGraph;
use crate::view::{View, ViewId};
use crate::PortalConfig;
use log::{info, warn};

/// Summary of one [`PortalSession::update`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub frame: u64,
    pub mirrors_created: usize,
    pub mirrors_removed: usize,
    /// Descriptors skipped because their subtree is incomplete
    pub malformed: usize,
    /// Bound fields that changed value during propagation
    pub bindings_changed: usize,
    pub visible: usize,
    pub occluded: usize,
    /// Previews whose pose chain could not be resolved this frame
    pub unresolved: usize,
    pub failed: usize,
    /// Pipelines the renderer will run this frame, over all views
    pub enabled_pipelines: usize,
}

/// Portal state of one scene: the registry and every view rendering it
#[derive(Debug)]
pub struct PortalSession {
    config: PortalConfig,
    registry: PortalRegistry,
    views: Vec<View>,
    frame: u64,
}

impl PortalSession {
    pub fn new(config: PortalConfig) -> Self {
        Self {
            config,
            registry: PortalRegistry::new(),
            views: Vec::new(),
            frame: 0,
        }
    }

    pub fn config(&self) -> &PortalConfig {
        &self.config
    }

    pub fn registry(&self) -> &PortalRegistry {
        &self.registry
    }

    pub fn views(&self) -> &[View] {
        &self.views
    }

    pub fn view(&self, id: ViewId) -> Option<&View> {
        self.views.iter().find(|v| v.id() == id)
    }

    /// Frames run so far
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Register a view and build its previews of the portals mirrored so far
    pub fn add_view(&mut self, scene: &mut SceneGraph, mut view: View) -> PortalResult<()> {
        if self.view(view.id()).is_some() {
            return Err(PortalError::DuplicateView(view.id().to_string()));
        }

        for mirror in self.registry.mirrors() {
            if let Err(err) = view.create_preview(scene, mirror, &self.config) {
                warn!(
                    "View {} could not preview portal '{}': {}",
                    view.id(),
                    mirror.name(),
                    err
                );
            }
        }

        info!(
            "Added view {} with {} preview(s)",
            view.id(),
            view.previews().len()
        );
        self.views.push(view);
        self.refresh_view_masks();
        Ok(())
    }

    /// Unregister a view, releasing all of its previews
    pub fn remove_view(&mut self, scene: &mut SceneGraph, id: ViewId) -> PortalResult<View> {
        let index = self
            .views
            .iter()
            .position(|v| v.id() == id)
            .ok_or_else(|| PortalError::UnknownView(id.to_string()))?;

        let mut view = self.views.remove(index);
        self.refresh_view_masks();
        view.release_all(scene)?;
        info!("Removed view {}", id);
        Ok(view)
    }

    fn refresh_view_masks(&mut self) {
        let ids: Vec<ViewId> = self.views.iter().map(View::id).collect();
        for view in &mut self.views {
            view.set_peers(&ids);
        }
    }

    /// Run one frame: descriptor scan, binding propagation, then the preview
    /// pose and visibility pass
    pub fn update(&mut self, scene: &mut SceneGraph) -> FrameReport {
        self.frame += 1;

        let scan = self.registry.scan(scene, &self.config, self.views.as_mut_slice());
        let bindings_changed = scene.propagate_bindings();

        let mut report = FrameReport {
            frame: self.frame,
            mirrors_created: scan.created,
            mirrors_removed: scan.removed,
            malformed: scan.malformed,
            bindings_changed,
            failed: scan.notify_failures,
            ..FrameReport::default()
        };

        for view in &mut self.views {
            let stats = view.update_previews(scene, &self.config);
            report.visible += stats.visible;
            report.occluded += stats.occluded;
            report.unresolved += stats.unresolved;
            report.failed += stats.failed;
            report.enabled_pipelines += view.pre_render().enabled_count();
        }

        report
    }
}

//! Portal registry: mirrors replicated descriptors at most once

use super::{PortalDescriptor, PortalMirror};
use crate::error::PortalResult;
use crate::scene::{NodeId, SceneGraph};
use crate::PortalConfig;
use log::{debug, info, warn};

/// Receives mirror lifecycle events, synchronously and in mirror order
pub trait PortalListener {
    /// A mirror was created; called once per mirror
    fn on_portal_added(
        &mut self,
        scene: &mut SceneGraph,
        mirror: &PortalMirror,
        config: &PortalConfig,
    ) -> PortalResult<()>;

    /// A mirror is about to be removed; its nodes still exist
    fn on_portal_removed(&mut self, scene: &mut SceneGraph, mirror: &PortalMirror) -> PortalResult<()>;
}

/// What one scan changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub created: usize,
    pub removed: usize,
    /// Descriptors that could not be mirrored yet
    pub malformed: usize,
    pub notify_failures: usize,
}

/// Mirrors of every well-formed descriptor under the replicated root
#[derive(Debug, Default)]
pub struct PortalRegistry {
    mirrors: Vec<PortalMirror>,
    /// Replicated root and the child revision last scanned
    observed: Option<(NodeId, u64)>,
    /// Malformed descriptors, retried on every scan
    pending: Vec<NodeId>,
}

impl PortalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mirrors in creation order
    pub fn mirrors(&self) -> &[PortalMirror] {
        &self.mirrors
    }

    pub fn mirror_for(&self, descriptor: NodeId) -> Option<&PortalMirror> {
        self.mirrors.iter().find(|m| m.is_mirror_of(descriptor))
    }

    /// Descriptors waiting for their subtree to become complete
    pub fn pending(&self) -> &[NodeId] {
        &self.pending
    }

    /// Rescan the replicated root if its child list changed since the last
    /// scan, or if some descriptor is still incomplete.
    pub fn scan<L: PortalListener>(
        &mut self,
        scene: &mut SceneGraph,
        config: &PortalConfig,
        listeners: &mut [L],
    ) -> ScanReport {
        let Some(root) = scene.find(&config.replicated_root) else {
            return ScanReport::default();
        };
        let revision = scene.children_revision(root).unwrap_or_default();

        if self.observed == Some((root, revision)) && self.pending.is_empty() {
            return ScanReport::default();
        }
        self.observed = Some((root, revision));

        let descriptors = scene.children(root).to_vec();
        self.on_descriptor_list_changed(scene, config, &descriptors, listeners)
    }

    /// Mirror every descriptor in `descriptors` not mirrored yet, and remove
    /// mirrors whose descriptor left the list.
    ///
    /// Listeners hear about each new mirror before the next descriptor is
    /// processed. A failing descriptor or listener does not stop the others.
    pub fn on_descriptor_list_changed<L: PortalListener>(
        &mut self,
        scene: &mut SceneGraph,
        config: &PortalConfig,
        descriptors: &[NodeId],
        listeners: &mut [L],
    ) -> ScanReport {
        let mut report = ScanReport::default();

        for &node in descriptors {
            if self.mirror_for(node).is_some() {
                continue;
            }

            let mirror = match self.create_mirror(scene, config, node) {
                Ok(mirror) => mirror,
                Err(err) => {
                    if self.pending.contains(&node) {
                        debug!("Descriptor {:?} still incomplete: {}", node, err);
                    } else {
                        warn!("Skipping portal descriptor {:?}: {}", node, err);
                        self.pending.push(node);
                    }
                    report.malformed += 1;
                    continue;
                }
            };

            self.pending.retain(|n| *n != node);
            info!("Mirrored portal '{}'", mirror.name());
            report.created += 1;

            for listener in listeners.iter_mut() {
                if let Err(err) = listener.on_portal_added(scene, &mirror, config) {
                    warn!("Listener failed on portal '{}': {}", mirror.name(), err);
                    report.notify_failures += 1;
                }
            }
            self.mirrors.push(mirror);
        }

        self.pending.retain(|n| descriptors.contains(n));

        let (kept, gone): (Vec<_>, Vec<_>) = std::mem::take(&mut self.mirrors)
            .into_iter()
            .partition(|m| descriptors.contains(&m.descriptor()));
        self.mirrors = kept;

        for mirror in gone {
            for listener in listeners.iter_mut() {
                if let Err(err) = listener.on_portal_removed(scene, &mirror) {
                    warn!("Listener failed on removal of '{}': {}", mirror.name(), err);
                    report.notify_failures += 1;
                }
            }

            let name = mirror.name().to_string();
            match mirror.remove(scene) {
                Ok(()) => info!("Removed portal mirror '{}'", name),
                Err(err) => warn!("Failed to remove portal mirror '{}': {}", name, err),
            }
            report.removed += 1;
        }

        report
    }

    fn create_mirror(
        &self,
        scene: &mut SceneGraph,
        config: &PortalConfig,
        node: NodeId,
    ) -> PortalResult<PortalMirror> {
        let descriptor = PortalDescriptor::parse(scene, node)?;
        let parent = scene.ensure_path(&config.local_portal_root)?;
        PortalMirror::build(scene, parent, &descriptor, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PortalError;
    use glam::Mat4;

    /// Records notifications; optionally fails every call
    #[derive(Default)]
    struct Recorder {
        added: Vec<String>,
        removed: Vec<String>,
        fail: bool,
    }

    impl PortalListener for Recorder {
        fn on_portal_added(
            &mut self,
            _scene: &mut SceneGraph,
            mirror: &PortalMirror,
            _config: &PortalConfig,
        ) -> PortalResult<()> {
            self.added.push(mirror.name().to_string());
            if self.fail {
                return Err(PortalError::UnknownView("recorder".to_string()));
            }
            Ok(())
        }

        fn on_portal_removed(&mut self, scene: &mut SceneGraph, mirror: &PortalMirror) -> PortalResult<()> {
            assert!(scene.contains(mirror.frame()));
            self.removed.push(mirror.name().to_string());
            Ok(())
        }
    }

    fn add_descriptor(scene: &mut SceneGraph, config: &PortalConfig, name: &str) -> NodeId {
        let root = scene.ensure_path(&config.replicated_root).unwrap();
        let node = scene.add_node(root, name, Mat4::IDENTITY).unwrap();
        scene.add_node(node, "frame", Mat4::IDENTITY).unwrap();
        let content = scene.add_node(node, "content", Mat4::IDENTITY).unwrap();
        scene.add_screen(content, "screen", 1.0, 1.0).unwrap();
        node
    }

    #[test]
    fn missing_root_is_a_no_op() {
        let mut scene = SceneGraph::new("main");
        let mut registry = PortalRegistry::new();
        let mut listeners = [Recorder::default()];
        let report = registry.scan(&mut scene, &PortalConfig::default(), &mut listeners);
        assert_eq!(report, ScanReport::default());
        assert!(scene.find("/local_portal_group").is_none());
    }

    #[test]
    fn descriptors_are_mirrored_at_most_once() {
        let config = PortalConfig::default();
        let mut scene = SceneGraph::new("main");
        let d1 = add_descriptor(&mut scene, &config, "D1");
        let mut registry = PortalRegistry::new();
        let mut listeners = [Recorder::default(), Recorder::default()];

        let report = registry.scan(&mut scene, &config, &mut listeners);
        assert_eq!(report.created, 1);

        // Unchanged list, then the same list delivered explicitly
        assert_eq!(registry.scan(&mut scene, &config, &mut listeners), ScanReport::default());
        let report = registry.on_descriptor_list_changed(&mut scene, &config, &[d1, d1], &mut listeners);
        assert_eq!(report.created, 0);

        assert_eq!(registry.mirrors().len(), 1);
        for listener in &listeners {
            assert_eq!(listener.added, vec!["D1".to_string()]);
        }

        let local = scene.find("/local_portal_group").unwrap();
        assert_eq!(scene.children(local).len(), 1);
    }

    #[test]
    fn new_descriptors_append_in_order() {
        let config = PortalConfig::default();
        let mut scene = SceneGraph::new("main");
        add_descriptor(&mut scene, &config, "A");
        let mut registry = PortalRegistry::new();
        let mut listeners = [Recorder::default()];
        registry.scan(&mut scene, &config, &mut listeners);

        add_descriptor(&mut scene, &config, "B");
        add_descriptor(&mut scene, &config, "C");
        let report = registry.scan(&mut scene, &config, &mut listeners);
        assert_eq!(report.created, 2);

        let names: Vec<_> = registry.mirrors().iter().map(|m| m.name()).collect();
        assert_eq!(names, ["A", "B", "C"]);
        assert_eq!(listeners[0].added, ["A", "B", "C"]);
    }

    #[test]
    fn malformed_descriptor_does_not_block_others() {
        let config = PortalConfig::default();
        let mut scene = SceneGraph::new("main");
        let root = scene.ensure_path(&config.replicated_root).unwrap();
        let broken = scene.add_node(root, "broken", Mat4::IDENTITY).unwrap();
        add_descriptor(&mut scene, &config, "ok");

        let mut registry = PortalRegistry::new();
        let mut listeners = [Recorder::default()];
        let report = registry.scan(&mut scene, &config, &mut listeners);
        assert_eq!(report.created, 1);
        assert_eq!(report.malformed, 1);
        assert_eq!(registry.pending(), [broken]);

        // Children arrive later without touching the root's child list
        scene.add_node(broken, "frame", Mat4::IDENTITY).unwrap();
        let content = scene.add_node(broken, "content", Mat4::IDENTITY).unwrap();
        scene.add_screen(content, "screen", 2.0, 1.0).unwrap();

        let report = registry.scan(&mut scene, &config, &mut listeners);
        assert_eq!(report.created, 1);
        assert!(registry.pending().is_empty());
        assert_eq!(listeners[0].added, ["ok", "broken"]);
    }

    #[test]
    fn listener_failure_still_records_mirror() {
        let config = PortalConfig::default();
        let mut scene = SceneGraph::new("main");
        add_descriptor(&mut scene, &config, "D1");

        let mut registry = PortalRegistry::new();
        let mut listeners = [
            Recorder {
                fail: true,
                ..Recorder::default()
            },
            Recorder::default(),
        ];
        let report = registry.scan(&mut scene, &config, &mut listeners);
        assert_eq!(report.created, 1);
        assert_eq!(report.notify_failures, 1);
        assert_eq!(listeners[1].added, ["D1"]);
        assert_eq!(registry.mirrors().len(), 1);
    }

    #[test]
    fn removed_descriptor_tears_down_mirror() {
        let config = PortalConfig::default();
        let mut scene = SceneGraph::new("main");
        let d1 = add_descriptor(&mut scene, &config, "D1");
        add_descriptor(&mut scene, &config, "D2");

        let mut registry = PortalRegistry::new();
        let mut listeners = [Recorder::default()];
        registry.scan(&mut scene, &config, &mut listeners);
        let frame = registry.mirror_for(d1).unwrap().frame();

        scene.remove_subtree(d1).unwrap();
        let report = registry.scan(&mut scene, &config, &mut listeners);
        assert_eq!(report.removed, 1);
        assert_eq!(listeners[0].removed, ["D1"]);
        assert!(!scene.contains(frame));
        assert!(registry.mirror_for(d1).is_none());
        assert_eq!(registry.mirrors().len(), 1);
    }
}

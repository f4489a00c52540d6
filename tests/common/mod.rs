//! Scene fixtures shared by the integration tests.

#![allow(dead_code)]

use glam::{Mat4, Vec3};
use portal_mirror::{NodeId, PortalConfig, SceneGraph, ViewId};

/// Install a test logger once; later calls are no-ops.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug"))
        .is_test(true)
        .try_init();
}

/// World position of the portal frame used by [`add_descriptor`].
pub const PORTAL_POSITION: Vec3 = Vec3::new(0.0, 1.5, -2.0);

/// Content offset of every descriptor built here.
pub const CONTENT_OFFSET: Vec3 = Vec3::new(50.0, 0.0, 0.0);

/// Scene with an empty replicated portal group.
pub fn empty_scene(config: &PortalConfig) -> SceneGraph {
    let mut scene = SceneGraph::new("main");
    scene.ensure_path(&config.replicated_root).unwrap();
    scene
}

/// Replicate a well-formed portal descriptor facing +Z at [`PORTAL_POSITION`].
pub fn add_descriptor(scene: &mut SceneGraph, config: &PortalConfig, name: &str) -> NodeId {
    let group = scene.ensure_path(&config.replicated_root).unwrap();
    let node = scene.add_node(group, name, Mat4::IDENTITY).unwrap();
    scene
        .add_node(node, "frame", Mat4::from_translation(PORTAL_POSITION))
        .unwrap();
    let content = scene
        .add_node(node, "content", Mat4::from_translation(CONTENT_OFFSET))
        .unwrap();
    scene.add_screen(content, "screen", 1.6, 0.9).unwrap();
    node
}

/// Frame node of a descriptor
pub fn descriptor_frame(scene: &SceneGraph, descriptor: NodeId) -> NodeId {
    scene.children(descriptor)[0]
}

/// Mount the slot of `view` on `platform_<platform>` at `position`.
pub fn add_slot(
    scene: &mut SceneGraph,
    config: &PortalConfig,
    platform: u32,
    view: ViewId,
    position: Vec3,
) -> NodeId {
    let platform = scene
        .ensure_path(&format!("{}/platform_{}", config.platform_root, platform))
        .unwrap();
    let scale = match scene.child_by_name(platform, "scale") {
        Some(scale) => scale,
        None => scene.add_node(platform, "scale", Mat4::IDENTITY).unwrap(),
    };
    scene
        .add_node(scale, &view.group_name(), Mat4::from_translation(position))
        .unwrap()
}

/// Viewer position `degrees` off the portal axis, `distance` meters away.
pub fn viewer_at_angle(degrees: f32, distance: f32) -> Vec3 {
    let radians = degrees.to_radians();
    PORTAL_POSITION + Vec3::new(radians.sin(), 0.0, radians.cos()) * distance
}

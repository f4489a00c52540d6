//! Walk a viewer through a portal and log how its preview reacts
//!
//! Builds a scene with one replicated portal and one platform, then moves the
//! viewer's slot along the portal axis from in front of it to behind it.
//!
//! ```text
//! RUST_LOG=debug cargo run --example portal_walk -- --steps 12 --stereo
//! ```

use clap::Parser;
use glam::{Mat4, Vec3};
use portal_mirror::{
    PortalConfig, PortalResult, PortalSession, PreviewState, SceneGraph, View, ViewId, ViewInfo,
    VisibilityPolicy,
};

/// Portal preview walk-through.
#[derive(Parser, Debug)]
#[command(name = "portal_walk", about = "Walk a viewer through a portal", version)]
struct Args {
    /// Number of frames to walk over.
    #[arg(long, default_value = "10")]
    steps: u32,

    /// Render the preview in stereo.
    #[arg(long)]
    stereo: bool,

    /// Hysteresis margin in degrees (stateless switching when omitted).
    #[arg(long)]
    hysteresis: Option<f32>,

    /// Inter-eye distance in meters.
    #[arg(long, default_value = "0.06")]
    eye_distance: f32,

    /// Skip debug geometry (screen outlines, eye markers).
    #[arg(long)]
    no_debug_geometry: bool,
}

fn build_scene(config: &PortalConfig) -> PortalResult<(SceneGraph, portal_mirror::NodeId)> {
    let mut scene = SceneGraph::new("main");

    // Replicated descriptor: a 1.6 x 0.9 portal two meters ahead
    let group = scene.ensure_path(&config.replicated_root)?;
    let portal = scene.add_node(group, "garden", Mat4::IDENTITY)?;
    scene.add_node(
        portal,
        "frame",
        Mat4::from_translation(Vec3::new(0.0, 1.5, -2.0)),
    )?;
    let content = scene.add_node(
        portal,
        "content",
        Mat4::from_translation(Vec3::new(50.0, 0.0, 0.0)),
    )?;
    scene.add_screen(content, "screen", 1.6, 0.9)?;

    // Platform 0 with a single viewer at eye height
    let platform = scene.ensure_path(&format!("{}/platform_0", config.platform_root))?;
    let scale = scene.add_node(platform, "scale", Mat4::IDENTITY)?;
    let slot = scene.add_node(
        scale,
        &ViewId::new(0, 0).group_name(),
        Mat4::from_translation(Vec3::new(0.0, 1.5, 3.0)),
    )?;

    Ok((scene, slot))
}

fn run(args: &Args) -> PortalResult<()> {
    let mut config = PortalConfig::default()
        .with_eye_distance(args.eye_distance)
        .with_debug_geometry(!args.no_debug_geometry);
    if let Some(margin) = args.hysteresis {
        config = config.with_visibility(VisibilityPolicy::Hysteresis {
            margin_degrees: margin,
        });
    }

    let (mut scene, slot) = build_scene(&config)?;
    let mut session = PortalSession::new(config);
    let id = ViewId::new(0, 0);
    session.add_view(
        &mut scene,
        View::new(ViewInfo::new(id, 0, "main").with_stereo(args.stereo)),
    )?;

    let steps = args.steps.max(1);
    let mut last_state = None;

    for step in 0..=steps {
        // From three meters in front of the portal to three meters behind it
        let z = 3.0 - 8.0 * step as f32 / steps as f32;
        scene.set_transform(slot, Mat4::from_translation(Vec3::new(0.0, 1.5, z)))?;

        let report = session.update(&mut scene);
        let state = session
            .view(id)
            .and_then(|view| view.previews().first())
            .map(|preview| preview.state());

        log::info!(
            "frame {:>3}  z = {:>5.2}  visible {}  occluded {}  pipelines {}",
            report.frame,
            z,
            report.visible,
            report.occluded,
            report.enabled_pipelines
        );
        if state != last_state {
            if let Some(state) = state {
                let texture = match state {
                    PreviewState::Visible => "off-screen output",
                    PreviewState::Occluded => "placeholder",
                };
                log::info!("  preview is now {:?}, quad shows the {}", state, texture);
            }
            last_state = state;
        }
    }

    let view = session.remove_view(&mut scene, id)?;
    log::info!(
        "Released view {}; {} pipeline(s) left registered",
        view.id(),
        view.pre_render().len()
    );
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    log::info!("Starting portal walk: {:?}", args);

    if let Err(err) = run(&args) {
        log::error!("Portal walk failed: {}", err);
        std::process::exit(1);
    }
}

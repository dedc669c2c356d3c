mod app;
mod controls;
mod scenes;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use winit::dpi::LogicalSize;

use voxel_engine::config::ViewerProperties;
use voxel_engine::device::GpuInit;
use voxel_engine::logging::{init_logging, LoggingConfig};
use voxel_engine::window::{Runtime, RuntimeConfig};

use crate::app::ViewerApp;
use crate::scenes::SceneKind;

/// Interactive order-independent-transparency viewer.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Viewer properties (TOML). Defaults are used for missing keys.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Demo scene loaded at startup.
    #[arg(long, default_value = "volume")]
    scene: SceneKind,

    /// Log filter in env_logger syntax, e.g. `voxel_engine=debug`.
    #[arg(long)]
    log: Option<String>,

    /// Present without waiting for vertical blank.
    #[arg(long)]
    no_vsync: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(LoggingConfig {
        env_filter: cli.log.clone(),
        ..LoggingConfig::default()
    });

    let props = match &cli.config {
        Some(path) => ViewerProperties::load(path)
            .with_context(|| format!("invalid viewer properties in {}", path.display()))?,
        None => ViewerProperties::default(),
    };
    log::info!(
        "viewport {}x{}, {} transparent layers, {:?} blending",
        props.viewport_width,
        props.viewport_height,
        props.depth_budget(),
        props.blend_method
    );

    let runtime = RuntimeConfig {
        title: app::TITLE.to_string(),
        initial_size: LogicalSize::new(f64::from(props.viewport_width), f64::from(props.viewport_height)),
        ..RuntimeConfig::default()
    };
    let gpu = GpuInit {
        present_mode: if cli.no_vsync {
            wgpu::PresentMode::AutoNoVsync
        } else {
            wgpu::PresentMode::AutoVsync
        },
        ..GpuInit::default()
    };

    Runtime::run(runtime, gpu, ViewerApp::new(props, cli.scene))
}

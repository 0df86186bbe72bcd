#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Chunk Pipeline
//!
//! Asynchronous voxel chunk streaming: terrain synthesis, greedy meshing at two
//! levels of detail, ring-buffered staging and frame-rate aware admission
//! control, scheduled across a worker pool while the main thread never blocks.
//!
//! ## Key Modules
//!
//! * `config` - Runtime configuration loaded from JSON
//! * `core` - Concurrency primitives (shared resources, cancellation, fences)
//! * `engine_state` - The scheduler, the voxel and rendering stages and the worker pool
//!
//! ## Usage
//!
//! ```rust,no_run
//! fn main() -> anyhow::Result<()> {
//!     chunk_pipeline::run()
//! }
//! ```
//!
//! Embedding applications drive [`engine_state::EngineState::update`] once per
//! frame and render the [`engine_state::rendering::draw_list::DrawList`] it
//! produces.

use std::{path::PathBuf, thread, time::Duration};

use cgmath::{perspective, Deg, Matrix4, Point3, Vector3};
use clap::Parser;
use log::info;
use web_time::Instant;

use config::PipelineConfig;
use engine_state::{
    rendering::{
        device::UploadDevice,
        draw_list::{Frustum, OPENGL_TO_WGPU_MATRIX},
        HostDevice, WgpuDevice,
    },
    EngineState,
};

pub mod config;
pub mod core;
pub mod engine_state;

/// Command line of the demo binary.
#[derive(Debug, Parser)]
#[command(version, about = "Streams voxel chunks around a viewer flying in a straight line")]
pub struct Args {
    /// JSON pipeline configuration; defaults apply when omitted
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Number of frames to simulate
    #[arg(long, default_value_t = 600)]
    pub frames: u64,
    /// Use the host-memory device instead of a GPU
    #[arg(long)]
    pub headless_host: bool,
    /// Viewer speed in voxels per frame along +x
    #[arg(long, default_value_t = 2.0)]
    pub speed: f32,
    /// Target frame duration in milliseconds
    #[arg(long, default_value_t = 16)]
    pub frame_budget_ms: u64,
    /// Log statistics every this many frames
    #[arg(long, default_value_t = 60)]
    pub stats_interval: u64,
}

/// Runs the demo: streams chunks for `--frames` frames and prints the final statistics.
pub fn run() -> anyhow::Result<()> {
    let mut log_builder = env_logger::Builder::new();
    log_builder
        .target(env_logger::Target::Stdout)
        .parse_env("RUST_LOG")
        .init();
    info!("Logger initialized");

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    let device = create_device(&config, args.headless_host);
    let mut engine = EngineState::new(config, device);

    let projection = OPENGL_TO_WGPU_MATRIX * perspective(Deg(70.0), 16.0 / 9.0, 0.1, 2000.0);
    let budget = Duration::from_millis(args.frame_budget_ms);
    let stats_interval = args.stats_interval.max(1);
    let mut viewer = Point3::new(0.0, 96.0, 0.0);
    let mut stats = engine.stats();
    let mut last_frame = Instant::now();

    for frame in 1..=args.frames {
        let frame_start = Instant::now();
        let frame_ms = frame_start.duration_since(last_frame).as_secs_f64() * 1000.0;
        last_frame = frame_start;

        stats = engine.update(viewer, frame_ms);
        let view = Matrix4::look_to_rh(viewer, Vector3::unit_x(), Vector3::unit_y());
        let draw_list = engine.draw_list(&Frustum::from_view_projection(projection * view));

        if frame % stats_interval == 0 {
            info!(
                "frame {frame}: {} active, {} garbage, jobs {}/{} (cap {}), {} draw items, {:.1} ms avg",
                stats.active_chunks,
                stats.garbage_chunks,
                stats.in_progress_jobs,
                stats.pending_jobs,
                stats.job_cap,
                draw_list.len(),
                stats.smoothed_frame_ms.unwrap_or_default()
            );
        }
        drop(draw_list);

        viewer.x += args.speed;
        if let Some(rest) = budget.checked_sub(frame_start.elapsed()) {
            thread::sleep(rest);
        }
    }

    engine.shutdown();
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

/// GPU device when one is available, host memory otherwise.
fn create_device(config: &PipelineConfig, headless_host: bool) -> Box<dyn UploadDevice> {
    if headless_host {
        info!("Using host-memory device");
        return Box::new(HostDevice::new());
    }
    match pollster::block_on(WgpuDevice::request_headless(config.staging_capacity)) {
        Ok(device) => Box::new(device),
        Err(err) => {
            log::warn!("GPU unavailable ({err:#}), falling back to host-memory device");
            Box::new(HostDevice::new())
        }
    }
}

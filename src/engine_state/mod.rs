//! # Engine State Module
//!
//! Ties the chunk scheduler to an upload device.
//!
//! ## Key Components
//!
//! * `EngineState` - Owns the scheduler and the device and advances both once per frame
//! * `buffer_state` - Registry of `wgpu` buffers used by the GPU backend
//! * `rendering` - Meshing, staging, uploads and draw lists
//! * `scheduler` - Per-frame passes, admission control and garbage collection
//! * `task_management` - The worker pool
//! * `voxels` - Voxel grids, terrain and chunk lifecycle
//!
//! ## Threading
//!
//! `EngineState` lives on the main thread. Workers only ever see chunk leases,
//! the active chunk map and the staging arena; the device never leaves the
//! main thread.

use cgmath::Point3;

use crate::config::PipelineConfig;

use rendering::{
    device::UploadDevice,
    draw_list::{DrawList, ViewFrustum},
};
use scheduler::{ChunkScheduler, PipelineStats};

pub mod buffer_state;
pub mod rendering;
pub mod scheduler;
pub mod task_management;
pub mod voxels;

/// The main state container: the chunk scheduler and the device it uploads to.
///
/// # Examples
///
/// ```
/// use chunk_pipeline::{
///     config::PipelineConfig,
///     engine_state::{rendering::HostDevice, EngineState},
/// };
///
/// let config = PipelineConfig {
///     render_radius: 1,
///     lod0_distance: 0,
///     ..PipelineConfig::default()
/// };
/// let mut engine = EngineState::new(config, Box::new(HostDevice::new()));
/// let stats = engine.update(cgmath::Point3::new(0.0, 64.0, 0.0), 16.0);
/// assert_eq!(stats.active_chunks, 9);
/// engine.shutdown();
/// ```
pub struct EngineState {
    scheduler: ChunkScheduler,
    device: Box<dyn UploadDevice>,
    stopped: bool,
}

impl EngineState {
    /// Creates the scheduler and its worker pool.
    ///
    /// # Arguments
    ///
    /// * `config` - Validated pipeline configuration
    /// * `device` - Backend receiving mesh uploads
    pub fn new(config: PipelineConfig, device: Box<dyn UploadDevice>) -> Self {
        Self {
            scheduler: ChunkScheduler::new(config),
            device,
            stopped: false,
        }
    }

    /// Advances the pipeline by one frame.
    ///
    /// # Arguments
    ///
    /// * `viewer` - World-space position chunks are streamed around
    /// * `frame_ms` - Duration of the previous frame in milliseconds
    pub fn update(&mut self, viewer: Point3<f32>, frame_ms: f64) -> PipelineStats {
        self.scheduler.tick(viewer, frame_ms, self.device.as_mut())
    }

    /// Chunks to draw this frame.
    pub fn draw_list(&self, frustum: &dyn ViewFrustum) -> DrawList {
        self.scheduler.draw_list(frustum)
    }

    /// The scheduler, for inspection.
    pub fn scheduler(&self) -> &ChunkScheduler {
        &self.scheduler
    }

    /// Latest statistics without advancing a frame.
    pub fn stats(&self) -> PipelineStats {
        self.scheduler.stats(self.device.as_ref())
    }

    /// Stops the workers and releases all device buffers. Idempotent.
    pub fn shutdown(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        self.scheduler.shutdown(self.device.as_mut());
    }
}

impl Drop for EngineState {
    fn drop(&mut self) {
        self.shutdown();
    }
}

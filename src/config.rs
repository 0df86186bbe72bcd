//! # Pipeline Configuration
//!
//! Runtime knobs for streaming, admission control, uploads and terrain. Every field
//! has a default, so a configuration file only needs the values it overrides:
//!
//! ```json
//! { "render_radius": 12, "burst_job_cap": 12, "upload_quota": 6 }
//! ```

use std::path::Path;

use anyhow::{ensure, Context};
use serde::Deserialize;

/// Configuration consumed by the scheduler, the staging arena and the terrain generator.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Chebyshev radius (in chunks, horizontal plane) of the active set.
    pub render_radius: i32,
    /// Chunks at or within this horizontal distance require LOD 0; farther ones LOD 1.
    pub lod0_distance: i32,
    /// In-progress job cap when frames are slow.
    pub base_job_cap: usize,
    /// Extra in-progress jobs allowed while the smoothed frame time is moderate.
    pub medium_job_bonus: usize,
    /// In-progress job cap while the smoothed frame time is low.
    pub burst_job_cap: usize,
    /// Smoothed frame times below this (milliseconds) permit the burst cap.
    pub burst_frame_ms: f64,
    /// Smoothed frame times below this (milliseconds) permit the medium cap.
    pub medium_frame_ms: f64,
    /// Weight of the newest sample in the frame-time moving average, in `(0, 1]`.
    pub frame_time_smoothing: f64,
    /// Maximum number of staged chunks uploaded per frame.
    pub upload_quota: usize,
    /// Size of the staging ring in bytes.
    pub staging_capacity: u64,
    /// Staging allocation alignment in bytes. Must be a power of two.
    pub staging_alignment: u64,
    /// Hardware threads kept free for the main thread and the driver.
    pub worker_reserve: usize,
    /// Seed for every terrain noise field.
    pub terrain_seed: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            render_radius: 8,
            lod0_distance: 3,
            base_job_cap: 2,
            medium_job_bonus: 2,
            burst_job_cap: 8,
            burst_frame_ms: 8.0,
            medium_frame_ms: 14.0,
            frame_time_smoothing: 0.1,
            upload_quota: 4,
            staging_capacity: 32 * 1024 * 1024,
            staging_alignment: 256,
            worker_reserve: 1,
            terrain_seed: 1337,
        }
    }
}

impl PipelineConfig {
    /// Reads a JSON configuration file and validates it.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading pipeline config {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("parsing pipeline config {}", path.display()))
    }

    /// Parses and validates a JSON configuration string.
    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        let config: PipelineConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the invariants the scheduler and the arena rely on.
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.render_radius >= 1, "render_radius must be at least 1");
        ensure!(
            (0..=self.render_radius).contains(&self.lod0_distance),
            "lod0_distance must lie within 0..=render_radius"
        );
        ensure!(self.base_job_cap >= 1, "base_job_cap must be at least 1");
        ensure!(
            self.burst_job_cap >= self.base_job_cap,
            "burst_job_cap must not be below base_job_cap"
        );
        ensure!(
            self.frame_time_smoothing > 0.0 && self.frame_time_smoothing <= 1.0,
            "frame_time_smoothing must lie in (0, 1]"
        );
        ensure!(
            self.burst_frame_ms <= self.medium_frame_ms,
            "burst_frame_ms must not exceed medium_frame_ms"
        );
        ensure!(self.upload_quota >= 1, "upload_quota must be at least 1");
        ensure!(
            self.staging_alignment.is_power_of_two(),
            "staging_alignment must be a power of two"
        );
        ensure!(
            self.staging_capacity >= self.staging_alignment,
            "staging_capacity must hold at least one aligned block"
        );
        Ok(())
    }
}

//! Frame-time driven admission control.
//!
//! The job cap follows an exponential moving average of frame time: short
//! frames leave headroom for a burst of background jobs, long frames fall back to
//! the baseline so meshing never starves the render thread.

use crate::config::PipelineConfig;

/// Exponential moving average of frame time in milliseconds.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FrameTimeAverage {
    smoothing: f64,
    average_ms: Option<f64>,
}

impl FrameTimeAverage {
    /// `smoothing` is the weight of the newest sample, in `(0, 1]`.
    pub fn new(smoothing: f64) -> Self {
        Self {
            smoothing,
            average_ms: None,
        }
    }

    /// Folds in one frame. The first sample seeds the average.
    pub fn record(&mut self, frame_ms: f64) {
        self.average_ms = Some(match self.average_ms {
            Some(average) => average + self.smoothing * (frame_ms - average),
            None => frame_ms,
        });
    }

    /// Current average, `None` before the first sample.
    pub fn average_ms(&self) -> Option<f64> {
        self.average_ms
    }
}

/// Maps the smoothed frame time to an in-progress job cap.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AdmissionControl {
    base_cap: usize,
    medium_bonus: usize,
    burst_cap: usize,
    burst_frame_ms: f64,
    medium_frame_ms: f64,
}

impl AdmissionControl {
    /// Reads the caps and thresholds from `config`.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            base_cap: config.base_job_cap,
            medium_bonus: config.medium_job_bonus,
            burst_cap: config.burst_job_cap,
            burst_frame_ms: config.burst_frame_ms,
            medium_frame_ms: config.medium_frame_ms,
        }
    }

    /// Cap for a smoothed frame time. Without a measurement the baseline applies.
    pub fn cap(&self, average_ms: Option<f64>) -> usize {
        match average_ms {
            Some(ms) if ms < self.burst_frame_ms => self.burst_cap,
            Some(ms) if ms < self.medium_frame_ms => self.base_cap + self.medium_bonus,
            _ => self.base_cap,
        }
    }
}

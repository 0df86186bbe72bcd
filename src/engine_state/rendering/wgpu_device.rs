//! `wgpu` implementation of [`UploadDevice`].
//!
//! The arena's host memory is mirrored by one persistent GPU staging buffer of the
//! same size (`COPY_DST | COPY_SRC`). An upload writes the region's bytes into
//! that buffer through the queue, then records `copy_buffer_to_buffer` commands
//! into fresh device-local vertex and index buffers and submits them. The
//! completion fence is signalled from `Queue::on_submitted_work_done`, which
//! `wgpu` invokes during [`UploadDevice::poll`].

use anyhow::Context;
use wgpu::{BufferUsages, Device, Queue};

use crate::{core::Fence, engine_state::buffer_state::BufferState};

use super::{
    device::{BufferId, BufferKind, StagingCopy, UploadDevice},
    staging::StagingArena,
};

/// GPU upload backend.
pub struct WgpuDevice {
    buffers: BufferState,
    staging: BufferId,
    last_submission: Fence,
    adapter_name: String,
}

impl WgpuDevice {
    /// Wraps an existing device and creates the staging mirror.
    pub fn new(device: Device, queue: Queue, staging_capacity: u64, adapter_name: String) -> Self {
        let mut buffers = BufferState::new(device, queue);
        let staging = buffers.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Chunk Staging Buffer"),
            size: staging_capacity,
            usage: BufferUsages::COPY_DST | BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        Self {
            buffers,
            staging,
            last_submission: Fence::signaled(),
            adapter_name,
        }
    }

    /// Creates a windowless device on the first suitable adapter.
    pub async fn request_headless(staging_capacity: u64) -> anyhow::Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            flags: wgpu::InstanceFlags::empty(),
            backend_options: wgpu::BackendOptions::from_env_or_default(),
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .context("no graphics adapter available")?;

        let mut required_limits = wgpu::Limits::downlevel_defaults();
        required_limits.max_buffer_size = required_limits.max_buffer_size.max(staging_capacity);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Chunk Pipeline Device"),
                required_features: wgpu::Features::empty(),
                required_limits,
                memory_hints: wgpu::MemoryHints::MemoryUsage,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("creating graphics device")?;

        let name = adapter.get_info().name;
        log::info!("Using adapter {name}");
        Ok(Self::new(device, queue, staging_capacity, name))
    }

    /// Name of the adapter the device was created on.
    pub fn adapter_name(&self) -> &str {
        &self.adapter_name
    }

    /// The buffer registry.
    pub fn buffers(&self) -> &BufferState {
        &self.buffers
    }
}

impl UploadDevice for WgpuDevice {
    fn create_buffer(&mut self, kind: BufferKind, size: u64) -> BufferId {
        let (label, usage) = match kind {
            BufferKind::Vertex => ("Chunk Vertex Buffer", BufferUsages::VERTEX),
            BufferKind::Index => ("Chunk Index Buffer", BufferUsages::INDEX),
        };
        self.buffers.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: size.next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT).max(wgpu::COPY_BUFFER_ALIGNMENT),
            usage: usage | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    fn submit_copies(&mut self, arena: &StagingArena, copies: &[StagingCopy], completion: Fence) {
        for copy in copies {
            let start = copy.source_offset as usize;
            arena.with_range(start..start + copy.size as usize, |bytes| {
                self.buffers
                    .write_buffer(self.staging, copy.source_offset, bytes)
            });
        }

        let mut encoder = self
            .buffers
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Chunk Upload Encoder"),
            });
        if let Some(staging) = self.buffers.get_buffer(self.staging) {
            for copy in copies {
                match self.buffers.get_buffer(copy.destination) {
                    Some(destination) => encoder.copy_buffer_to_buffer(
                        staging,
                        copy.source_offset,
                        destination,
                        0,
                        copy.size,
                    ),
                    None => log::warn!("copy into unknown buffer {:?} skipped", copy.destination),
                }
            }
        }
        self.buffers.queue.submit(Some(encoder.finish()));

        for copy in copies {
            self.buffers.note_copy(copy.destination, copy.size);
        }

        self.last_submission = completion.clone();
        self.buffers
            .queue
            .on_submitted_work_done(move || completion.signal());
    }

    fn poll(&mut self) {
        if let Err(err) = self.buffers.device.poll(wgpu::PollType::Poll) {
            log::warn!("device poll failed: {err}");
        }
    }

    fn destroy_buffer(&mut self, buffer: BufferId) {
        self.buffers.destroy(buffer);
    }

    fn last_submission(&self) -> Fence {
        self.last_submission.clone()
    }

    fn allocated_bytes(&self) -> u64 {
        self.buffers.get_total_allocated_memory()
    }

    fn used_bytes(&self) -> u64 {
        self.buffers.get_total_used_memory()
    }
}

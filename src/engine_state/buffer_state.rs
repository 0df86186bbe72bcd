//! # Buffer State Module
//!
//! This module provides a central registry for the GPU buffers created by the
//! chunk pipeline. It handles buffer creation, writes, destruction and memory
//! analytics.
//!
//! ## Key Features
//!
//! * Buffers are referenced by [`BufferId`] handles instead of borrowed `wgpu::Buffer`s
//! * Per-buffer analytics (allocated bytes, used bytes, write count)
//! * Bounds-checked writes
//!
//! ## Architecture
//!
//! `BufferState` owns the device and queue handles. The wgpu upload backend keeps
//! one persistent staging buffer plus one vertex and one index buffer per chunk
//! LOD in here; buffers leave the registry only through [`BufferState::destroy`],
//! which the deferred destruction pass calls once their fence signalled.

use std::collections::HashMap;

use wgpu::{Buffer, Device, Queue};

use super::rendering::device::BufferId;

/// Analytics data for a GPU buffer
///
/// Tracks memory allocation, usage, and write operations for a buffer
/// to help identify optimization opportunities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferAnalytics {
    /// Total memory allocated for the buffer in bytes
    pub allocated_memory: u64,
    /// Actual memory used in the buffer in bytes (based on writes and copies)
    pub used_memory: u64,
    /// Number of times the buffer has been written to
    pub times_written: u64,
}

/// Registry of GPU buffers keyed by [`BufferId`].
pub struct BufferState {
    /// GPU device
    pub device: Device,
    /// GPU command queue
    pub queue: Queue,
    buffers: HashMap<BufferId, Buffer>,
    analytics: HashMap<BufferId, BufferAnalytics>,
    next_id: u64,
}

impl BufferState {
    /// Creates an empty registry.
    ///
    /// # Arguments
    ///
    /// * `device` - GPU device
    /// * `queue` - GPU command queue
    pub fn new(device: Device, queue: Queue) -> Self {
        Self {
            device,
            queue,
            buffers: HashMap::new(),
            analytics: HashMap::new(),
            next_id: 1,
        }
    }

    /// Creates an empty buffer with the specified descriptor
    ///
    /// # Returns
    ///
    /// Handle of the new buffer
    pub fn create_buffer(&mut self, descriptor: &wgpu::BufferDescriptor) -> BufferId {
        let id = BufferId(self.next_id);
        self.next_id += 1;

        let buffer = self.device.create_buffer(descriptor);
        self.buffers.insert(id, buffer);
        self.analytics.insert(
            id,
            BufferAnalytics {
                allocated_memory: descriptor.size,
                used_memory: 0,
                times_written: 0,
            },
        );
        id
    }

    /// Writes raw bytes to a buffer through the queue
    ///
    /// # Arguments
    ///
    /// * `id` - Target buffer
    /// * `offset` - Byte offset in the buffer to start writing
    /// * `data` - Raw byte data to write
    ///
    /// # Panics
    ///
    /// Panics if the write would exceed the buffer bounds
    pub fn write_buffer(&mut self, id: BufferId, offset: wgpu::BufferAddress, data: &[u8]) {
        let (Some(buffer), Some(analytics)) = (self.buffers.get(&id), self.analytics.get_mut(&id))
        else {
            log::warn!("write to unknown buffer {id:?} skipped");
            return;
        };

        let data_size = data.len() as u64;
        if offset + data_size > analytics.allocated_memory {
            panic!("Buffer write out of bounds for buffer {id:?}");
        }

        self.queue.write_buffer(buffer, offset, data);
        analytics.used_memory = analytics.used_memory.max(offset + data_size);
        analytics.times_written += 1;
    }

    /// Records that `size` bytes were copied into the start of `id`.
    pub fn note_copy(&mut self, id: BufferId, size: u64) {
        if let Some(analytics) = self.analytics.get_mut(&id) {
            analytics.used_memory = analytics.used_memory.max(size);
            analytics.times_written += 1;
        }
    }

    /// Gets a buffer by handle
    pub fn get_buffer(&self, id: BufferId) -> Option<&Buffer> {
        self.buffers.get(&id)
    }

    /// Analytics of a buffer
    pub fn analytics(&self, id: BufferId) -> Option<BufferAnalytics> {
        self.analytics.get(&id).copied()
    }

    /// Destroys a buffer and forgets it
    pub fn destroy(&mut self, id: BufferId) {
        if let Some(buffer) = self.buffers.remove(&id) {
            buffer.destroy();
        }
        self.analytics.remove(&id);
    }

    /// Number of live buffers
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    /// `true` when no buffer is registered
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Gets the total allocated memory across all buffers
    ///
    /// # Returns
    ///
    /// Total allocated memory in bytes
    pub fn get_total_allocated_memory(&self) -> u64 {
        self.analytics
            .values()
            .fold(0, |acc, analytics| acc + analytics.allocated_memory)
    }

    /// Gets the total used memory across all buffers
    ///
    /// # Returns
    ///
    /// Total used memory in bytes
    pub fn get_total_used_memory(&self) -> u64 {
        self.analytics
            .values()
            .fold(0, |acc, analytics| acc + analytics.used_memory)
    }
}

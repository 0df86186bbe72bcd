//! Host-memory [`UploadDevice`].
//!
//! Buffers are byte vectors and copies happen immediately on submission. Like a
//! real queue, completion is only observed on the next [`UploadDevice::poll`], so
//! fence-driven code paths behave the same as with a GPU.

use std::collections::HashMap;

use crate::core::Fence;

use super::{
    device::{BufferId, BufferKind, StagingCopy, UploadDevice},
    staging::StagingArena,
};

#[derive(Debug)]
struct HostBuffer {
    bytes: Vec<u8>,
    used: u64,
}

/// CPU backend for headless runs and tests.
#[derive(Debug)]
pub struct HostDevice {
    buffers: HashMap<BufferId, HostBuffer>,
    next_id: u64,
    in_flight: Vec<Fence>,
    last_submission: Fence,
    submissions: u64,
}

impl HostDevice {
    /// Creates an empty device.
    pub fn new() -> Self {
        Self {
            buffers: HashMap::new(),
            next_id: 1,
            in_flight: Vec::new(),
            last_submission: Fence::signaled(),
            submissions: 0,
        }
    }

    /// Contents of a live buffer.
    pub fn buffer_contents(&self, buffer: BufferId) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(|host| host.bytes.as_slice())
    }

    /// Number of live buffers.
    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    /// Number of submissions so far.
    pub fn submissions(&self) -> u64 {
        self.submissions
    }
}

impl Default for HostDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl UploadDevice for HostDevice {
    fn create_buffer(&mut self, _kind: BufferKind, size: u64) -> BufferId {
        let id = BufferId(self.next_id);
        self.next_id += 1;
        self.buffers.insert(
            id,
            HostBuffer {
                bytes: vec![0; size as usize],
                used: 0,
            },
        );
        id
    }

    fn submit_copies(&mut self, arena: &StagingArena, copies: &[StagingCopy], completion: Fence) {
        for copy in copies {
            let Some(destination) = self.buffers.get_mut(&copy.destination) else {
                log::warn!("copy into unknown buffer {:?} skipped", copy.destination);
                continue;
            };
            let start = copy.source_offset as usize;
            let end = start + copy.size as usize;
            arena.with_range(start..end, |bytes| {
                destination.bytes[..bytes.len()].copy_from_slice(bytes)
            });
            destination.used = destination.used.max(copy.size);
        }
        self.submissions += 1;
        self.last_submission = completion.clone();
        self.in_flight.push(completion);
    }

    fn poll(&mut self) {
        for fence in self.in_flight.drain(..) {
            fence.signal();
        }
    }

    fn destroy_buffer(&mut self, buffer: BufferId) {
        self.buffers.remove(&buffer);
    }

    fn last_submission(&self) -> Fence {
        self.last_submission.clone()
    }

    fn allocated_bytes(&self) -> u64 {
        self.buffers
            .values()
            .map(|host| host.bytes.len() as u64)
            .sum()
    }

    fn used_bytes(&self) -> u64 {
        self.buffers.values().map(|host| host.used).sum()
    }
}

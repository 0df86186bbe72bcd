//! Deferred destruction of device buffers.
//!
//! A buffer that stops being referenced by a chunk may still be read by
//! submitted device work. It is parked here together with the fence of the most
//! recent submission and destroyed by the main-thread reclaim pass once that
//! fence signalled.

use std::collections::VecDeque;

use crate::{
    core::Fence,
    engine_state::rendering::device::{BufferId, UploadDevice},
};

/// Buffers waiting for their fence.
#[derive(Debug, Default)]
pub struct DeferredDestroyQueue {
    entries: VecDeque<(Fence, Vec<BufferId>)>,
}

impl DeferredDestroyQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parks `buffers` until `fence` signals. Empty sets are ignored.
    pub fn push(&mut self, fence: Fence, buffers: impl IntoIterator<Item = BufferId>) {
        let buffers: Vec<_> = buffers.into_iter().collect();
        if !buffers.is_empty() {
            self.entries.push_back((fence, buffers));
        }
    }

    /// Destroys every buffer whose fence signalled. Returns how many were destroyed.
    pub fn collect(&mut self, device: &mut dyn UploadDevice) -> usize {
        let mut destroyed = 0;
        self.entries.retain(|(fence, buffers)| {
            if !fence.is_signaled() {
                return true;
            }
            for &buffer in buffers {
                device.destroy_buffer(buffer);
            }
            destroyed += buffers.len();
            false
        });
        destroyed
    }

    /// Buffers still waiting.
    pub fn pending_buffers(&self) -> usize {
        self.entries.iter().map(|(_, buffers)| buffers.len()).sum()
    }
}

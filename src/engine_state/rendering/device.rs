//! # Upload Device Interface
//!
//! The narrow slice of a graphics device the pipeline needs: create mesh
//! buffers, copy staged bytes into them, learn when those copies finished, and
//! destroy buffers later. Every method runs on the main thread.
//!
//! Two backends implement it:
//! - [`super::wgpu_device::WgpuDevice`]: real device-local buffers through `wgpu`
//! - [`super::host_device::HostDevice`]: plain host memory, for headless runs and tests

use crate::core::Fence;

use super::staging::StagingArena;

/// Opaque handle to a device buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u64);

/// What a mesh buffer is bound as.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BufferKind {
    /// Vertex buffer
    Vertex,
    /// Index buffer (`u32` indices)
    Index,
}

/// One staging-to-device copy.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StagingCopy {
    /// Absolute byte offset inside the staging arena
    pub source_offset: u64,
    /// Buffer receiving the bytes at offset 0
    pub destination: BufferId,
    /// Byte count
    pub size: u64,
}

/// Installed mesh of one chunk LOD.
///
/// An empty mesh has no buffers and zero indices.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MeshRecord {
    /// Vertex buffer
    pub vertex_buffer: Option<BufferId>,
    /// Index buffer
    pub index_buffer: Option<BufferId>,
    /// Total index count
    pub index_count: u32,
    /// Indices `0..opaque_index_count` belong to the opaque pass
    pub opaque_index_count: u32,
}

impl MeshRecord {
    /// A record with no geometry.
    pub const fn empty() -> Self {
        Self {
            vertex_buffer: None,
            index_buffer: None,
            index_count: 0,
            opaque_index_count: 0,
        }
    }

    /// `true` when there is nothing to draw.
    pub fn is_empty(&self) -> bool {
        self.index_count == 0
    }

    /// Indices drawn in the liquid pass.
    pub fn liquid_index_count(&self) -> u32 {
        self.index_count - self.opaque_index_count
    }

    /// Buffers owned by this record.
    pub fn buffers(&self) -> impl Iterator<Item = BufferId> {
        self.vertex_buffer.into_iter().chain(self.index_buffer)
    }
}

/// Device operations used by the upload and reclaim passes.
pub trait UploadDevice {
    /// Creates an uninitialised mesh buffer of `size` bytes that can be copied into.
    fn create_buffer(&mut self, kind: BufferKind, size: u64) -> BufferId;

    /// Records and submits `copies` from `arena`. `completion` is signalled once
    /// the device finished them and becomes the most recent submission fence.
    fn submit_copies(&mut self, arena: &StagingArena, copies: &[StagingCopy], completion: Fence);

    /// Lets the device report finished work, signalling completion fences.
    fn poll(&mut self);

    /// Frees a buffer. The caller guarantees the device no longer uses it.
    fn destroy_buffer(&mut self, buffer: BufferId);

    /// Fence of the most recent submission; signalled when nothing was submitted yet.
    fn last_submission(&self) -> Fence;

    /// Bytes currently held by live buffers.
    fn allocated_bytes(&self) -> u64;

    /// Bytes of live buffers that received data.
    fn used_bytes(&self) -> u64;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_splits_index_ranges() {
        let record = MeshRecord {
            vertex_buffer: Some(BufferId(4)),
            index_buffer: Some(BufferId(5)),
            index_count: 60,
            opaque_index_count: 36,
        };
        assert_eq!(record.liquid_index_count(), 24);
        assert_eq!(record.buffers().collect::<Vec<_>>(), vec![BufferId(4), BufferId(5)]);
        assert_eq!(MeshRecord::empty().buffers().count(), 0);
        assert!(MeshRecord::empty().is_empty());
    }
}

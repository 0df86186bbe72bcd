//! Staged meshes on their way to the device.
//!
//! A worker packs a [`MeshData`] into one arena region, vertices first and
//! indices after them, and wraps it in an [`UploadJob`]. The main thread later
//! hands the job to [`UploadJob::upload`], which creates the device buffers and
//! submits the copies. The region's fence doubles as the completion signal of
//! that submission.
//!
//! A job dropped before it was uploaded (its chunk was collected, or the pipeline
//! shut down) signals its region's fence itself so the arena can reclaim it.

use crate::core::CancellationToken;

use super::{
    device::{BufferKind, MeshRecord, StagingCopy, UploadDevice},
    meshing::MeshData,
    staging::{StagingArena, StagingError, StagingRegion},
};

/// Byte layout of a mesh inside its staging region.
#[derive(Debug)]
pub struct StagedGeometry {
    /// Arena span holding vertices then indices
    pub region: StagingRegion,
    /// Size of the vertex data at the start of the region
    pub vertex_bytes: u64,
    /// Offset of the index data inside the region
    pub index_offset: u64,
    /// Size of the index data
    pub index_bytes: u64,
    /// Total index count
    pub index_count: u32,
    /// Length of the opaque index prefix
    pub opaque_index_count: u32,
}

/// One LOD mesh waiting for its device copy.
///
/// `geometry == None` means the mesh is empty and uploading installs an empty record.
#[derive(Debug)]
pub struct UploadJob {
    lod: u8,
    geometry: Option<StagedGeometry>,
}

impl UploadJob {
    /// A job with no geometry.
    pub fn empty(lod: u8) -> Self {
        Self {
            lod,
            geometry: None,
        }
    }

    /// Copies `mesh` into a freshly allocated arena region.
    pub fn stage(
        arena: &StagingArena,
        mesh: &MeshData,
        lod: u8,
        cancel: &CancellationToken,
    ) -> Result<Self, StagingError> {
        if mesh.is_empty() {
            return Ok(Self::empty(lod));
        }

        let vertex_bytes = mesh.vertex_bytes();
        let index_bytes = mesh.index_bytes();
        let index_offset = (vertex_bytes.len() as u64).next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT);
        let region = arena.alloc(index_offset + index_bytes.len() as u64, cancel)?;

        arena.write(&region, 0, vertex_bytes);
        arena.write(&region, index_offset, index_bytes);

        Ok(Self {
            lod,
            geometry: Some(StagedGeometry {
                region,
                vertex_bytes: vertex_bytes.len() as u64,
                index_offset,
                index_bytes: index_bytes.len() as u64,
                index_count: mesh.index_count(),
                opaque_index_count: mesh.opaque_index_count,
            }),
        })
    }

    /// LOD this mesh belongs to.
    pub fn lod(&self) -> u8 {
        self.lod
    }

    /// `true` for the explicit "no geometry" job.
    pub fn is_empty(&self) -> bool {
        self.geometry.is_none()
    }

    /// Staged layout, if any.
    pub fn geometry(&self) -> Option<&StagedGeometry> {
        self.geometry.as_ref()
    }

    /// Creates the device buffers and submits the staging copies.
    ///
    /// Must run on the thread that owns the device.
    pub fn upload(mut self, device: &mut dyn UploadDevice, arena: &StagingArena) -> MeshRecord {
        let Some(geometry) = self.geometry.take() else {
            return MeshRecord::empty();
        };

        let vertex_buffer = device.create_buffer(BufferKind::Vertex, geometry.vertex_bytes);
        let index_buffer = device.create_buffer(BufferKind::Index, geometry.index_bytes);
        let copies = [
            StagingCopy {
                source_offset: geometry.region.offset,
                destination: vertex_buffer,
                size: geometry.vertex_bytes,
            },
            StagingCopy {
                source_offset: geometry.region.offset + geometry.index_offset,
                destination: index_buffer,
                size: geometry.index_bytes,
            },
        ];
        device.submit_copies(arena, &copies, geometry.region.fence.clone());

        MeshRecord {
            vertex_buffer: Some(vertex_buffer),
            index_buffer: Some(index_buffer),
            index_count: geometry.index_count,
            opaque_index_count: geometry.opaque_index_count,
        }
    }
}

impl Drop for UploadJob {
    fn drop(&mut self) {
        if let Some(geometry) = self.geometry.take() {
            geometry.region.fence.signal();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::{
        rendering::host_device::HostDevice,
        voxels::{grid::VoxelGrid, material::Material},
    };

    fn cube_mesh() -> MeshData {
        let mut grid = VoxelGrid::new(2, 2, 2);
        grid.set(0, 0, 0, Material::Stone.id());
        MeshData::build(&grid, 0)
    }

    #[test]
    fn staged_bytes_reach_the_device_buffers() {
        let arena = StagingArena::new(4096, 256);
        let mesh = cube_mesh();
        let job = UploadJob::stage(&arena, &mesh, 0, &CancellationToken::new()).expect("fits");
        let fence = job.geometry().expect("geometry").region.fence.clone();

        let mut device = HostDevice::new();
        let record = job.upload(&mut device, &arena);
        assert_eq!(record.index_count, 36);
        assert!(!fence.is_signaled());

        device.poll();
        assert!(fence.is_signaled());
        let indices = device
            .buffer_contents(record.index_buffer.expect("index buffer"))
            .expect("live buffer");
        assert_eq!(indices, mesh.index_bytes());
        let vertices = device
            .buffer_contents(record.vertex_buffer.expect("vertex buffer"))
            .expect("live buffer");
        assert_eq!(vertices, mesh.vertex_bytes());
    }

    #[test]
    fn dropping_an_unuploaded_job_releases_its_region() {
        let arena = StagingArena::new(4096, 256);
        let job = UploadJob::stage(&arena, &cube_mesh(), 1, &CancellationToken::new())
            .expect("fits");
        assert_eq!(arena.live_regions(), 1);
        drop(job);
        assert_eq!(arena.retire_signaled(), 1);
    }

    #[test]
    fn empty_mesh_uploads_as_empty_record() {
        let arena = StagingArena::new(1024, 256);
        let job = UploadJob::stage(&arena, &MeshData::default(), 0, &CancellationToken::new())
            .expect("nothing to allocate");
        assert!(job.is_empty());
        assert_eq!(arena.live_regions(), 0);
        let mut device = HostDevice::new();
        assert_eq!(job.upload(&mut device, &arena), MeshRecord::empty());
    }
}

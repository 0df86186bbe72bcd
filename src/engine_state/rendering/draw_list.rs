//! # Draw List
//!
//! What the renderer gets each frame: one item per `GpuReady` chunk that passes
//! the view-frustum test, split into an opaque list and a liquid list. Every
//! item holds a [`ChunkRef`] lease, so a listed chunk cannot be collected while
//! the renderer still uses the list.
//!
//! A chunk that is being remeshed, staged or uploaded is left out until it is
//! `GpuReady` again.

use std::collections::HashMap;

use cgmath::{Matrix, Matrix4, Point3, Vector4};

use crate::engine_state::voxels::chunk::{state::ChunkState, ChunkCoordinate, ChunkRef};

use super::device::MeshRecord;

/// Maps cgmath's `-1..1` clip depth to the `0..1` range `wgpu` uses.
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Visibility test against an axis-aligned box.
pub trait ViewFrustum {
    /// Whether any part of `[min, max]` may be visible.
    fn intersects_aabb(&self, min: Point3<f32>, max: Point3<f32>) -> bool;
}

/// Frustum that sees everything.
#[derive(Copy, Clone, Debug, Default)]
pub struct AllVisible;

impl ViewFrustum for AllVisible {
    fn intersects_aabb(&self, _min: Point3<f32>, _max: Point3<f32>) -> bool {
        true
    }
}

/// Six clip planes extracted from a view-projection matrix (depth range `0..1`).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Frustum {
    planes: [Vector4<f32>; 6],
}

impl Frustum {
    /// Extracts the planes of `view_projection`. Plane normals point inward.
    pub fn from_view_projection(view_projection: Matrix4<f32>) -> Self {
        let r0 = view_projection.row(0);
        let r1 = view_projection.row(1);
        let r2 = view_projection.row(2);
        let r3 = view_projection.row(3);
        Self {
            planes: [r3 + r0, r3 - r0, r3 + r1, r3 - r1, r2, r3 - r2],
        }
    }
}

impl ViewFrustum for Frustum {
    fn intersects_aabb(&self, min: Point3<f32>, max: Point3<f32>) -> bool {
        self.planes.iter().all(|plane| {
            let farthest = Point3::new(
                if plane.x >= 0.0 { max.x } else { min.x },
                if plane.y >= 0.0 { max.y } else { min.y },
                if plane.z >= 0.0 { max.z } else { min.z },
            );
            plane.x * farthest.x + plane.y * farthest.y + plane.z * farthest.z + plane.w >= 0.0
        })
    }
}

/// One chunk mesh to draw.
#[derive(Debug, Clone)]
pub struct DrawItem {
    /// Lease on the chunk
    pub chunk: ChunkRef,
    /// LOD of `mesh`
    pub lod: u8,
    /// Buffers and index ranges
    pub mesh: MeshRecord,
}

/// Per-frame list of visible chunk meshes.
#[derive(Debug, Default)]
pub struct DrawList {
    /// Items with an opaque index range
    pub opaque: Vec<DrawItem>,
    /// Items with a liquid index range
    pub liquid: Vec<DrawItem>,
}

impl DrawList {
    /// Collects `GpuReady` chunks of `active` visible through `frustum`.
    ///
    /// `wanted_lod` gives the LOD to prefer for each chunk; the best available
    /// mesh at or below it is used, falling back to any installed mesh.
    pub fn build(
        active: &HashMap<ChunkCoordinate, ChunkRef>,
        frustum: &dyn ViewFrustum,
        wanted_lod: impl Fn(ChunkCoordinate) -> u8,
    ) -> Self {
        let mut list = DrawList::default();
        for (&coordinate, chunk) in active {
            if chunk.state() != ChunkState::GpuReady {
                continue;
            }
            let Some((lod, mesh)) = chunk.best_mesh(wanted_lod(coordinate)) else {
                continue;
            };
            if mesh.is_empty() {
                continue;
            }
            let min = coordinate.world_origin();
            if !frustum.intersects_aabb(min, min + ChunkCoordinate::world_extent()) {
                continue;
            }

            let item = DrawItem {
                chunk: chunk.clone(),
                lod,
                mesh,
            };
            if mesh.liquid_index_count() > 0 {
                list.liquid.push(item.clone());
            }
            if mesh.opaque_index_count > 0 {
                list.opaque.push(item);
            }
        }
        list.opaque
            .sort_by_key(|item| (item.lod, item.chunk.coordinate()));
        list.liquid
            .sort_by_key(|item| (item.lod, item.chunk.coordinate()));
        list
    }

    /// Total number of items in both lists.
    pub fn len(&self) -> usize {
        self.opaque.len() + self.liquid.len()
    }

    /// `true` when nothing is visible.
    pub fn is_empty(&self) -> bool {
        self.opaque.is_empty() && self.liquid.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::{
        rendering::device::BufferId,
        voxels::{chunk::state::ChunkState, grid::VoxelGrid},
    };
    use cgmath::{perspective, Deg, Vector3};

    fn ready_chunk(coordinate: ChunkCoordinate, mesh: MeshRecord) -> ChunkRef {
        let chunk = ChunkRef::create(coordinate);
        chunk.install_grid(VoxelGrid::new(1, 1, 1));
        chunk
            .transition(ChunkState::TerrainReady, ChunkState::Meshing)
            .expect("meshing");
        chunk
            .transition(ChunkState::Meshing, ChunkState::StagingReady)
            .expect("staged");
        chunk
            .transition(ChunkState::StagingReady, ChunkState::Uploading)
            .expect("uploading");
        chunk
            .transition(ChunkState::Uploading, ChunkState::GpuReady)
            .expect("ready");
        chunk.slots()[0].mesh = Some(mesh);
        chunk
    }

    fn mesh(index_count: u32, opaque_index_count: u32) -> MeshRecord {
        MeshRecord {
            vertex_buffer: Some(BufferId(1)),
            index_buffer: Some(BufferId(2)),
            index_count,
            opaque_index_count,
        }
    }

    #[test]
    fn splits_opaque_and_liquid_items() {
        let mut active = HashMap::new();
        let a = ChunkCoordinate::new(0, 0, 0);
        let b = ChunkCoordinate::new(1, 0, 0);
        active.insert(a, ready_chunk(a, mesh(36, 36)));
        active.insert(b, ready_chunk(b, mesh(42, 36)));
        let list = DrawList::build(&active, &AllVisible, |_| 0);
        assert_eq!(list.opaque.len(), 2);
        assert_eq!(list.liquid.len(), 1);
        assert_eq!(list.liquid[0].chunk.coordinate(), b);
        assert_eq!(active[&b].lease_count(), 3);
    }

    #[test]
    fn chunks_without_meshes_are_skipped() {
        let mut active = HashMap::new();
        let a = ChunkCoordinate::new(0, 0, 0);
        let chunk = ChunkRef::create(a);
        chunk.install_grid(VoxelGrid::new(1, 1, 1));
        active.insert(a, chunk);
        assert!(DrawList::build(&active, &AllVisible, |_| 0).is_empty());
    }

    #[test]
    fn chunks_being_remeshed_are_hidden() {
        let mut active = HashMap::new();
        let a = ChunkCoordinate::new(0, 0, 0);
        let chunk = ChunkRef::create(a);
        chunk.install_grid(VoxelGrid::new(1, 1, 1));
        chunk.slots()[1].mesh = Some(mesh(36, 36));
        chunk
            .transition(ChunkState::TerrainReady, ChunkState::Meshing)
            .expect("meshing");
        active.insert(a, chunk.clone());
        assert!(DrawList::build(&active, &AllVisible, |_| 0).is_empty());

        chunk
            .transition(ChunkState::Meshing, ChunkState::StagingReady)
            .expect("staged");
        assert!(DrawList::build(&active, &AllVisible, |_| 0).is_empty());
        chunk
            .transition(ChunkState::StagingReady, ChunkState::Uploading)
            .expect("uploading");
        assert!(DrawList::build(&active, &AllVisible, |_| 0).is_empty());
        chunk
            .transition(ChunkState::Uploading, ChunkState::GpuReady)
            .expect("ready");
        let list = DrawList::build(&active, &AllVisible, |_| 0);
        assert_eq!(list.opaque.len(), 1);
        assert_eq!(list.opaque[0].lod, 1);
    }

    #[test]
    fn frustum_culls_chunks_behind_the_viewer() {
        let projection = OPENGL_TO_WGPU_MATRIX * perspective(Deg(70.0), 1.0, 0.1, 1000.0);
        let view = Matrix4::look_to_rh(
            Point3::new(0.0, 64.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::unit_y(),
        );
        let frustum = Frustum::from_view_projection(projection * view);

        let ahead = ChunkCoordinate::new(3, 0, 0).world_origin();
        let behind = ChunkCoordinate::new(-4, 0, 0).world_origin();
        let extent = ChunkCoordinate::world_extent();
        assert!(frustum.intersects_aabb(ahead, ahead + extent));
        assert!(!frustum.intersects_aabb(behind, behind + extent));
    }
}

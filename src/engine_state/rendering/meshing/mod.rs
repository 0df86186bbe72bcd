//! Mesh generation for chunk grids.
//!
//! The entry point is [`MeshData::build`]: it downsamples the grid for the
//! requested LOD, runs the greedy mesher and expands the quads into vertex and
//! index arrays.
//!
//! # Index Ranges
//! Opaque quads are emitted first, liquid quads after them, so every mesh is
//! drawn as two contiguous ranges:
//! - `0..opaque_index_count`: opaque pass
//! - `opaque_index_count..indices.len()`: liquid pass

pub mod greedy;
pub mod quad;

use std::borrow::Cow;

use crate::engine_state::{
    rendering::vertex::Vertex,
    voxels::{grid::VoxelGrid, material::is_liquid_id},
};

pub use greedy::{greedy_quads, naive_face_count};
pub use quad::{FaceDirection, Quad};

/// Downsampling factor for a LOD level.
pub fn lod_factor(lod: u8) -> usize {
    1usize << lod
}

/// CPU-side mesh ready to be staged.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MeshData {
    /// Vertex array
    pub vertices: Vec<Vertex>,
    /// Triangle list indices
    pub indices: Vec<u32>,
    /// Length of the opaque prefix of `indices`
    pub opaque_index_count: u32,
    /// Number of merged quads
    pub quad_count: usize,
}

impl MeshData {
    /// Meshes `grid` at `lod`.
    pub fn build(grid: &VoxelGrid, lod: u8) -> Self {
        let factor = lod_factor(lod);
        let grid = if factor > 1 {
            Cow::Owned(grid.downsample(factor))
        } else {
            Cow::Borrowed(grid)
        };
        let quads = greedy_quads(&grid);
        Self::from_quads(&quads, factor as f32)
    }

    /// Expands quads into vertices, opaque quads first.
    pub fn from_quads(quads: &[Quad], scale: f32) -> Self {
        let mut vertices = Vec::with_capacity(quads.len() * 4);
        let mut indices = Vec::with_capacity(quads.len() * 6);

        let (liquid, opaque): (Vec<&Quad>, Vec<&Quad>) =
            quads.iter().partition(|q| is_liquid_id(q.material));

        for quad in &opaque {
            quad.emit(scale, &mut vertices, &mut indices);
        }
        let opaque_index_count = indices.len() as u32;
        for quad in &liquid {
            quad.emit(scale, &mut vertices, &mut indices);
        }

        log::trace!(
            "meshed {} opaque and {} liquid quads",
            opaque.len(),
            liquid.len()
        );

        Self {
            vertices,
            indices,
            opaque_index_count,
            quad_count: quads.len(),
        }
    }

    /// `true` when there is nothing to draw.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Total index count.
    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    /// Vertex array as raw bytes.
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Index array as raw bytes.
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}

//! Vertex format produced by the greedy mesher.
//!
//! There is no normal attribute: face orientation is carried by the triangle
//! winding alone.

/// A vertex of a chunk mesh.
///
/// # Memory Layout
/// - Position: [f32; 3] (12 bytes), chunk-local voxel units
/// - UV: [f32; 2] (8 bytes), spans the quad size in voxels so the tile repeats
/// - Atlas origin: [f32; 2] (8 bytes), normalized corner of the material tile
///
/// Total size: 28 bytes
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    /// Chunk-local position
    pub position: [f32; 3],
    /// Texture coordinates in voxels
    pub uv: [f32; 2],
    /// Top-left corner of the tile in the atlas
    pub atlas_origin: [f32; 2],
}

impl Vertex {
    /// Creates a vertex.
    pub fn new(position: [f32; 3], uv: [f32; 2], atlas_origin: [f32; 2]) -> Self {
        Self {
            position,
            uv,
            atlas_origin,
        }
    }

    /// Returns the vertex buffer layout description for the shader pipeline.
    ///
    /// # Shader Attributes
    /// - `location = 0`: position (vec3<f32>)
    /// - `location = 1`: uv (vec2<f32>)
    /// - `location = 2`: atlas_origin (vec2<f32>)
    pub fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
            wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x2, 2 => Float32x2];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }
}

//! Background tasks for the rendering system.
//!
//! Meshing and staging are the expensive half of the pipeline and run on the
//! worker pool so the main thread only ever performs the device copies.
//!
//! # Available Tasks
//! - `ChunkMeshGenerationTask`: meshes one chunk LOD and stages it for upload

pub mod chunk_mesh_generation_task;

//! # Voxel Data
//!
//! Everything a chunk is made of before it is meshed.
//!
//! * **Material**: voxel material ids and their atlas tiles
//! * **Grid**: the dense voxel array of one chunk
//! * **Terrain**: deterministic noise terrain per chunk coordinate
//! * **Chunk**: coordinates, lifecycle state and lease-counted handles
//! * **Tasks**: terrain generation on the worker pool
//!
//! ## Thread Safety
//!
//! A chunk's grid is written once and read freely afterwards; its lifecycle only
//! moves through compare-and-swap transitions. Per-LOD mesh slots are owned by
//! the main thread.

pub mod chunk;
pub mod grid;
pub mod material;
pub mod tasks;
pub mod terrain;

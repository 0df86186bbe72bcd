//! # Voxel Task System
//!
//! Tasks that fill chunks with voxel data on the worker pool.

pub mod chunk_generation_task;

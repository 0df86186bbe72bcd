//! Rendering side of the chunk pipeline.
//!
//! Everything between a finished voxel grid and a drawable mesh lives here:
//! greedy meshing, the staging ring, the upload path and the device backends,
//! plus the draw list handed to a renderer. Creating pipelines and shaders is
//! left to the embedding application.

pub mod device;
pub mod draw_list;
pub mod host_device;
pub mod meshing;
pub mod staging;
pub mod tasks;
pub mod upload;
pub mod vertex;
pub mod wgpu_device;

// Re-export commonly used types
pub use device::{BufferId, MeshRecord, UploadDevice};
pub use host_device::HostDevice;
pub use vertex::Vertex;
pub use wgpu_device::WgpuDevice;

//! # Core Module
//!
//! Concurrency primitives shared by every stage of the chunk pipeline.
//!
//! ## Key Components
//! - `MtResource`: Thread-safe reference-counted resource with read-write locking
//! - `CancellationToken`: Cooperative stop signal handed to every worker task
//! - `Fence`: One-shot completion signal raised by the device backend
//!
//! ## Usage
//! ```rust
//! use chunk_pipeline::core::{CancellationToken, Fence, MtResource};
//!
//! let counter = MtResource::new(0);
//! *counter.get_mut() += 1;
//! assert_eq!(*counter.get(), 1);
//!
//! let token = CancellationToken::new();
//! token.cancel();
//! assert!(token.is_cancelled());
//!
//! let fence = Fence::new();
//! fence.signal();
//! assert!(fence.is_signaled());
//! ```

pub mod cancellation;
pub mod fence;
pub mod mt_resource;

pub use cancellation::CancellationToken;
pub use fence::Fence;
pub use mt_resource::MtResource;

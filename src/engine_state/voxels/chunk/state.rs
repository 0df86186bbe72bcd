//! # Chunk Lifecycle State
//!
//! Every chunk walks through the same sequence of states:
//!
//! ```text
//! Initial -> TerrainReady -> Meshing -> StagingReady -> Uploading -> GpuReady
//!                 ^             |                                      |
//!                 +-------------+ (rollback)                           |
//!                               ^--------------------------------------+
//!                               (another LOD requested)
//! ```
//!
//! The state lives in a single atomic byte. [`ChunkStateCell::transition`] is the
//! only way to change it: it refuses edges outside the table above and performs a
//! compare-and-swap, so two workers racing for the same chunk cannot both win.

use std::{
    fmt,
    sync::atomic::{AtomicU8, Ordering},
};

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

/// Lifecycle state of a chunk.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, FromPrimitive)]
pub enum ChunkState {
    /// Created; terrain not generated yet.
    Initial = 0,
    /// Voxel grid filled; no mesh work running.
    TerrainReady = 1,
    /// A worker is building and staging a mesh.
    Meshing = 2,
    /// A staged upload is waiting for the main thread.
    StagingReady = 3,
    /// The main thread is issuing device copies.
    Uploading = 4,
    /// At least one LOD mesh is installed and no work is running.
    GpuReady = 5,
}

impl ChunkState {
    /// Whether `self -> to` is an edge of the lifecycle graph.
    pub fn can_transition_to(self, to: ChunkState) -> bool {
        use ChunkState::*;
        matches!(
            (self, to),
            (Initial, TerrainReady)
                | (TerrainReady, Meshing)
                | (GpuReady, Meshing)
                | (Meshing, StagingReady)
                | (Meshing, TerrainReady)
                | (Meshing, GpuReady)
                | (StagingReady, Uploading)
                | (Uploading, GpuReady)
        )
    }

    /// States in which no worker touches the chunk and a new mesh job may start.
    pub fn is_ready(self) -> bool {
        matches!(self, ChunkState::TerrainReady | ChunkState::GpuReady)
    }
}

/// Why a transition was refused.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TransitionError {
    /// The requested edge is not part of the lifecycle graph.
    Forbidden {
        /// Requested source state
        from: ChunkState,
        /// Requested destination state
        to: ChunkState,
    },
    /// The cell did not hold the expected source state.
    Contended {
        /// State observed instead
        observed: ChunkState,
    },
}

impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionError::Forbidden { from, to } => {
                write!(f, "transition {from:?} -> {to:?} is not allowed")
            }
            TransitionError::Contended { observed } => {
                write!(f, "chunk state changed concurrently (observed {observed:?})")
            }
        }
    }
}

impl std::error::Error for TransitionError {}

/// Atomic holder of a [`ChunkState`].
#[derive(Debug)]
pub struct ChunkStateCell(AtomicU8);

impl ChunkStateCell {
    /// Creates a cell in `state`.
    pub fn new(state: ChunkState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    /// Current state.
    pub fn load(&self) -> ChunkState {
        decode(self.0.load(Ordering::Acquire))
    }

    /// Moves the cell from `from` to `to` if that edge exists and the cell still
    /// holds `from`.
    pub fn transition(&self, from: ChunkState, to: ChunkState) -> Result<(), TransitionError> {
        if !from.can_transition_to(to) {
            return Err(TransitionError::Forbidden { from, to });
        }
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|observed| TransitionError::Contended {
                observed: decode(observed),
            })
    }
}

impl Default for ChunkStateCell {
    fn default() -> Self {
        Self::new(ChunkState::Initial)
    }
}

fn decode(raw: u8) -> ChunkState {
    // Only `transition` writes the cell, and it only stores valid discriminants.
    ChunkState::from_u8(raw).unwrap_or(ChunkState::Initial)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    #[test]
    fn walks_the_full_lifecycle() {
        let cell = ChunkStateCell::default();
        let path = [
            ChunkState::TerrainReady,
            ChunkState::Meshing,
            ChunkState::StagingReady,
            ChunkState::Uploading,
            ChunkState::GpuReady,
            ChunkState::Meshing,
            ChunkState::GpuReady,
        ];
        let mut current = cell.load();
        for next in path {
            cell.transition(current, next).expect("edge in table");
            current = next;
        }
        assert_eq!(cell.load(), ChunkState::GpuReady);
    }

    #[test]
    fn forbidden_edges_are_rejected_without_touching_the_cell() {
        let cell = ChunkStateCell::new(ChunkState::TerrainReady);
        assert_eq!(
            cell.transition(ChunkState::TerrainReady, ChunkState::GpuReady),
            Err(TransitionError::Forbidden {
                from: ChunkState::TerrainReady,
                to: ChunkState::GpuReady,
            })
        );
        assert_eq!(cell.load(), ChunkState::TerrainReady);
    }

    #[test]
    fn stale_source_reports_the_observed_state() {
        let cell = ChunkStateCell::new(ChunkState::Meshing);
        assert_eq!(
            cell.transition(ChunkState::GpuReady, ChunkState::Meshing),
            Err(TransitionError::Contended {
                observed: ChunkState::Meshing
            })
        );
    }

    #[test]
    fn only_one_racer_enters_meshing() {
        let cell = Arc::new(ChunkStateCell::new(ChunkState::GpuReady));
        let winners = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cell = cell.clone();
                let winners = winners.clone();
                std::thread::spawn(move || {
                    if cell
                        .transition(ChunkState::GpuReady, ChunkState::Meshing)
                        .is_ok()
                    {
                        winners.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("racer thread");
        }
        assert_eq!(winners.load(Ordering::SeqCst), 1);
        assert_eq!(cell.load(), ChunkState::Meshing);
    }
}

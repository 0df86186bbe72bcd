//! # Staging Arena
//!
//! A fixed-capacity ring of transfer-visible memory. Workers write finished meshes
//! into it; the main thread copies them from there into device-local buffers.
//!
//! ## Allocation
//!
//! [`StagingArena::alloc`] rounds the request up to the alignment and tries the
//! span starting at the head, wrapping to offset 0 when the tail is too short. A
//! span is free when it overlaps no live region. Failing that, signalled regions
//! are retired and the search repeats; failing again, the caller blocks on the
//! oldest live region's fence.
//!
//! ## Retirement
//!
//! Regions are registered in allocation order, which is also the order their
//! copies are submitted on the queue, so retirement walks strictly FIFO from the
//! oldest region and stops at the first unsignalled one.

use std::{
    collections::VecDeque,
    fmt,
    ops::Range,
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use crate::core::{CancellationToken, Fence};

/// How long a blocked allocation sleeps between cancellation checks.
const WAIT_SLICE: Duration = Duration::from_millis(5);

/// Why an allocation failed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StagingError {
    /// The aligned request is larger than the whole arena. Permanent.
    TooLarge {
        /// Aligned request size in bytes
        requested: u64,
        /// Arena capacity in bytes
        capacity: u64,
    },
    /// The cancellation token tripped while waiting for space.
    Cancelled,
}

impl fmt::Display for StagingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StagingError::TooLarge {
                requested,
                capacity,
            } => write!(
                f,
                "staging request of {requested} bytes exceeds arena capacity of {capacity} bytes"
            ),
            StagingError::Cancelled => write!(f, "staging allocation cancelled"),
        }
    }
}

impl std::error::Error for StagingError {}

/// A span of the arena handed out by [`StagingArena::alloc`].
///
/// The region stays live until its fence is signalled and the arena retires it.
#[derive(Clone, Debug)]
pub struct StagingRegion {
    /// Byte offset inside the arena
    pub offset: u64,
    /// Aligned size in bytes
    pub size: u64,
    /// Raised once nothing reads the region any more
    pub fence: Fence,
}

#[derive(Debug)]
struct LiveRegion {
    offset: u64,
    size: u64,
    fence: Fence,
}

impl LiveRegion {
    fn overlaps(&self, offset: u64, size: u64) -> bool {
        offset < self.offset + self.size && self.offset < offset + size
    }
}

#[derive(Debug, Default)]
struct Ring {
    head: u64,
    live: VecDeque<LiveRegion>,
}

/// Fence-tracked ring allocator over a host memory block.
pub struct StagingArena {
    capacity: u64,
    alignment: u64,
    ring: Mutex<Ring>,
    memory: Mutex<Vec<u8>>,
}

impl StagingArena {
    /// Creates an arena of `capacity` bytes. `alignment` must be a power of two.
    pub fn new(capacity: u64, alignment: u64) -> Self {
        debug_assert!(alignment.is_power_of_two());
        Self {
            capacity,
            alignment,
            ring: Mutex::new(Ring::default()),
            memory: Mutex::new(vec![0; capacity as usize]),
        }
    }

    /// Total size in bytes.
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Rounds `size` up to the arena alignment.
    pub fn align(&self, size: u64) -> u64 {
        size.div_ceil(self.alignment) * self.alignment
    }

    fn ring(&self) -> MutexGuard<'_, Ring> {
        self.ring.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reserves `size` bytes, blocking while the ring is full.
    pub fn alloc(
        &self,
        size: u64,
        cancel: &CancellationToken,
    ) -> Result<StagingRegion, StagingError> {
        let size = self.align(size.max(1));
        if size > self.capacity {
            return Err(StagingError::TooLarge {
                requested: size,
                capacity: self.capacity,
            });
        }

        loop {
            let oldest = {
                let mut ring = self.ring();
                if let Some(region) = self.try_place(&mut ring, size) {
                    return Ok(region);
                }
                Self::retire(&mut ring);
                if let Some(region) = self.try_place(&mut ring, size) {
                    return Ok(region);
                }
                match ring.live.front() {
                    Some(oldest) => oldest.fence.clone(),
                    // Nothing live means the wrapped span at offset 0 always fits.
                    None => continue,
                }
            };

            log::debug!("staging arena full, waiting for the oldest region");
            while !oldest.wait_timeout(WAIT_SLICE) {
                if cancel.is_cancelled() {
                    return Err(StagingError::Cancelled);
                }
            }
        }
    }

    fn try_place(&self, ring: &mut Ring, size: u64) -> Option<StagingRegion> {
        let candidates = [ring.head, 0];
        let offset = candidates.into_iter().find(|&offset| {
            offset + size <= self.capacity && !ring.live.iter().any(|r| r.overlaps(offset, size))
        })?;

        let fence = Fence::new();
        ring.live.push_back(LiveRegion {
            offset,
            size,
            fence: fence.clone(),
        });
        ring.head = offset + size;
        Some(StagingRegion {
            offset,
            size,
            fence,
        })
    }

    fn retire(ring: &mut Ring) -> usize {
        let mut retired = 0;
        while ring.live.front().is_some_and(|r| r.fence.is_signaled()) {
            ring.live.pop_front();
            retired += 1;
        }
        retired
    }

    /// Retires every signalled region at the front of the ring.
    pub fn retire_signaled(&self) -> usize {
        Self::retire(&mut self.ring())
    }

    /// Number of live regions.
    pub fn live_regions(&self) -> usize {
        self.ring().live.len()
    }

    /// Bytes held by live regions.
    pub fn bytes_in_flight(&self) -> u64 {
        self.ring().live.iter().map(|r| r.size).sum()
    }

    /// Copies `bytes` into the region at `offset_in_region`.
    ///
    /// # Panics
    /// Panics if the write runs past the end of the region.
    pub fn write(&self, region: &StagingRegion, offset_in_region: u64, bytes: &[u8]) {
        assert!(
            offset_in_region + bytes.len() as u64 <= region.size,
            "staging write out of bounds"
        );
        let start = (region.offset + offset_in_region) as usize;
        let mut memory = self.memory.lock().unwrap_or_else(PoisonError::into_inner);
        memory[start..start + bytes.len()].copy_from_slice(bytes);
    }

    /// Runs `f` over the bytes of `region`.
    pub fn with_bytes<R>(&self, region: &StagingRegion, f: impl FnOnce(&[u8]) -> R) -> R {
        let start = region.offset as usize;
        self.with_range(start..start + region.size as usize, f)
    }

    /// Runs `f` over an absolute byte range of the arena.
    pub fn with_range<R>(&self, range: Range<usize>, f: impl FnOnce(&[u8]) -> R) -> R {
        let memory = self.memory.lock().unwrap_or_else(PoisonError::into_inner);
        f(&memory[range])
    }
}

impl fmt::Debug for StagingArena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StagingArena")
            .field("capacity", &self.capacity)
            .field("alignment", &self.alignment)
            .field("ring", &*self.ring())
            .finish()
    }
}

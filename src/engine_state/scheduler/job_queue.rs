//! Pending and in-progress meshing jobs.
//!
//! A [`JobKey`] lives in at most one of the two sets at any time. Pending keys
//! sit in a min-heap ordered by `(lod, coordinate)`, so coarse fallback meshes
//! are always built before fine ones and ties break by coordinate.

use std::{
    cmp::{Ordering, Reverse},
    collections::{BinaryHeap, HashSet},
    sync::{Mutex, MutexGuard, PoisonError},
};

use crate::engine_state::voxels::chunk::ChunkCoordinate;

/// Identifies one meshing job: a chunk at one LOD.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct JobKey {
    /// Chunk to mesh
    pub coordinate: ChunkCoordinate,
    /// LOD to build
    pub lod: u8,
}

impl JobKey {
    /// Creates a key.
    pub fn new(coordinate: ChunkCoordinate, lod: u8) -> Self {
        Self { coordinate, lod }
    }
}

impl Ord for JobKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.lod
            .cmp(&other.lod)
            .then_with(|| self.coordinate.cmp(&other.coordinate))
    }
}

impl PartialOrd for JobKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Default)]
struct JobSets {
    queue: BinaryHeap<Reverse<JobKey>>,
    pending: HashSet<JobKey>,
    in_progress: HashSet<JobKey>,
}

/// Deduplicating job book shared by the scheduler and completion handling.
#[derive(Debug, Default)]
pub struct JobBook {
    sets: Mutex<JobSets>,
}

impl JobBook {
    /// Creates an empty book.
    pub fn new() -> Self {
        Self::default()
    }

    fn sets(&self) -> MutexGuard<'_, JobSets> {
        self.sets.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds `key` to pending unless it is already pending or in progress.
    pub fn request(&self, key: JobKey) -> bool {
        let mut sets = self.sets();
        if sets.in_progress.contains(&key) || !sets.pending.insert(key) {
            return false;
        }
        sets.queue.push(Reverse(key));
        true
    }

    /// Moves pending keys to in-progress in `(lod, coordinate)` order while fewer
    /// than `cap` keys are in progress. Returns the moved keys.
    pub fn submit_up_to(&self, cap: usize) -> Vec<JobKey> {
        let mut sets = self.sets();
        let mut submitted = Vec::new();
        while sets.in_progress.len() < cap {
            let Some(Reverse(key)) = sets.queue.pop() else {
                break;
            };
            sets.pending.remove(&key);
            sets.in_progress.insert(key);
            submitted.push(key);
        }
        submitted
    }

    /// Removes a finished (or dropped) key from in-progress.
    pub fn complete(&self, key: JobKey) -> bool {
        self.sets().in_progress.remove(&key)
    }

    /// Drops pending keys for which `keep` returns `false`.
    pub fn retain_pending(&self, mut keep: impl FnMut(&JobKey) -> bool) {
        let mut sets = self.sets();
        let JobSets { queue, pending, .. } = &mut *sets;
        pending.retain(|key| keep(key));
        queue.retain(|Reverse(key)| pending.contains(key));
    }

    /// Whether `key` is pending.
    pub fn is_pending(&self, key: JobKey) -> bool {
        self.sets().pending.contains(&key)
    }

    /// Whether any of `lods` at `coordinate` is in progress.
    pub fn any_in_progress(&self, coordinate: ChunkCoordinate, lods: &[u8]) -> bool {
        let sets = self.sets();
        lods.iter()
            .any(|&lod| sets.in_progress.contains(&JobKey::new(coordinate, lod)))
    }

    /// Number of pending keys.
    pub fn pending_len(&self) -> usize {
        self.sets().pending.len()
    }

    /// Number of in-progress keys.
    pub fn in_progress_len(&self) -> usize {
        self.sets().in_progress.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(x: i32, lod: u8) -> JobKey {
        JobKey::new(ChunkCoordinate::new(x, 0, 0), lod)
    }

    #[test]
    fn keys_order_by_lod_then_coordinate() {
        let mut keys = vec![key(0, 1), key(5, 0), key(-3, 1), key(2, 0)];
        keys.sort();
        assert_eq!(keys, vec![key(2, 0), key(5, 0), key(-3, 1), key(0, 1)]);
    }

    #[test]
    fn submits_min_of_pending_and_cap() {
        for (pending, cap) in [(5, 3), (2, 4), (0, 2), (4, 4)] {
            let book = JobBook::new();
            for x in 0..pending {
                assert!(book.request(key(x, 0)));
            }
            let submitted = book.submit_up_to(cap);
            assert_eq!(submitted.len(), pending.min(cap as i32) as usize);
            assert_eq!(book.in_progress_len(), submitted.len());
            assert_eq!(book.pending_len(), pending as usize - submitted.len());
        }
    }

    #[test]
    fn cap_counts_jobs_already_in_progress() {
        let book = JobBook::new();
        for x in 0..6 {
            book.request(key(x, 1));
        }
        assert_eq!(book.submit_up_to(2).len(), 2);
        assert_eq!(book.submit_up_to(3).len(), 1);
        assert!(book.submit_up_to(3).is_empty());
    }

    #[test]
    fn duplicate_requests_are_ignored_while_pending_or_in_progress() {
        let book = JobBook::new();
        let k = key(1, 0);
        assert!(book.request(k));
        assert!(!book.request(k));
        assert_eq!(book.pending_len(), 1);

        assert_eq!(book.submit_up_to(4), vec![k]);
        assert!(!book.request(k));
        assert_eq!((book.pending_len(), book.in_progress_len()), (0, 1));

        assert!(book.complete(k));
        assert!(book.request(k));
    }

    #[test]
    fn submission_follows_priority_order() {
        let book = JobBook::new();
        for k in [key(3, 1), key(9, 0), key(-1, 1), key(4, 0)] {
            book.request(k);
        }
        assert_eq!(
            book.submit_up_to(4),
            vec![key(4, 0), key(9, 0), key(-1, 1), key(3, 1)]
        );
    }

    #[test]
    fn retained_keys_survive_pruning() {
        let book = JobBook::new();
        for x in 0..4 {
            book.request(key(x, 0));
        }
        book.retain_pending(|k| k.coordinate.x % 2 == 0);
        assert_eq!(book.pending_len(), 2);
        assert_eq!(book.submit_up_to(8), vec![key(0, 0), key(2, 0)]);
    }
}

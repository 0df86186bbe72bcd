//! # Chunk Module
//!
//! A chunk is a `CHUNK_WIDTH × CHUNK_HEIGHT × CHUNK_DEPTH` column of voxels and the
//! unit of generation, meshing and streaming.
//!
//! ## Ownership
//!
//! Chunks are shared through [`ChunkRef`] handles that keep an explicit lease
//! count on the chunk:
//!
//! * the active map *or* the garbage list holds the chunk's home lease,
//! * every worker task and every draw list item holds one more.
//!
//! The garbage collector frees a chunk only when its lease count is exactly 1,
//! meaning nothing but the garbage list still sees it.
//!
//! ## Interior State
//!
//! * the voxel grid is written once by the terrain task (`OnceLock`),
//! * the lifecycle state is a CAS-guarded atomic ([`state::ChunkStateCell`]),
//! * the per-LOD slots (installed mesh, pending upload) are only touched by the
//!   main thread; their mutex is never contended.

pub mod state;

use std::{
    fmt,
    ops::Deref,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex, MutexGuard, OnceLock, PoisonError,
    },
};

use cgmath::{Point3, Vector3};

use crate::engine_state::rendering::{device::MeshRecord, upload::UploadJob};

use self::state::{ChunkState, ChunkStateCell, TransitionError};
use super::grid::{VoxelGrid, CHUNK_DEPTH, CHUNK_HEIGHT, CHUNK_WIDTH};

/// Number of LOD levels a chunk keeps meshes for.
pub const LOD_LEVELS: usize = 2;

/// Position of a chunk in chunk-grid space. `y` is always 0 for column chunks.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkCoordinate {
    /// Chunk index along x
    pub x: i32,
    /// Chunk index along y
    pub y: i32,
    /// Chunk index along z
    pub z: i32,
}

impl ChunkCoordinate {
    /// Creates a coordinate.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Chunk containing the world-space position.
    pub fn containing(position: Point3<f32>) -> Self {
        Self::new(
            (position.x / CHUNK_WIDTH as f32).floor() as i32,
            0,
            (position.z / CHUNK_DEPTH as f32).floor() as i32,
        )
    }

    /// Chebyshev distance in the horizontal (x, z) plane.
    pub fn horizontal_distance(self, other: ChunkCoordinate) -> i32 {
        (self.x - other.x).abs().max((self.z - other.z).abs())
    }

    /// World-space minimum corner of the chunk.
    pub fn world_origin(self) -> Point3<f32> {
        Point3::new(
            (self.x * CHUNK_WIDTH as i32) as f32,
            (self.y * CHUNK_HEIGHT as i32) as f32,
            (self.z * CHUNK_DEPTH as i32) as f32,
        )
    }

    /// World-space extent of a chunk.
    pub fn world_extent() -> Vector3<f32> {
        Vector3::new(CHUNK_WIDTH as f32, CHUNK_HEIGHT as f32, CHUNK_DEPTH as f32)
    }
}

impl From<Point3<i32>> for ChunkCoordinate {
    fn from(point: Point3<i32>) -> Self {
        Self::new(point.x, point.y, point.z)
    }
}

impl From<ChunkCoordinate> for Point3<i32> {
    fn from(coordinate: ChunkCoordinate) -> Self {
        Point3::new(coordinate.x, coordinate.y, coordinate.z)
    }
}

impl fmt::Display for ChunkCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Mesh state for one LOD of a chunk.
#[derive(Debug, Default)]
pub struct LodSlot {
    /// Mesh currently installed on the device.
    pub mesh: Option<MeshRecord>,
    /// Staged mesh waiting for the upload pass.
    pub upload: Option<UploadJob>,
}

impl LodSlot {
    /// A slot is satisfied when it has a mesh or one is on its way.
    pub fn is_satisfied(&self) -> bool {
        self.mesh.is_some() || self.upload.is_some()
    }
}

/// A streamed column of voxels.
pub struct Chunk {
    coordinate: ChunkCoordinate,
    grid: OnceLock<VoxelGrid>,
    state: ChunkStateCell,
    slots: Mutex<[LodSlot; LOD_LEVELS]>,
    leases: AtomicUsize,
}

impl Chunk {
    fn new(coordinate: ChunkCoordinate) -> Self {
        Self {
            coordinate,
            grid: OnceLock::new(),
            state: ChunkStateCell::default(),
            slots: Mutex::new(Default::default()),
            leases: AtomicUsize::new(0),
        }
    }

    /// Identity of the chunk.
    pub fn coordinate(&self) -> ChunkCoordinate {
        self.coordinate
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ChunkState {
        self.state.load()
    }

    /// CAS-guarded state change. See [`ChunkStateCell::transition`].
    pub fn transition(&self, from: ChunkState, to: ChunkState) -> Result<(), TransitionError> {
        self.state.transition(from, to)
    }

    /// Voxel grid, once terrain generation finished.
    pub fn grid(&self) -> Option<&VoxelGrid> {
        self.grid.get()
    }

    /// Stores the generated grid and moves `Initial -> TerrainReady`.
    ///
    /// Returns `false` if the grid was already set, leaving the chunk untouched.
    pub fn install_grid(&self, grid: VoxelGrid) -> bool {
        if self.grid.set(grid).is_err() {
            return false;
        }
        self.transition(ChunkState::Initial, ChunkState::TerrainReady)
            .is_ok()
    }

    /// Number of live [`ChunkRef`]s.
    pub fn lease_count(&self) -> usize {
        self.leases.load(Ordering::Acquire)
    }

    /// Locks the per-LOD slots. Main thread only.
    pub fn slots(&self) -> MutexGuard<'_, [LodSlot; LOD_LEVELS]> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether `lod` has an installed mesh or a pending upload.
    pub fn has_lod(&self, lod: u8) -> bool {
        self.slots()
            .get(lod as usize)
            .is_some_and(LodSlot::is_satisfied)
    }

    /// Best mesh to draw when `lod` is wanted: the first installed mesh scanning
    /// from `lod` down to 0, otherwise any installed mesh.
    pub fn best_mesh(&self, lod: u8) -> Option<(u8, MeshRecord)> {
        let slots = self.slots();
        let wanted = (lod as usize).min(LOD_LEVELS - 1);
        (0..=wanted)
            .rev()
            .chain(wanted + 1..LOD_LEVELS)
            .find_map(|level| slots[level].mesh.map(|mesh| (level as u8, mesh)))
    }
}

impl fmt::Debug for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chunk")
            .field("coordinate", &self.coordinate)
            .field("state", &self.state())
            .field("leases", &self.lease_count())
            .finish()
    }
}

/// Counted handle to a [`Chunk`].
///
/// Cloning takes a lease, dropping returns it.
pub struct ChunkRef {
    chunk: Arc<Chunk>,
}

impl ChunkRef {
    /// Creates a chunk in `Initial` state and returns its first (home) lease.
    pub fn create(coordinate: ChunkCoordinate) -> Self {
        let chunk = Arc::new(Chunk::new(coordinate));
        chunk.leases.fetch_add(1, Ordering::AcqRel);
        Self { chunk }
    }

    /// Whether both handles point at the same chunk.
    pub fn ptr_eq(&self, other: &ChunkRef) -> bool {
        Arc::ptr_eq(&self.chunk, &other.chunk)
    }
}

impl Clone for ChunkRef {
    fn clone(&self) -> Self {
        self.chunk.leases.fetch_add(1, Ordering::AcqRel);
        Self {
            chunk: self.chunk.clone(),
        }
    }
}

impl Drop for ChunkRef {
    fn drop(&mut self) {
        self.chunk.leases.fetch_sub(1, Ordering::AcqRel);
    }
}

impl Deref for ChunkRef {
    type Target = Chunk;

    fn deref(&self) -> &Chunk {
        &self.chunk
    }
}

impl fmt::Debug for ChunkRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.chunk.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::rendering::device::BufferId;

    fn record(index_count: u32) -> MeshRecord {
        MeshRecord {
            vertex_buffer: Some(BufferId(1)),
            index_buffer: Some(BufferId(2)),
            index_count,
            opaque_index_count: index_count,
        }
    }

    #[test]
    fn leases_follow_clones_and_drops() {
        let home = ChunkRef::create(ChunkCoordinate::new(0, 0, 0));
        assert_eq!(home.lease_count(), 1);
        let worker = home.clone();
        let draw = worker.clone();
        assert_eq!(home.lease_count(), 3);
        drop(worker);
        drop(draw);
        assert_eq!(home.lease_count(), 1);
    }

    #[test]
    fn grid_installs_once_and_advances_state() {
        let chunk = ChunkRef::create(ChunkCoordinate::new(1, 0, 1));
        assert!(chunk.grid().is_none());
        assert!(chunk.install_grid(VoxelGrid::new(2, 2, 2)));
        assert_eq!(chunk.state(), ChunkState::TerrainReady);
        assert!(!chunk.install_grid(VoxelGrid::new(2, 2, 2)));
    }

    #[test]
    fn best_mesh_scans_down_then_falls_back_upward() {
        let chunk = ChunkRef::create(ChunkCoordinate::default());
        assert_eq!(chunk.best_mesh(0), None);

        chunk.slots()[1].mesh = Some(record(12));
        assert_eq!(chunk.best_mesh(0), Some((1, record(12))));
        assert_eq!(chunk.best_mesh(1), Some((1, record(12))));

        chunk.slots()[0].mesh = Some(record(6));
        assert_eq!(chunk.best_mesh(0), Some((0, record(6))));
        assert_eq!(chunk.best_mesh(1), Some((1, record(12))));
    }

    #[test]
    fn horizontal_distance_ignores_height() {
        let a = ChunkCoordinate::new(0, 0, 0);
        assert_eq!(a.horizontal_distance(ChunkCoordinate::new(3, 9, -2)), 3);
        assert_eq!(a.horizontal_distance(ChunkCoordinate::new(-1, 0, -4)), 4);
        assert_eq!(
            ChunkCoordinate::containing(Point3::new(-0.5, 10.0, 33.0)),
            ChunkCoordinate::new(-1, 0, 1)
        );
    }

    #[test]
    fn ordering_is_lexicographic() {
        let mut coordinates = vec![
            ChunkCoordinate::new(1, 0, 0),
            ChunkCoordinate::new(0, 0, 5),
            ChunkCoordinate::new(0, 0, -1),
        ];
        coordinates.sort();
        assert_eq!(
            coordinates,
            vec![
                ChunkCoordinate::new(0, 0, -1),
                ChunkCoordinate::new(0, 0, 5),
                ChunkCoordinate::new(1, 0, 0),
            ]
        );
    }
}

//! Task for meshing one chunk LOD in a background thread.
//!
//! The task resolves its chunk through the active map when it starts, so a chunk
//! that was unloaded while the job waited in the queue is simply dropped. It then
//! claims the chunk with a `ready -> Meshing` CAS, builds the mesh, stages it in
//! the arena and moves the chunk to `StagingReady`. If staging fails the chunk
//! is rolled back to the ready state it came from and the key is retried on a
//! later scheduling pass.

use std::{collections::HashMap, sync::Arc};

use web_time::Instant;

use crate::{
    core::{CancellationToken, MtResource},
    engine_state::{
        rendering::{meshing::MeshData, staging::StagingArena, upload::UploadJob},
        scheduler::{job_queue::JobKey, CompletionContext},
        task_management::task::{Task, TaskResult},
        voxels::chunk::{state::ChunkState, ChunkCoordinate, ChunkRef},
    },
};

/// Builds and stages the mesh for one [`JobKey`].
pub struct ChunkMeshGenerationTask {
    key: JobKey,
    active: MtResource<HashMap<ChunkCoordinate, ChunkRef>>,
    arena: Arc<StagingArena>,
}

impl ChunkMeshGenerationTask {
    /// Creates a new chunk mesh generation task.
    ///
    /// # Arguments
    /// * `key` - Chunk and LOD to mesh
    /// * `active` - The active chunk map, used to resolve the chunk when the task runs
    /// * `arena` - Staging arena receiving the mesh bytes
    pub fn new(
        key: JobKey,
        active: MtResource<HashMap<ChunkCoordinate, ChunkRef>>,
        arena: Arc<StagingArena>,
    ) -> Self {
        Self { key, active, arena }
    }

    fn finish(&self, outcome: MeshOutcome) -> Box<dyn TaskResult> {
        Box::new(ChunkMeshGenerationTaskResult {
            key: self.key,
            outcome,
        })
    }
}

impl Task for ChunkMeshGenerationTask {
    fn process(self: Box<Self>, cancel: &CancellationToken) -> Box<dyn TaskResult> {
        let key = self.key;
        let chunk = self.active.get().get(&key.coordinate).cloned();
        let Some(chunk) = chunk else {
            return self.finish(MeshOutcome::Dropped);
        };
        if cancel.is_cancelled() {
            return self.finish(MeshOutcome::Skipped);
        }

        let previous = chunk.state();
        if !previous.is_ready() || chunk.transition(previous, ChunkState::Meshing).is_err() {
            return self.finish(MeshOutcome::Skipped);
        }
        let Some(grid) = chunk.grid() else {
            roll_back(&chunk, previous);
            return self.finish(MeshOutcome::Skipped);
        };

        let start = Instant::now();
        let mesh = MeshData::build(grid, key.lod);
        log::debug!(
            "Meshed chunk {} at LOD {} ({} quads) in {:?}",
            key.coordinate,
            key.lod,
            mesh.quad_count,
            start.elapsed()
        );

        match UploadJob::stage(&self.arena, &mesh, key.lod, cancel) {
            Ok(upload) => match chunk.transition(ChunkState::Meshing, ChunkState::StagingReady) {
                Ok(()) => self.finish(MeshOutcome::Staged { chunk, upload }),
                Err(err) => {
                    log::error!("chunk {} lost its meshing claim: {err}", key.coordinate);
                    self.finish(MeshOutcome::Skipped)
                }
            },
            Err(err) => {
                log::warn!(
                    "Staging chunk {} at LOD {} failed: {err}",
                    key.coordinate,
                    key.lod
                );
                roll_back(&chunk, previous);
                self.finish(MeshOutcome::Skipped)
            }
        }
    }
}

/// Returns a claimed chunk to the ready state it was meshed from.
fn roll_back(chunk: &ChunkRef, previous: ChunkState) -> bool {
    match chunk.transition(ChunkState::Meshing, previous) {
        Ok(()) => true,
        Err(err) => {
            log::error!(
                "chunk {} could not return to {previous:?}: {err}",
                chunk.coordinate()
            );
            false
        }
    }
}

/// What a mesh task ended with.
pub enum MeshOutcome {
    /// Mesh staged; the chunk is `StagingReady`.
    Staged {
        /// Lease kept until the upload pass
        chunk: ChunkRef,
        /// Staged mesh
        upload: UploadJob,
    },
    /// No work done; the chunk is back in (or never left) its ready state.
    Skipped,
    /// The chunk left the active map before the task ran.
    Dropped,
}

/// The result of a chunk mesh generation task.
pub struct ChunkMeshGenerationTaskResult {
    key: JobKey,
    outcome: MeshOutcome,
}

impl TaskResult for ChunkMeshGenerationTaskResult {
    fn handle_result(self: Box<Self>, context: &mut CompletionContext<'_>) {
        let ChunkMeshGenerationTaskResult { key, outcome } = *self;
        context.jobs.complete(key);

        match outcome {
            MeshOutcome::Staged { chunk, upload } => {
                match chunk.slots().get_mut(key.lod as usize) {
                    Some(slot) => slot.upload = Some(upload),
                    None => log::error!("no LOD slot {} on chunk {}", key.lod, key.coordinate),
                }
                context.upload_queue.push_back(chunk);
                context.counters.meshes_staged += 1;
            }
            MeshOutcome::Skipped => context.counters.jobs_skipped += 1,
            MeshOutcome::Dropped => {
                log::debug!("Dropped mesh job for unloaded chunk {}", key.coordinate);
                context.counters.jobs_dropped += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::{grid::VoxelGrid, material::Material};

    fn active_with(chunk: &ChunkRef) -> MtResource<HashMap<ChunkCoordinate, ChunkRef>> {
        let active = MtResource::new(HashMap::new());
        active.get_mut().insert(chunk.coordinate(), chunk.clone());
        active
    }

    fn terrain_ready(coordinate: ChunkCoordinate) -> ChunkRef {
        let chunk = ChunkRef::create(coordinate);
        let grid = VoxelGrid::from_fn(4, 4, 4, |_, y, _| {
            if y < 2 {
                Material::Stone.id()
            } else {
                0
            }
        });
        assert!(chunk.install_grid(grid));
        chunk
    }

    #[test]
    fn stages_the_mesh_and_advances_the_chunk() {
        let chunk = terrain_ready(ChunkCoordinate::new(0, 0, 0));
        let arena = Arc::new(StagingArena::new(1 << 16, 256));
        let task = Box::new(ChunkMeshGenerationTask::new(
            JobKey::new(chunk.coordinate(), 0),
            active_with(&chunk),
            arena.clone(),
        ));
        let result = task.process(&CancellationToken::new());
        assert_eq!(chunk.state(), ChunkState::StagingReady);
        assert_eq!(arena.live_regions(), 1);
        drop(result);
        assert_eq!(arena.retire_signaled(), 1);
    }

    #[test]
    fn staging_failure_rolls_back() {
        let chunk = terrain_ready(ChunkCoordinate::new(0, 0, 0));
        let arena = Arc::new(StagingArena::new(256, 256));
        let task = Box::new(ChunkMeshGenerationTask::new(
            JobKey::new(chunk.coordinate(), 0),
            active_with(&chunk),
            arena,
        ));
        let _result = task.process(&CancellationToken::new());
        assert_eq!(chunk.state(), ChunkState::TerrainReady);
    }

    #[test]
    fn roll_back_only_releases_a_meshing_claim() {
        let chunk = terrain_ready(ChunkCoordinate::new(0, 0, 0));
        assert!(!roll_back(&chunk, ChunkState::TerrainReady));
        assert_eq!(chunk.state(), ChunkState::TerrainReady);

        chunk
            .transition(ChunkState::TerrainReady, ChunkState::Meshing)
            .expect("meshing");
        assert!(roll_back(&chunk, ChunkState::TerrainReady));
        assert_eq!(chunk.state(), ChunkState::TerrainReady);
    }

    #[test]
    fn missing_chunk_is_dropped_without_side_effects() {
        let arena = Arc::new(StagingArena::new(1024, 256));
        let task = Box::new(ChunkMeshGenerationTask::new(
            JobKey::new(ChunkCoordinate::new(7, 0, 7), 1),
            MtResource::new(HashMap::new()),
            arena.clone(),
        ));
        let _result = task.process(&CancellationToken::new());
        assert_eq!(arena.live_regions(), 0);
    }
}

//! # Chunk Generation Task
//!
//! Fills a freshly created chunk with terrain on a worker thread. The scheduler
//! publishes one of these for every chunk entering the render radius.

use std::sync::Arc;

use web_time::Instant;

use crate::{
    core::CancellationToken,
    engine_state::{
        scheduler::CompletionContext,
        task_management::task::{Task, TaskResult},
        voxels::{
            chunk::{ChunkCoordinate, ChunkRef},
            terrain::TerrainGenerator,
        },
    },
};

/// Generates the voxel grid of one chunk and moves it to `TerrainReady`.
pub struct ChunkGenerationTask {
    /// Lease on the chunk to fill
    chunk: ChunkRef,
    /// Shared noise generator
    generator: Arc<TerrainGenerator>,
}

impl ChunkGenerationTask {
    /// Creates a new chunk generation task.
    ///
    /// # Arguments
    /// * `chunk` - Lease on a chunk in `Initial` state
    /// * `generator` - The terrain generator shared by all workers
    pub fn new(chunk: ChunkRef, generator: Arc<TerrainGenerator>) -> Self {
        Self { chunk, generator }
    }
}

impl Task for ChunkGenerationTask {
    fn process(self: Box<Self>, cancel: &CancellationToken) -> Box<dyn TaskResult> {
        let coordinate = self.chunk.coordinate();
        if cancel.is_cancelled() {
            return Box::new(ChunkGenerationTaskResult {
                coordinate,
                generated: false,
            });
        }

        let start = Instant::now();
        let grid = self.generator.generate(coordinate);
        let solid = grid.solid_count();
        let generated = self.chunk.install_grid(grid);
        log::debug!(
            "Generated chunk {coordinate} ({solid} solid voxels) in {:?}",
            start.elapsed()
        );

        Box::new(ChunkGenerationTaskResult {
            coordinate,
            generated,
        })
    }
}

/// The result of a chunk generation task.
pub struct ChunkGenerationTaskResult {
    coordinate: ChunkCoordinate,
    generated: bool,
}

impl TaskResult for ChunkGenerationTaskResult {
    fn handle_result(self: Box<Self>, context: &mut CompletionContext<'_>) {
        if self.generated {
            context.counters.terrain_generated += 1;
        } else {
            log::debug!("Terrain for chunk {} was not installed", self.coordinate);
        }
    }
}

//! # Chunk Scheduler
//!
//! Drives the chunk pipeline once per frame from the main thread. A tick runs
//! these passes in order:
//!
//! 1. **drain**: apply finished task results (job bookkeeping, staged uploads)
//! 2. **unload**: move chunks beyond the render radius to the garbage list
//! 3. **collect**: free garbage chunks nothing else holds
//! 4. **load**: create missing chunks in the radius, nearest first, and publish
//!    their terrain tasks
//! 5. **request**: queue mesh jobs for ready chunks missing their required LOD
//! 6. **submit**: hand pending jobs to the pool up to the admission cap
//! 7. **upload**: copy a bounded number of staged meshes to the device
//! 8. **reclaim**: poll the device, retire arena regions, destroy old buffers
//!
//! Every pass is public so tests and embedders can drive them one at a time.
//! Nothing here blocks on a worker or on the device.

pub mod admission;
pub mod job_queue;
pub mod reclaim;

use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
    thread,
    time::Duration,
};

use cgmath::Point3;
use serde::Serialize;

use crate::{
    config::PipelineConfig,
    core::{Fence, MtResource},
    engine_state::{
        rendering::{
            device::UploadDevice,
            draw_list::{DrawList, ViewFrustum},
            staging::StagingArena,
            tasks::chunk_mesh_generation_task::ChunkMeshGenerationTask,
        },
        task_management::TaskManager,
        voxels::{
            chunk::{state::ChunkState, Chunk, ChunkCoordinate, ChunkRef, LOD_LEVELS},
            tasks::chunk_generation_task::ChunkGenerationTask,
            terrain::TerrainGenerator,
        },
    },
};

use admission::{AdmissionControl, FrameTimeAverage};
use job_queue::{JobBook, JobKey};
use reclaim::DeferredDestroyQueue;

/// Every LOD a chunk can have a job for.
const ALL_LODS: [u8; LOD_LEVELS] = [0, 1];

/// Reclaim rounds attempted while shutting down before giving up on the device.
const SHUTDOWN_POLLS: usize = 200;

/// Main-thread state a [`TaskResult`](crate::engine_state::task_management::task::TaskResult)
/// may touch while it is handled.
pub struct CompletionContext<'a> {
    /// Pending and in-progress mesh jobs
    pub jobs: &'a JobBook,
    /// Chunks whose staged meshes wait for the upload pass
    pub upload_queue: &'a mut VecDeque<ChunkRef>,
    /// Running totals
    pub counters: &'a mut PipelineCounters,
}

/// Totals since the scheduler started.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PipelineCounters {
    /// Terrain grids installed
    pub terrain_generated: u64,
    /// Meshes staged by workers
    pub meshes_staged: u64,
    /// Mesh jobs that found their chunk busy or failed to stage
    pub jobs_skipped: u64,
    /// Mesh jobs whose chunk was unloaded before they ran
    pub jobs_dropped: u64,
    /// Chunks that went through the upload pass
    pub chunks_uploaded: u64,
    /// Chunks freed by the garbage collector
    pub chunks_collected: u64,
}

/// Snapshot of the pipeline after a tick.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
pub struct PipelineStats {
    /// Ticks so far
    pub frame: u64,
    /// Chunks in the active map
    pub active_chunks: usize,
    /// Chunks waiting for collection
    pub garbage_chunks: usize,
    /// Mesh jobs waiting for a slot
    pub pending_jobs: usize,
    /// Mesh jobs handed to the pool
    pub in_progress_jobs: usize,
    /// Admission cap used by the last submit pass
    pub job_cap: usize,
    /// Smoothed frame time, if any frame was recorded
    pub smoothed_frame_ms: Option<f64>,
    /// Chunks uploaded by the last tick
    pub uploads_this_frame: usize,
    /// Chunks freed by the last tick
    pub chunks_collected: usize,
    /// Staging bytes not yet retired
    pub staging_bytes_in_flight: u64,
    /// Device buffers waiting for their fence
    pub buffers_pending_destruction: usize,
    /// Bytes held by live device buffers
    pub device_bytes: u64,
    /// Bytes of live device buffers filled by uploads
    pub device_bytes_used: u64,
    /// Running totals
    pub totals: PipelineCounters,
}

/// Owns the chunk sets, the job book and the worker pool.
pub struct ChunkScheduler {
    config: PipelineConfig,
    active: MtResource<HashMap<ChunkCoordinate, ChunkRef>>,
    garbage: Vec<ChunkRef>,
    jobs: JobBook,
    upload_queue: VecDeque<ChunkRef>,
    frame_time: FrameTimeAverage,
    admission: AdmissionControl,
    destroy_queue: DeferredDestroyQueue,
    terrain: Arc<TerrainGenerator>,
    arena: Arc<StagingArena>,
    task_manager: TaskManager,
    viewer: ChunkCoordinate,
    counters: PipelineCounters,
    frame: u64,
    job_cap: usize,
    uploads_this_frame: usize,
    collected_this_frame: usize,
}

impl ChunkScheduler {
    /// Builds the arena, the terrain generator and a worker pool sized for this machine.
    pub fn new(config: PipelineConfig) -> Self {
        let workers = TaskManager::worker_count(config.worker_reserve);
        Self::with_workers(config, workers)
    }

    /// Like [`ChunkScheduler::new`] with an explicit worker count.
    pub fn with_workers(config: PipelineConfig, workers: usize) -> Self {
        let arena = Arc::new(StagingArena::new(
            config.staging_capacity,
            config.staging_alignment,
        ));
        let terrain = Arc::new(TerrainGenerator::new(config.terrain_seed));
        log::info!(
            "Chunk scheduler: radius {}, LOD 0 within {}, staging {} KiB",
            config.render_radius,
            config.lod0_distance,
            config.staging_capacity / 1024
        );

        Self {
            frame_time: FrameTimeAverage::new(config.frame_time_smoothing),
            admission: AdmissionControl::from_config(&config),
            job_cap: config.base_job_cap,
            config,
            active: MtResource::default(),
            garbage: Vec::new(),
            jobs: JobBook::new(),
            upload_queue: VecDeque::new(),
            destroy_queue: DeferredDestroyQueue::new(),
            terrain,
            arena,
            task_manager: TaskManager::new(workers),
            viewer: ChunkCoordinate::default(),
            counters: PipelineCounters::default(),
            frame: 0,
            uploads_this_frame: 0,
            collected_this_frame: 0,
        }
    }

    /// Runs one frame of the pipeline.
    ///
    /// `frame_ms` is the duration of the previous frame and feeds admission control.
    pub fn tick(
        &mut self,
        viewer: Point3<f32>,
        frame_ms: f64,
        device: &mut dyn UploadDevice,
    ) -> PipelineStats {
        self.frame += 1;
        self.frame_time.record(frame_ms);
        self.set_viewer(viewer);

        self.drain_completed();
        self.unload();
        self.collected_this_frame = self.collect_garbage(device);
        self.load();
        self.request_meshes();
        self.submit_jobs();
        self.uploads_this_frame = self.upload(device);
        self.reclaim(device);

        self.stats(device)
    }

    /// Moves the viewer; the next passes measure distances from its chunk.
    pub fn set_viewer(&mut self, viewer: Point3<f32>) {
        self.viewer = ChunkCoordinate::containing(viewer);
    }

    /// Applies every task result that arrived since the last call.
    pub fn drain_completed(&mut self) -> usize {
        let results = self.task_manager.drain_completed();
        let handled = results.len();
        let mut context = CompletionContext {
            jobs: &self.jobs,
            upload_queue: &mut self.upload_queue,
            counters: &mut self.counters,
        };
        for result in results {
            result.handle_result(&mut context);
        }
        handled
    }

    /// Moves chunks beyond the render radius to the garbage list and forgets
    /// their pending jobs.
    pub fn unload(&mut self) -> usize {
        let radius = self.config.render_radius;
        let viewer = self.viewer;
        let unloaded = {
            let mut active = self.active.get_mut();
            let leaving: Vec<_> = active
                .keys()
                .copied()
                .filter(|coordinate| coordinate.horizontal_distance(viewer) > radius)
                .collect();
            let unloaded = leaving.len();
            for coordinate in leaving {
                if let Some(chunk) = active.remove(&coordinate) {
                    self.garbage.push(chunk);
                }
            }
            unloaded
        };

        if unloaded > 0 {
            let active = self.active.get();
            self.jobs
                .retain_pending(|key| active.contains_key(&key.coordinate));
            log::debug!("Unloaded {unloaded} chunks");
        }
        unloaded
    }

    /// Frees every garbage chunk that is held only by the garbage list, sits in
    /// a settled state and has no job in progress. Returns the number freed.
    pub fn collect_garbage(&mut self, device: &dyn UploadDevice) -> usize {
        let jobs = &self.jobs;
        let destroy_queue = &mut self.destroy_queue;
        let before = self.garbage.len();
        self.garbage.retain(|chunk| {
            if !is_collectable(chunk, jobs) {
                return true;
            }
            release_chunk(chunk, device.last_submission(), destroy_queue);
            false
        });

        let collected = before - self.garbage.len();
        if collected > 0 {
            log::debug!("Collected {collected} chunks");
        }
        self.counters.chunks_collected += collected as u64;
        collected
    }

    /// Makes every coordinate in the render radius active, nearest first.
    ///
    /// Chunks still on the garbage list are moved back; new ones start `Initial`
    /// and get their terrain task published immediately.
    pub fn load(&mut self) -> usize {
        let radius = self.config.render_radius;
        let viewer = self.viewer;
        let mut active = self.active.get_mut();

        let mut missing: Vec<_> = (-radius..=radius)
            .flat_map(|dx| {
                (-radius..=radius).map(move |dz| ChunkCoordinate::new(viewer.x + dx, 0, viewer.z + dz))
            })
            .filter(|coordinate| !active.contains_key(coordinate))
            .collect();
        missing.sort_by_key(|coordinate| (coordinate.horizontal_distance(viewer), *coordinate));

        for &coordinate in &missing {
            let resurrected = self
                .garbage
                .iter()
                .position(|chunk| chunk.coordinate() == coordinate)
                .map(|index| self.garbage.swap_remove(index));
            let chunk = match resurrected {
                Some(chunk) => chunk,
                None => {
                    let chunk = ChunkRef::create(coordinate);
                    self.task_manager.publish_task(Box::new(ChunkGenerationTask::new(
                        chunk.clone(),
                        self.terrain.clone(),
                    )));
                    chunk
                }
            };
            active.insert(coordinate, chunk);
        }
        missing.len()
    }

    /// LOD a chunk should be meshed at next.
    ///
    /// Every chunk gets the coarse LOD first so something is drawable quickly;
    /// after that chunks near the viewer ask for full detail.
    pub fn required_lod(&self, chunk: &Chunk) -> u8 {
        if !chunk.has_lod(1) {
            return 1;
        }
        self.preferred_lod(chunk.coordinate())
    }

    /// LOD matching the chunk's distance to the viewer.
    pub fn preferred_lod(&self, coordinate: ChunkCoordinate) -> u8 {
        if coordinate.horizontal_distance(self.viewer) <= self.config.lod0_distance {
            0
        } else {
            1
        }
    }

    /// Queues jobs for ready chunks whose required LOD has no mesh and no upload.
    pub fn request_meshes(&mut self) -> usize {
        let active = self.active.get();
        let mut requested = 0;
        for (&coordinate, chunk) in active.iter() {
            if !chunk.state().is_ready() {
                continue;
            }
            let lod = self.required_lod(chunk);
            if !chunk.has_lod(lod) && self.jobs.request(JobKey::new(coordinate, lod)) {
                requested += 1;
            }
        }
        requested
    }

    /// Publishes pending jobs in priority order while fewer than the admission
    /// cap are in progress.
    pub fn submit_jobs(&mut self) -> usize {
        self.job_cap = self.admission.cap(self.frame_time.average_ms());
        let submitted = self.jobs.submit_up_to(self.job_cap);
        for &key in &submitted {
            let task =
                ChunkMeshGenerationTask::new(key, self.active.clone(), self.arena.clone());
            if !self.task_manager.publish_task(Box::new(task)) {
                self.jobs.complete(key);
            }
        }
        submitted.len()
    }

    /// Uploads up to `upload_quota` staged chunks and marks them `GpuReady`.
    ///
    /// Meshes replaced by the upload are parked until the device finished the
    /// work submitted so far.
    pub fn upload(&mut self, device: &mut dyn UploadDevice) -> usize {
        let mut uploaded = 0;
        while uploaded < self.config.upload_quota {
            let Some(chunk) = self.upload_queue.pop_front() else {
                break;
            };
            if let Err(err) = chunk.transition(ChunkState::StagingReady, ChunkState::Uploading) {
                log::error!("chunk {} cannot be uploaded: {err}", chunk.coordinate());
                for slot in chunk.slots().iter_mut() {
                    slot.upload = None;
                }
                continue;
            }

            let mut replaced = Vec::new();
            {
                let mut slots = chunk.slots();
                for slot in slots.iter_mut() {
                    let Some(job) = slot.upload.take() else {
                        continue;
                    };
                    let record = job.upload(device, &self.arena);
                    if let Some(old) = slot.mesh.replace(record) {
                        replaced.extend(old.buffers());
                    }
                }
            }
            self.destroy_queue.push(device.last_submission(), replaced);

            if let Err(err) = chunk.transition(ChunkState::Uploading, ChunkState::GpuReady) {
                log::error!("chunk {} left Uploading early: {err}", chunk.coordinate());
            }
            uploaded += 1;
        }
        self.counters.chunks_uploaded += uploaded as u64;
        uploaded
    }

    /// Polls the device and frees whatever it finished with.
    pub fn reclaim(&mut self, device: &mut dyn UploadDevice) -> usize {
        device.poll();
        self.arena.retire_signaled();
        self.destroy_queue.collect(device)
    }

    /// `GpuReady` chunks visible through `frustum`, at the LOD their distance asks for.
    pub fn draw_list(&self, frustum: &dyn ViewFrustum) -> DrawList {
        DrawList::build(&self.active.get(), frustum, |coordinate| {
            self.preferred_lod(coordinate)
        })
    }

    /// Current statistics.
    pub fn stats(&self, device: &dyn UploadDevice) -> PipelineStats {
        PipelineStats {
            frame: self.frame,
            active_chunks: self.active.get().len(),
            garbage_chunks: self.garbage.len(),
            pending_jobs: self.jobs.pending_len(),
            in_progress_jobs: self.jobs.in_progress_len(),
            job_cap: self.job_cap,
            smoothed_frame_ms: self.frame_time.average_ms(),
            uploads_this_frame: self.uploads_this_frame,
            chunks_collected: self.collected_this_frame,
            staging_bytes_in_flight: self.arena.bytes_in_flight(),
            buffers_pending_destruction: self.destroy_queue.pending_buffers(),
            device_bytes: device.allocated_bytes(),
            device_bytes_used: device.used_bytes(),
            totals: self.counters,
        }
    }

    /// Handle to the active chunk at `coordinate`.
    pub fn chunk(&self, coordinate: ChunkCoordinate) -> Option<ChunkRef> {
        self.active.get().get(&coordinate).cloned()
    }

    /// Whether a chunk at `coordinate` waits on the garbage list.
    pub fn is_garbage(&self, coordinate: ChunkCoordinate) -> bool {
        self.garbage
            .iter()
            .any(|chunk| chunk.coordinate() == coordinate)
    }

    /// Number of active chunks.
    pub fn active_len(&self) -> usize {
        self.active.get().len()
    }

    /// Number of garbage chunks.
    pub fn garbage_len(&self) -> usize {
        self.garbage.len()
    }

    /// The job book.
    pub fn jobs(&self) -> &JobBook {
        &self.jobs
    }

    /// The staging arena shared with mesh tasks.
    pub fn arena(&self) -> &StagingArena {
        &self.arena
    }

    /// The configuration this scheduler runs with.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Chunk the viewer is in.
    pub fn viewer(&self) -> ChunkCoordinate {
        self.viewer
    }

    /// Running totals.
    pub fn counters(&self) -> PipelineCounters {
        self.counters
    }

    /// Stops the pool and releases every chunk and device buffer.
    pub fn shutdown(&mut self, device: &mut dyn UploadDevice) {
        self.task_manager.shutdown();
        self.drain_completed();

        let fence = device.last_submission();
        let chunks: Vec<ChunkRef> = self
            .active
            .get_mut()
            .drain()
            .map(|(_, chunk)| chunk)
            .chain(self.garbage.drain(..))
            .chain(self.upload_queue.drain(..))
            .collect();
        for chunk in &chunks {
            release_chunk(chunk, fence.clone(), &mut self.destroy_queue);
        }
        drop(chunks);

        for _ in 0..SHUTDOWN_POLLS {
            self.reclaim(device);
            if self.destroy_queue.pending_buffers() == 0 {
                break;
            }
            thread::sleep(Duration::from_millis(1));
        }
        let leaked = self.destroy_queue.pending_buffers();
        if leaked > 0 {
            log::warn!("{leaked} device buffers still in use at shutdown");
        }
        log::info!("Chunk scheduler stopped after {} frames", self.frame);
    }
}

fn is_collectable(chunk: &ChunkRef, jobs: &JobBook) -> bool {
    chunk.lease_count() == 1
        && matches!(
            chunk.state(),
            ChunkState::GpuReady | ChunkState::TerrainReady
        )
        && !jobs.any_in_progress(chunk.coordinate(), &ALL_LODS)
}

/// Parks a chunk's meshes for deferred destruction and drops its staged uploads.
fn release_chunk(chunk: &Chunk, fence: Fence, destroy_queue: &mut DeferredDestroyQueue) {
    let mut slots = chunk.slots();
    let mut buffers = Vec::new();
    for slot in slots.iter_mut() {
        if let Some(mesh) = slot.mesh.take() {
            buffers.extend(mesh.buffers());
        }
        slot.upload = None;
    }
    destroy_queue.push(fence, buffers);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::CancellationToken,
        engine_state::{
            rendering::{
                device::{BufferKind, MeshRecord},
                host_device::HostDevice,
                meshing::MeshData,
                upload::UploadJob,
            },
            voxels::{grid::VoxelGrid, material::Material},
        },
    };

    fn scheduler(radius: i32) -> ChunkScheduler {
        let config = PipelineConfig {
            render_radius: radius,
            lod0_distance: 1.min(radius),
            staging_capacity: 1 << 16,
            ..PipelineConfig::default()
        };
        ChunkScheduler::with_workers(config, 1)
    }

    fn terrain_ready(x: i32, z: i32) -> ChunkRef {
        let chunk = ChunkRef::create(ChunkCoordinate::new(x, 0, z));
        assert!(chunk.install_grid(VoxelGrid::new(2, 2, 2)));
        chunk
    }

    #[test]
    fn coarse_lod_comes_first_then_distance_decides() {
        let scheduler = scheduler(4);
        let near = terrain_ready(1, 0);
        let far = terrain_ready(3, 3);
        assert_eq!(scheduler.required_lod(&near), 1);
        assert_eq!(scheduler.required_lod(&far), 1);

        for chunk in [&near, &far] {
            chunk.slots()[1].mesh = Some(MeshRecord::empty());
        }
        assert_eq!(scheduler.required_lod(&near), 0);
        assert_eq!(scheduler.required_lod(&far), 1);
    }

    #[test]
    fn unload_moves_distant_chunks_and_prunes_their_jobs() {
        let mut scheduler = scheduler(2);
        for x in [0, 5] {
            let chunk = terrain_ready(x, 0);
            scheduler.active.get_mut().insert(chunk.coordinate(), chunk);
            scheduler
                .jobs
                .request(JobKey::new(ChunkCoordinate::new(x, 0, 0), 1));
        }

        assert_eq!(scheduler.unload(), 1);
        assert!(scheduler.is_garbage(ChunkCoordinate::new(5, 0, 0)));
        assert!(!scheduler
            .jobs
            .is_pending(JobKey::new(ChunkCoordinate::new(5, 0, 0), 1)));
        assert!(scheduler
            .jobs
            .is_pending(JobKey::new(ChunkCoordinate::new(0, 0, 0), 1)));
    }

    #[test]
    fn garbage_waits_for_leases_and_jobs() {
        let mut scheduler = scheduler(1);
        let device = HostDevice::new();
        let coordinate = ChunkCoordinate::new(9, 0, 9);
        let chunk = terrain_ready(coordinate.x, coordinate.z);
        let lease = chunk.clone();
        scheduler.garbage.push(chunk);

        assert_eq!(scheduler.collect_garbage(&device), 0);
        drop(lease);

        let key = JobKey::new(coordinate, 0);
        scheduler.jobs.request(key);
        scheduler.jobs.submit_up_to(1);
        assert_eq!(scheduler.collect_garbage(&device), 0);

        scheduler.jobs.complete(key);
        assert_eq!(scheduler.collect_garbage(&device), 1);
        assert_eq!(scheduler.garbage_len(), 0);
    }

    #[test]
    fn unsettled_chunks_are_not_collected() {
        let mut scheduler = scheduler(1);
        let device = HostDevice::new();
        scheduler.garbage.push(ChunkRef::create(ChunkCoordinate::new(7, 0, 7)));
        assert_eq!(scheduler.collect_garbage(&device), 0);
    }

    #[test]
    fn collected_meshes_are_destroyed_after_their_fence() {
        let mut scheduler = scheduler(1);
        let mut device = HostDevice::new();
        let chunk = terrain_ready(9, 9);
        let record = MeshRecord {
            vertex_buffer: Some(device.create_buffer(BufferKind::Vertex, 64)),
            index_buffer: Some(device.create_buffer(BufferKind::Index, 32)),
            index_count: 12,
            opaque_index_count: 12,
        };
        chunk.slots()[0].mesh = Some(record);
        scheduler.garbage.push(chunk);

        assert_eq!(scheduler.collect_garbage(&device), 1);
        scheduler.reclaim(&mut device);
        assert_eq!(device.live_buffers(), 0);
    }

    fn submit_with_frame_time(frame_ms: f64, pending: usize) -> (usize, usize, usize) {
        let mut scheduler = scheduler(1);
        for x in 0..pending as i32 {
            assert!(scheduler
                .jobs
                .request(JobKey::new(ChunkCoordinate::new(x, 0, 20), 1)));
        }
        for _ in 0..10 {
            scheduler.frame_time.record(frame_ms);
        }

        let submitted = scheduler.submit_jobs();
        assert_eq!(submitted, scheduler.jobs.in_progress_len());
        let result = (
            scheduler.job_cap,
            scheduler.jobs.in_progress_len(),
            scheduler.jobs.pending_len(),
        );
        scheduler.shutdown(&mut HostDevice::new());
        result
    }

    #[test]
    fn submit_pass_admits_min_of_pending_and_frame_time_cap() {
        let config = PipelineConfig::default();
        let pending = 5;

        let (cap, in_progress, left) = submit_with_frame_time(30.0, pending);
        assert_eq!(cap, config.base_job_cap);
        assert_eq!(in_progress, pending.min(cap));
        assert_eq!(left, pending - pending.min(cap));

        let (cap, in_progress, left) = submit_with_frame_time(2.0, pending);
        assert_eq!(cap, config.burst_job_cap);
        assert_eq!(in_progress, pending.min(cap));
        assert_eq!(left, pending - pending.min(cap));
    }

    #[test]
    fn failed_upload_claim_releases_the_staged_region() {
        let mut scheduler = scheduler(1);
        let mut device = HostDevice::new();
        let chunk = ChunkRef::create(ChunkCoordinate::new(0, 0, 0));
        let grid = VoxelGrid::from_fn(4, 4, 4, |_, y, _| {
            if y < 2 {
                Material::Stone.id()
            } else {
                0
            }
        });
        let mesh = MeshData::build(&grid, 0);
        assert!(chunk.install_grid(grid));
        let upload = UploadJob::stage(&scheduler.arena, &mesh, 0, &CancellationToken::new())
            .expect("staged");
        chunk.slots()[0].upload = Some(upload);
        assert_eq!(scheduler.arena.live_regions(), 1);

        scheduler.upload_queue.push_back(chunk.clone());
        assert_eq!(scheduler.upload(&mut device), 0);
        assert!(chunk.slots()[0].upload.is_none());
        assert_eq!(chunk.state(), ChunkState::TerrainReady);
        assert_eq!(scheduler.arena.retire_signaled(), 1);
        assert_eq!(scheduler.arena.live_regions(), 0);
        scheduler.shutdown(&mut device);
    }

    #[test]
    fn load_resurrects_garbage_instead_of_regenerating() {
        let mut scheduler = scheduler(1);
        let chunk = terrain_ready(1, 1);
        scheduler.garbage.push(chunk);

        assert_eq!(scheduler.load(), 9);
        assert_eq!(scheduler.garbage_len(), 0);
        let resurrected = scheduler
            .chunk(ChunkCoordinate::new(1, 0, 1))
            .map(|chunk| chunk.state());
        assert_eq!(resurrected, Some(ChunkState::TerrainReady));
        scheduler.shutdown(&mut HostDevice::new());
    }
}

//! End-to-end runs of the scheduler against the host-memory device.

use std::{
    thread,
    time::{Duration, Instant},
};

use cgmath::Point3;
use chunk_pipeline::{
    config::PipelineConfig,
    engine_state::{
        rendering::{draw_list::AllVisible, HostDevice},
        scheduler::ChunkScheduler,
        voxels::{
            chunk::{state::ChunkState, ChunkCoordinate},
            grid::CHUNK_WIDTH,
        },
    },
};

const DEADLINE: Duration = Duration::from_secs(120);

fn config() -> PipelineConfig {
    PipelineConfig {
        render_radius: 1,
        lod0_distance: 0,
        upload_quota: 2,
        ..PipelineConfig::default()
    }
}

fn coordinates_around(center: ChunkCoordinate, radius: i32) -> Vec<ChunkCoordinate> {
    (-radius..=radius)
        .flat_map(|dx| {
            (-radius..=radius).map(move |dz| ChunkCoordinate::new(center.x + dx, 0, center.z + dz))
        })
        .collect()
}

fn fully_meshed(scheduler: &ChunkScheduler, coordinate: ChunkCoordinate) -> bool {
    let Some(chunk) = scheduler.chunk(coordinate) else {
        return false;
    };
    if chunk.state() != ChunkState::GpuReady {
        return false;
    }
    let wanted_lod = scheduler.preferred_lod(coordinate) as usize;
    let slots = chunk.slots();
    slots[1].mesh.is_some() && slots[wanted_lod].mesh.is_some()
}

/// Ticks until every chunk around `viewer` is meshed at its preferred LOD and
/// the garbage list is empty.
fn run_until_settled(
    scheduler: &mut ChunkScheduler,
    device: &mut HostDevice,
    viewer: Point3<f32>,
) -> u64 {
    let start = Instant::now();
    let mut frames = 0;
    loop {
        frames += 1;
        scheduler.tick(viewer, 16.0, device);
        let radius = scheduler.config().render_radius;
        let settled = coordinates_around(scheduler.viewer(), radius)
            .into_iter()
            .all(|coordinate| fully_meshed(scheduler, coordinate))
            && scheduler.garbage_len() == 0
            && scheduler.jobs().in_progress_len() == 0;
        if settled {
            return frames;
        }
        assert!(start.elapsed() < DEADLINE, "pipeline did not settle");
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn chunks_reach_gpu_ready_with_their_lods() {
    let mut scheduler = ChunkScheduler::with_workers(config(), 2);
    let mut device = HostDevice::new();
    let viewer = Point3::new(8.0, 80.0, 8.0);

    run_until_settled(&mut scheduler, &mut device, viewer);

    let stats = scheduler.stats(&device);
    assert_eq!(stats.active_chunks, 9);
    assert_eq!(stats.pending_jobs, 0);
    assert_eq!(stats.totals.terrain_generated, 9);
    assert!(stats.totals.meshes_staged >= 10);
    assert!(device.live_buffers() > 0);

    let center = scheduler.chunk(ChunkCoordinate::new(0, 0, 0)).expect("center chunk");
    assert!(center.slots()[0].mesh.is_some_and(|mesh| !mesh.is_empty()));

    let draw_list = scheduler.draw_list(&AllVisible);
    assert!(!draw_list.opaque.is_empty());
    assert!(draw_list
        .opaque
        .iter()
        .any(|item| item.chunk.coordinate() == ChunkCoordinate::new(0, 0, 0) && item.lod == 0));
    assert!(draw_list
        .opaque
        .windows(2)
        .all(|pair| (pair[0].lod, pair[0].chunk.coordinate()) <= (pair[1].lod, pair[1].chunk.coordinate())));
    drop(draw_list);
    drop(center);

    scheduler.shutdown(&mut device);
    assert_eq!(device.live_buffers(), 0);
    assert_eq!(scheduler.arena().live_regions(), 0);
}

#[test]
fn leaving_chunks_are_collected_and_their_buffers_freed() {
    let mut scheduler = ChunkScheduler::with_workers(config(), 2);
    let mut device = HostDevice::new();

    run_until_settled(&mut scheduler, &mut device, Point3::new(8.0, 80.0, 8.0));
    let first = scheduler.counters();

    let far_away = Point3::new(10.0 * CHUNK_WIDTH as f32 + 8.0, 80.0, 8.0);
    run_until_settled(&mut scheduler, &mut device, far_away);

    assert!(!scheduler.is_garbage(ChunkCoordinate::new(0, 0, 0)));
    assert!(scheduler.chunk(ChunkCoordinate::new(0, 0, 0)).is_none());
    assert_eq!(scheduler.counters().chunks_collected - first.chunks_collected, 9);

    for _ in 0..4 {
        scheduler.tick(far_away, 16.0, &mut device);
    }
    let stats = scheduler.stats(&device);
    assert_eq!(stats.buffers_pending_destruction, 0);

    let mut live = 0;
    for coordinate in coordinates_around(ChunkCoordinate::new(10, 0, 0), 1) {
        let chunk = scheduler.chunk(coordinate).expect("active chunk");
        let slots = chunk.slots();
        live += slots
            .iter()
            .filter_map(|slot| slot.mesh)
            .map(|mesh| mesh.buffers().count())
            .sum::<usize>();
    }
    assert_eq!(device.live_buffers(), live);

    scheduler.shutdown(&mut device);
}

#[test]
fn draw_list_leases_block_collection() {
    let mut scheduler = ChunkScheduler::with_workers(config(), 1);
    let mut device = HostDevice::new();
    run_until_settled(&mut scheduler, &mut device, Point3::new(8.0, 80.0, 8.0));

    let draw_list = scheduler.draw_list(&AllVisible);
    assert!(!draw_list.is_empty());

    let far_away = Point3::new(-20.0 * CHUNK_WIDTH as f32, 80.0, 8.0);
    for _ in 0..3 {
        scheduler.tick(far_away, 16.0, &mut device);
    }
    assert!(scheduler.is_garbage(draw_list.opaque[0].chunk.coordinate()));

    drop(draw_list);
    scheduler.tick(far_away, 16.0, &mut device);
    assert!(scheduler.garbage_len() < 9);

    scheduler.shutdown(&mut device);
}

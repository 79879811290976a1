use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use cubis_blocks::Palette;
use cubis_chunk::{Chunk, ChunkHandle, ChunkStore, FillOutcome, UnloadMode, Voxel};
use cubis_mesh_cpu::ExtractOptions;
use cubis_runtime::{MeshJob, MeshPipeline};
use cubis_world::{ChunkCoord, EngineConfig};
use proptest::prelude::*;

fn config(workers: usize, pending: usize) -> EngineConfig {
    EngineConfig {
        chunk_size: 4,
        world_extent_chunks: 16,
        pool_capacity: 8,
        worker_threads: Some(workers),
        pending_jobs: pending,
        ..EngineConfig::default()
    }
}

/// Store with `count` chunks in a row along x, each holding one stone voxel.
fn world(cfg: &EngineConfig, count: i32) -> (Arc<ChunkStore>, Vec<ChunkHandle>) {
    let store = Arc::new(ChunkStore::new(cfg));
    let handles = (0..count)
        .map(|x| {
            store
                .get(ChunkCoord::new(x * 2, 0, 0), true, |c: &mut Chunk| {
                    c.voxels_mut().set(1, 1, 1, Voxel::new(1, 15));
                    FillOutcome {
                        wrote: true,
                        complete: true,
                        above_surface: false,
                    }
                })
                .unwrap()
                .unwrap()
        })
        .collect();
    (store, handles)
}

fn job(store: &ChunkStore, h: ChunkHandle, ticket: u64) -> MeshJob {
    MeshJob::resolve(store, h, ExtractOptions::default(), ticket).unwrap()
}

/// Submits every job in order, draining as rings fill, and returns
/// (chunk, ticket, quads) in consumption order.
fn run_all(pipe: &MeshPipeline, store: &ChunkStore, jobs: &[(ChunkHandle, u64)]) -> Vec<(ChunkHandle, u64, usize)> {
    let mut seen = Vec::with_capacity(jobs.len());
    let mut next = 0;
    let deadline = Instant::now() + Duration::from_secs(30);
    while seen.len() < jobs.len() {
        assert!(Instant::now() < deadline, "pipeline stalled");
        while next < jobs.len() {
            let (h, t) = jobs[next];
            if !pipe.submit(job(store, h, t)) {
                break;
            }
            next += 1;
        }
        let n = pipe.pump(Duration::from_millis(5), |job, out| {
            assert!(!out.failed);
            seen.push((job.chunk, job.ticket, out.quad_count()));
        });
        if n == 0 {
            thread::sleep(Duration::from_millis(1));
        }
    }
    seen
}

#[test]
fn thousand_refreshes_of_one_chunk_complete_in_order() {
    let cfg = config(3, 12);
    let (store, handles) = world(&cfg, 1);
    let pipe = MeshPipeline::new(Arc::clone(&store), Arc::new(Palette::builtin()), &cfg).unwrap();
    assert_eq!(pipe.worker_count(), 3);
    assert_eq!(pipe.capacity_per_worker(), 4);

    let jobs: Vec<_> = (0..1000).map(|t| (handles[0], t)).collect();
    let seen = run_all(&pipe, &store, &jobs);
    let tickets: Vec<u64> = seen.iter().map(|s| s.1).collect();
    assert_eq!(tickets, (0..1000).collect::<Vec<_>>());
    assert!(seen.iter().all(|s| s.2 == 6));
    assert_eq!(pipe.in_flight(), 0);
}

#[test]
fn full_ring_pushes_back() {
    let cfg = config(0, 2);
    let (store, handles) = world(&cfg, 1);
    let pipe = MeshPipeline::new(Arc::clone(&store), Arc::new(Palette::builtin()), &cfg).unwrap();
    assert!(pipe.is_inline());
    assert!(pipe.submit(job(&store, handles[0], 0)));
    assert!(pipe.submit(job(&store, handles[0], 1)));
    assert!(!pipe.submit(job(&store, handles[0], 2)));

    let mut tickets = Vec::new();
    pipe.pump(Duration::from_secs(1), |job, _| tickets.push(job.ticket));
    assert_eq!(tickets, vec![0, 1]);
    assert!(pipe.submit(job(&store, handles[0], 2)));
}

#[test]
fn unloaded_chunk_yields_empty_output() {
    let cfg = config(0, 4);
    let (store, handles) = world(&cfg, 1);
    let pipe = MeshPipeline::new(Arc::clone(&store), Arc::new(Palette::builtin()), &cfg).unwrap();
    assert!(pipe.submit(job(&store, handles[0], 0)));
    assert!(store.unload(handles[0], UnloadMode::Recycle));
    let mut quads = None;
    pipe.pump(Duration::from_secs(1), |_, out| quads = Some(out.quad_count()));
    assert_eq!(quads, Some(0));
}

#[test]
fn neighbors_resolved_at_submission_cull_shared_faces() {
    let cfg = config(0, 4);
    let store = Arc::new(ChunkStore::new(&cfg));
    let fill_wall = |c: &mut Chunk| {
        for y in 0..4 {
            for z in 0..4 {
                for x in 0..4 {
                    c.voxels_mut().set(x, y, z, Voxel::new(1, 15));
                }
            }
        }
        FillOutcome {
            wrote: true,
            complete: true,
            above_surface: false,
        }
    };
    let a = store.get(ChunkCoord::new(0, 0, 0), true, fill_wall).unwrap().unwrap();
    store.get(ChunkCoord::new(0, 1, 0), true, fill_wall).unwrap().unwrap();
    let pipe = MeshPipeline::new(Arc::clone(&store), Arc::new(Palette::builtin()), &cfg).unwrap();
    let j = job(&store, a, 0);
    assert!(j.around.iter().filter(|h| h.is_some()).count() == 2);
    assert!(pipe.submit(j));
    let mut quads = 0;
    pipe.pump(Duration::from_secs(1), |_, out| quads = out.quad_count());
    // sides and bottom face unloaded ground, top faces the chunk above
    assert_eq!(quads, 0);
}

#[test]
fn shutdown_stops_accepting_work() {
    let cfg = config(2, 8);
    let (store, handles) = world(&cfg, 2);
    let mut pipe = MeshPipeline::new(Arc::clone(&store), Arc::new(Palette::builtin()), &cfg).unwrap();
    let seen = run_all(&pipe, &store, &[(handles[0], 0), (handles[1], 1)]);
    assert_eq!(seen.len(), 2);
    pipe.shutdown();
    assert_eq!(pipe.worker_count(), 0);
    assert!(!pipe.submit(job(&store, handles[0], 2)));
    // a second shutdown is harmless
    pipe.shutdown();
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn per_chunk_order_survives_interleaving(order in prop::collection::vec(0usize..4, 1..80)) {
        let cfg = config(2, 4);
        let (store, handles) = world(&cfg, 4);
        let pipe = MeshPipeline::new(Arc::clone(&store), Arc::new(Palette::builtin()), &cfg).unwrap();
        let jobs: Vec<_> = order
            .iter()
            .enumerate()
            .map(|(t, &c)| (handles[c], t as u64))
            .collect();
        let seen = run_all(&pipe, &store, &jobs);
        prop_assert_eq!(seen.len(), jobs.len());
        for h in &handles {
            let mine: Vec<u64> = seen.iter().filter(|s| s.0 == *h).map(|s| s.1).collect();
            prop_assert!(mine.windows(2).all(|w| w[0] < w[1]));
        }
    }
}

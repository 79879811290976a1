use std::sync::Arc;

use cubis_blocks::Palette;
use cubis_chunk::RenderState;
use cubis_lighting::LightChannel;
use cubis_runtime::{Engine, TerrainHooks};
use cubis_world::{ChunkCoord, EngineConfig, TerrainParams, WorldPos};

fn terrain_engine(workers: usize) -> Engine<TerrainHooks> {
    let cfg = EngineConfig {
        chunk_size: 8,
        world_extent_chunks: 64,
        pool_capacity: 32,
        worker_threads: Some(workers),
        pending_jobs: 16,
        view_radius: 1,
        view_height: 1,
        terrain: TerrainParams {
            seed: 7,
            base_height: 0,
            amplitude: 4,
            frequency: 0.05,
            soil_depth: 3,
        },
        ..EngineConfig::default()
    };
    let palette = Arc::new(Palette::builtin());
    let hooks = TerrainHooks::new(cfg.terrain.clone(), &palette);
    Engine::new(cfg, palette, hooks).unwrap()
}

fn streamed_terrain_settles(workers: usize) {
    let mut e = terrain_engine(workers);
    let change = e.update_view(ChunkCoord::new(0, 0, 0)).unwrap();
    assert_eq!(change.entered.len(), 27);
    assert!(e.settle(2000) < 2000);

    let stats = e.stats();
    assert_eq!(stats.loaded, 27);
    assert_eq!(stats.in_flight, 0);
    assert!(stats.triangles > 0);
    assert_eq!(stats.failed_jobs, 0);

    for h in e.store().loaded() {
        let c = e.store().read(h).unwrap();
        if c.populated {
            assert!(
                matches!(c.render_state, RenderState::Ready | RenderState::Empty),
                "{:?} left in {:?}",
                c.coord,
                c.render_state
            );
        }
    }

    // open sky above the surface, darkness in the rock below it
    assert_eq!(e.light_at(LightChannel::Sun, WorldPos::new(0, 15, 0)), Some(15));
    assert_eq!(e.light_at(LightChannel::Sun, WorldPos::new(3, 9, 5)), Some(15));
    assert_eq!(e.light_at(LightChannel::Sun, WorldPos::new(0, -7, 0)), Some(0));
}

#[test]
fn streamed_terrain_settles_with_workers() {
    streamed_terrain_settles(2);
}

#[test]
fn streamed_terrain_settles_inline() {
    streamed_terrain_settles(0);
}

#[test]
fn digging_into_the_ground_lets_sun_in() {
    let mut e = terrain_engine(0);
    e.update_view(ChunkCoord::new(0, 0, 0)).unwrap();
    e.settle(2000);
    let surface = e.hooks().terrain().height_at(2, 2);
    let below = WorldPos::new(2, surface - 1, 2);
    // buried under the grass; at most a side glow
    assert!(e.light_at(LightChannel::Sun, below).unwrap() < 15);

    e.destroy_voxel(WorldPos::new(2, surface, 2)).unwrap();
    e.destroy_voxel(below).unwrap();
    e.settle(2000);
    assert_eq!(e.light_at(LightChannel::Sun, below), Some(15));
}

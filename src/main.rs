use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use cubis_blocks::Palette;
use cubis_lighting::LightChannel;
use cubis_runtime::{Engine, TerrainHooks};
use cubis_world::{ChunkCoord, EngineConfig, WorldPos};

#[derive(Parser, Debug)]
#[command(name = "cubis", about = "Stream, light and mesh voxel terrain around a walking viewer")]
struct Args {
    /// Engine settings (TOML). Built-in defaults when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Voxel palette (TOML). Built-in palette when omitted.
    #[arg(long)]
    palette: Option<PathBuf>,
    /// Horizontal view radius in chunks
    #[arg(long)]
    radius: Option<u32>,
    /// Mesh worker threads; 0 meshes on the main thread
    #[arg(long)]
    workers: Option<usize>,
    /// Terrain seed
    #[arg(long)]
    seed: Option<i32>,
    /// Frames to run
    #[arg(long, default_value_t = 240)]
    ticks: usize,
    /// Chunks the viewer walks along +x during the run
    #[arg(long, default_value_t = 2)]
    walk: i32,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(e) = run(Args::parse()) {
        log::error!("{e}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let mut cfg = match &args.config {
        Some(path) => EngineConfig::load_from_path(path)?,
        None => EngineConfig::default(),
    };
    if let Some(r) = args.radius {
        cfg.view_radius = r;
    }
    if args.workers.is_some() {
        cfg.worker_threads = args.workers;
    }
    if let Some(seed) = args.seed {
        cfg.terrain.seed = seed;
    }
    // keep the pool ahead of the view box
    cfg.pool_capacity = cfg.pool_capacity.max(cfg.view_volume() * 2);
    cfg.validate()?;

    let palette = Arc::new(match &args.palette {
        Some(path) => Palette::load_from_path(path)?,
        None => Palette::builtin(),
    });
    let hooks = TerrainHooks::new(cfg.terrain.clone(), &palette);
    let mut engine = Engine::new(cfg, Arc::clone(&palette), hooks)?;

    let mut center = ChunkCoord::new(0, 0, 0);
    engine.update_view(center)?;
    decorate(&mut engine, &palette)?;

    let stride = (args.ticks / (args.walk.max(0) as usize + 1)).max(1);
    for t in 1..=args.ticks {
        if t % stride == 0 && center.cx < args.walk {
            center = center.offset(1, 0, 0);
            let change = engine.update_view(center)?;
            log::info!(
                "viewer at chunk x={}: {} chunks in, {} out",
                center.cx,
                change.entered.len(),
                change.exited.len()
            );
        }
        let report = engine.tick();
        log::debug!(
            "tick {t}: {} light writes, {} submitted, {} deferred, {} meshes",
            report.light.writes,
            report.submitted,
            report.rejected,
            report.consumed
        );
    }
    let extra = engine.settle(10_000);

    let s = engine.stats();
    log::info!(
        "{} chunks loaded, {} triangles, {} meshes consumed ({} deferred, {} failed), {} extra ticks to settle",
        s.loaded,
        s.triangles,
        s.meshes_consumed,
        s.jobs_rejected,
        s.failed_jobs,
        extra
    );
    log::info!(
        "light totals: {} removals, {} spreads, {} writes",
        s.light.removals,
        s.light.spreads,
        s.light.writes
    );
    engine.shutdown();
    Ok(())
}

/// A torch on the surface near the origin and a glass pane beside it.
fn decorate(engine: &mut Engine<TerrainHooks>, palette: &Palette) -> Result<(), Box<dyn Error>> {
    let ground = engine.hooks().terrain().height_at(4, 4);
    if let Some(torch) = palette.id_by_name("torch") {
        let at = WorldPos::new(4, ground + 1, 4);
        engine.place_voxel(at, torch, None)?;
        engine.tick();
        log::info!(
            "torch at ({}, {}, {}) glows {}",
            at.x,
            at.y,
            at.z,
            engine.light_at(LightChannel::Torch, at).unwrap_or(0)
        );
    }
    if let Some(glass) = palette.id_by_name("glass") {
        for y in 1..=3 {
            for z in 2..=6 {
                engine.place_voxel(WorldPos::new(6, ground + y, z), glass, Some([160, 220, 255]))?;
            }
        }
    }
    Ok(())
}

use std::error::Error;
use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use hashbrown::{HashMap, HashSet};

use cubis_blocks::{HOLE, KindId, Palette};
use cubis_chunk::{
    Chunk, ChunkHandle, ChunkStore, Face, PropertyValue, RenderState, StoreError, UnloadMode,
    Voxel,
};
use cubis_lighting::{LightChannel, LightEngine, LightStats};
use cubis_mesh_cpu::ExtractOptions;
use cubis_world::{ChunkCoord, ChunkKey, ConfigError, EngineConfig, WorldPos};

use crate::hooks::WorldHooks;
use crate::pipeline::{MeshJob, MeshPipeline};
use crate::render::{fill_render_mesh, store_collider};

#[derive(Debug)]
pub enum EngineError {
    Config(ConfigError),
    Store(StoreError),
    /// Mesh worker threads could not be started.
    Spawn(io::Error),
    UnknownKind(KindId),
    NotLoaded(ChunkCoord),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Config(e) => write!(f, "config: {e}"),
            EngineError::Store(e) => write!(f, "store: {e}"),
            EngineError::Spawn(e) => write!(f, "spawning mesh workers: {e}"),
            EngineError::UnknownKind(k) => write!(f, "voxel kind {k} is not in the palette"),
            EngineError::NotLoaded(c) => write!(f, "chunk ({}, {}, {}) is not loaded", c.cx, c.cy, c.cz),
        }
    }
}

impl Error for EngineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            EngineError::Config(e) => Some(e),
            EngineError::Store(e) => Some(e),
            EngineError::Spawn(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for EngineError {
    fn from(e: ConfigError) -> Self {
        EngineError::Config(e)
    }
}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        EngineError::Store(e)
    }
}

impl From<io::Error> for EngineError {
    fn from(e: io::Error) -> Self {
        EngineError::Spawn(e)
    }
}

/// Work done by one [`Engine::tick`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    pub light: LightStats,
    pub submitted: usize,
    pub rejected: usize,
    pub consumed: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub loaded: usize,
    pub dirty: usize,
    pub in_flight: usize,
    pub triangles: usize,
    pub chunks_created: u64,
    pub chunks_unloaded: u64,
    pub jobs_submitted: u64,
    pub jobs_rejected: u64,
    pub meshes_consumed: u64,
    pub failed_jobs: u64,
    pub light: LightStats,
}

/// Result of moving the view center.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ViewChange {
    pub entered: Vec<ChunkHandle>,
    pub exited: Vec<ChunkCoord>,
}

/// The voxel world: store, light, meshing and the game's hooks behind one façade.
/// All methods run on the main thread.
pub struct Engine<H: WorldHooks> {
    config: EngineConfig,
    palette: Arc<Palette>,
    store: Arc<ChunkStore>,
    light: LightEngine,
    pipeline: MeshPipeline,
    hooks: H,
    view_center: Option<ChunkCoord>,
    visible: HashSet<ChunkHandle>,
    ignore_frustum: HashSet<ChunkHandle>,
    /// Latest ticket submitted per chunk.
    tickets: HashMap<ChunkHandle, u64>,
    next_ticket: u64,
    stats: EngineStats,
}

impl<H: WorldHooks> Engine<H> {
    pub fn new(config: EngineConfig, palette: Arc<Palette>, hooks: H) -> Result<Self, EngineError> {
        config.validate()?;
        let store = Arc::new(ChunkStore::new(&config));
        let light = LightEngine::new(Arc::clone(&store), Arc::clone(&palette), &config);
        let pipeline = MeshPipeline::new(Arc::clone(&store), Arc::clone(&palette), &config)?;
        let view = config.view_volume();
        if config.pool_capacity < view {
            log::warn!(
                target: "engine",
                "pool capacity {} is smaller than the view volume of {view} chunks; streaming will exhaust it",
                config.pool_capacity
            );
        }
        log::info!(
            target: "engine",
            "engine ready: {}³ chunks, GI {}, view {}x{}",
            config.chunk_size,
            if config.global_illumination { "on" } else { "off" },
            config.view_radius,
            config.view_height
        );
        Ok(Self {
            config,
            palette,
            store,
            light,
            pipeline,
            hooks,
            view_center: None,
            visible: HashSet::new(),
            ignore_frustum: HashSet::new(),
            tickets: HashMap::new(),
            next_ticket: 0,
            stats: EngineStats::default(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn palette(&self) -> &Arc<Palette> {
        &self.palette
    }

    pub fn store(&self) -> &Arc<ChunkStore> {
        &self.store
    }

    pub fn light(&self) -> &LightEngine {
        &self.light
    }

    pub fn pipeline(&self) -> &MeshPipeline {
        &self.pipeline
    }

    #[cfg(test)]
    pub(crate) fn swap_extract(&mut self, extract: crate::pipeline::ExtractFn) {
        self.pipeline = MeshPipeline::with_extract(Arc::clone(&self.store), Arc::clone(&self.palette), &self.config, extract)
            .expect("spawn mesh workers");
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut H {
        &mut self.hooks
    }

    #[inline]
    pub fn chunk_size(&self) -> usize {
        self.config.chunk_size
    }

    /// Returns the chunk at `coord`, creating, filling and lighting it when absent.
    pub fn get_or_create_chunk(&mut self, coord: ChunkCoord) -> Result<ChunkHandle, EngineError> {
        let hooks = &mut self.hooks;
        let mut created = None;
        let found = self.store.get(coord, true, |c: &mut Chunk| {
            let mut outcome = hooks.before_chunk_create(c);
            // details only go onto a finished pre-fill
            if outcome.complete && hooks.detail_generators(c) {
                outcome.wrote = true;
            }
            created = Some(outcome.complete);
            outcome
        })?;
        let handle = found.ok_or(EngineError::NotLoaded(coord))?;
        if let Some(complete) = created {
            self.on_created(handle, complete);
        }
        Ok(handle)
    }

    fn on_created(&mut self, handle: ChunkHandle, complete: bool) {
        self.stats.chunks_created += 1;
        self.light.compute_chunk(handle);
        let neighbors = self.store.read(handle).map(|c| c.neighbors).unwrap_or_default();
        // the chunk below lit its top layer as open sky
        if let Some(below) = neighbors[Face::NegY.index()] {
            self.light.compute_chunk(below);
        }
        for n in neighbors.into_iter().flatten() {
            if let Some(mut c) = self.store.write(n) {
                c.mark_dirty();
            }
        }
        if !complete {
            log::debug!(target: "engine", "chunk {handle:?} left incomplete by its pre-fill");
            return;
        }
        if let Some(c) = self.store.read(handle) {
            self.hooks.after_chunk_create(handle, &c);
        }
    }

    pub fn chunk_if_present(&self, key: ChunkKey) -> Option<ChunkHandle> {
        self.store.get_by_key(key)
    }

    /// Loaded chunk and voxel index holding `pos`.
    pub fn locate(&self, pos: WorldPos) -> Option<(ChunkHandle, usize)> {
        let n = self.chunk_size();
        let h = self.store.handle_of(pos.chunk(n))?;
        let (x, y, z) = pos.local(n);
        Some((h, (y * n + z) * n + x))
    }

    fn locate_or_create(&mut self, pos: WorldPos) -> Result<(ChunkHandle, usize), EngineError> {
        let n = self.chunk_size();
        let h = self.get_or_create_chunk(pos.chunk(n))?;
        let (x, y, z) = pos.local(n);
        Ok((h, (y * n + z) * n + x))
    }

    fn locate_loaded(&self, pos: WorldPos) -> Result<(ChunkHandle, usize), EngineError> {
        self.locate(pos)
            .ok_or(EngineError::NotLoaded(pos.chunk(self.chunk_size())))
    }

    pub fn voxel_at(&self, pos: WorldPos) -> Option<Voxel> {
        let (h, i) = self.locate(pos)?;
        Some(self.store.read(h)?.voxels().at(i))
    }

    pub fn light_at(&self, ch: LightChannel, pos: WorldPos) -> Option<u8> {
        let (h, i) = self.locate(pos)?;
        self.light.level(ch, h, i)
    }

    /// Writes a palette kind at `pos`, creating its chunk if needed.
    pub fn place_voxel(&mut self, pos: WorldPos, kind: KindId, tint: Option<[u8; 3]>) -> Result<(), EngineError> {
        if kind != HOLE && self.palette.get(kind).is_none() {
            return Err(EngineError::UnknownKind(kind));
        }
        let (h, i) = self.locate_or_create(pos)?;
        let mut v = Voxel::of_kind(&self.palette, kind);
        if let Some(t) = tint {
            v = v.with_tint(t);
        }
        self.write_voxel(h, i, v);
        Ok(())
    }

    pub fn destroy_voxel(&mut self, pos: WorldPos) -> Result<(), EngineError> {
        let (h, i) = self.locate_loaded(pos)?;
        self.write_voxel(h, i, Voxel::HOLE);
        Ok(())
    }

    fn write_voxel(&mut self, handle: ChunkHandle, index: usize, v: Voxel) {
        let edges: Vec<ChunkHandle> = {
            let Some(mut c) = self.store.write(handle) else {
                return;
            };
            let slot = c.voxels_mut().at_mut(index);
            slot.kind = v.kind;
            slot.opacity = v.opacity;
            slot.tint = v.tint;
            slot.flags = v.flags;
            if v.is_hole() {
                c.extras.clear_voxel(index as u32);
            }
            c.modified = true;
            c.populated = true;
            c.rebuild_collider = true;
            c.mark_dirty();
            let faces: Vec<Face> = c.voxels().edge_faces(index).collect();
            faces.into_iter().filter_map(|f| c.neighbor(f)).collect()
        };
        for n in edges {
            if let Some(mut c) = self.store.write(n) {
                c.mark_dirty();
            }
        }
        self.light.voxel_changed(handle, index);
    }

    /// Hides a voxel from meshing without changing its kind or light.
    pub fn set_hidden(&mut self, pos: WorldPos, hidden: bool) -> Result<bool, EngineError> {
        let (h, i) = self.locate_loaded(pos)?;
        let Some(mut c) = self.store.write(h) else {
            return Err(EngineError::NotLoaded(pos.chunk(self.chunk_size())));
        };
        let changed = c.extras.set_hidden(i as u32, hidden);
        if changed {
            c.mark_dirty();
            c.force_mesh = true;
        }
        Ok(changed)
    }

    /// Adds (`Some`) or removes an overlay light emitter at `pos`.
    pub fn set_light_source(&mut self, pos: WorldPos, level: Option<u8>) -> Result<(), EngineError> {
        let (h, i) = self.locate_loaded(pos)?;
        match self.store.write(h) {
            Some(mut c) => {
                c.extras.set_light_source(i as u32, level);
            }
            None => return Err(EngineError::NotLoaded(pos.chunk(self.chunk_size()))),
        }
        self.light.voxel_changed(h, i);
        Ok(())
    }

    pub fn set_property(&mut self, pos: WorldPos, name: &str, value: Option<PropertyValue>) -> Result<(), EngineError> {
        let (h, i) = self.locate_loaded(pos)?;
        let Some(mut c) = self.store.write(h) else {
            return Err(EngineError::NotLoaded(pos.chunk(self.chunk_size())));
        };
        c.extras.set_property(i as u32, name, value);
        Ok(())
    }

    pub fn property(&self, pos: WorldPos, name: &str) -> Option<PropertyValue> {
        let (h, i) = self.locate(pos)?;
        self.store.read(h)?.extras.property(i as u32, name).cloned()
    }

    /// Schedules a relight and/or remesh. Returns `false` for a stale handle.
    pub fn request_refresh(
        &mut self,
        handle: ChunkHandle,
        refresh_lightmap: bool,
        refresh_mesh: bool,
        ignore_frustum: bool,
    ) -> bool {
        if !self.store.is_live(handle) {
            return false;
        }
        if refresh_lightmap {
            self.light.compute_chunk(handle);
        }
        if refresh_mesh {
            if let Some(mut c) = self.store.write(handle) {
                c.mark_dirty();
                c.force_mesh = true;
            }
            if ignore_frustum {
                self.ignore_frustum.insert(handle);
            }
        }
        true
    }

    /// Streams chunks around `center`: recycles those out of range, then
    /// creates missing ones nearest first.
    pub fn update_view(&mut self, center: ChunkCoord) -> Result<ViewChange, EngineError> {
        let r = self.config.view_radius;
        let hgt = self.config.view_height;
        let mut change = ViewChange::default();

        for h in self.store.loaded() {
            let Some(coord) = self.store.read(h).map(|c| c.coord) else {
                continue;
            };
            let (dh, dv) = coord.reach(center);
            if dh > r || dv > hgt {
                if self.visible.remove(&h) {
                    self.hooks.chunk_visibility_changed(h, coord, false);
                }
                self.unload(h);
                change.exited.push(coord);
            }
        }

        let (ri, hi) = (r as i32, hgt as i32);
        let mut wanted = Vec::with_capacity(self.config.view_volume());
        for dy in -hi..=hi {
            for dz in -ri..=ri {
                for dx in -ri..=ri {
                    wanted.push(center.offset(dx, dy, dz));
                }
            }
        }
        // the view box may poke past the world edge
        let before = wanted.len();
        wanted.retain(|&c| self.store.key_of(c).is_ok());
        if wanted.len() < before {
            log::trace!(target: "engine", "{} view chunks lie outside the world", before - wanted.len());
        }
        wanted.sort_by_key(|c| c.distance_sq(center));
        for coord in wanted {
            let h = self.get_or_create_chunk(coord)?;
            if self.visible.insert(h) {
                if let Some(mut c) = self.store.write(h) {
                    c.in_view = true;
                }
                self.hooks.chunk_visibility_changed(h, coord, true);
                change.entered.push(h);
            }
        }
        if self.view_center != Some(center) {
            log::debug!(
                target: "engine",
                "view at ({}, {}, {}): +{} -{} chunks",
                center.cx,
                center.cy,
                center.cz,
                change.entered.len(),
                change.exited.len()
            );
        }
        self.view_center = Some(center);
        Ok(change)
    }

    /// Recycles a chunk, releasing what collaborators hold for it.
    pub fn unload(&mut self, handle: ChunkHandle) -> bool {
        let (nav, neighbors) = match self.store.write(handle) {
            Some(mut c) => (c.nav.take(), c.neighbors),
            None => return false,
        };
        if let Some(nav) = nav {
            self.hooks.nav_released(nav);
        }
        self.visible.remove(&handle);
        self.ignore_frustum.remove(&handle);
        self.tickets.remove(&handle);
        if !self.store.unload(handle, UnloadMode::Recycle) {
            return false;
        }
        self.stats.chunks_unloaded += 1;
        // the chunk below sees open sky again
        if let Some(below) = neighbors[Face::NegY.index()] {
            self.light.compute_chunk(below);
        }
        for n in neighbors.into_iter().flatten() {
            if let Some(mut c) = self.store.write(n) {
                c.mark_dirty();
            }
        }
        true
    }

    /// One frame: settle light, submit dirty chunks, consume finished meshes
    /// within the frame budget.
    pub fn tick(&mut self) -> TickReport {
        let start = Instant::now();
        let mut report = TickReport::default();

        let mut touched: HashSet<ChunkHandle> = HashSet::new();
        report.light = self.light.process(&mut touched);
        for h in touched {
            if let Some(mut c) = self.store.write(h) {
                c.mark_dirty();
            }
        }

        let (submitted, rejected) = self.submit_dirty();
        report.submitted = submitted;
        report.rejected = rejected;

        let budget = Duration::from_millis(self.config.frame_budget_ms).saturating_sub(start.elapsed());
        report.consumed = self.consume(budget);
        report
    }

    fn submit_dirty(&mut self) -> (usize, usize) {
        let center = self.view_center;
        let mut candidates: Vec<(i64, ChunkHandle)> = Vec::new();
        for h in self.store.loaded() {
            let Some(c) = self.store.read(h) else {
                continue;
            };
            if !c.wants_mesh() {
                continue;
            }
            if !self.ignore_frustum.contains(&h) && !self.hooks.in_frustum(c.coord, c.center) {
                continue;
            }
            let d = center.map_or(0, |v| c.coord.distance_sq(v));
            candidates.push((d, h));
        }
        candidates.sort_by_key(|&(d, h)| (d, h.slot));

        let (mut submitted, mut rejected) = (0, 0);
        for (_, h) in candidates.into_iter().take(self.config.max_submissions_per_tick) {
            let collider = self.config.build_colliders
                && self
                    .store
                    .read(h)
                    .is_some_and(|c| c.rebuild_collider || c.collider.is_none());
            let options = ExtractOptions {
                collider,
                nav: self.config.build_nav,
            };
            let Some(job) = MeshJob::resolve(&self.store, h, options, self.next_ticket) else {
                continue;
            };
            if !self.pipeline.submit(job) {
                rejected += 1;
                continue;
            }
            self.next_ticket += 1;
            self.tickets.insert(h, job.ticket);
            self.ignore_frustum.remove(&h);
            if let Some(mut c) = self.store.write(h) {
                c.dirty = false;
                c.force_mesh = false;
                c.rebuild_collider = false;
                c.render_state = RenderState::Queued;
            }
            submitted += 1;
        }
        if rejected > 0 {
            log::debug!(target: "engine", "{rejected} mesh job(s) deferred by full worker rings");
        }
        self.stats.jobs_submitted += submitted as u64;
        self.stats.jobs_rejected += rejected as u64;
        (submitted, rejected)
    }

    fn consume(&mut self, budget: Duration) -> usize {
        let store = &self.store;
        let hooks = &mut self.hooks;
        let tickets = &self.tickets;
        let mut failed = 0u64;
        let consumed = self.pipeline.pump(budget, |job, out| {
            let Some(mut c) = store.write(job.chunk) else {
                return;
            };
            if out.failed {
                failed += 1;
                if c.render_state == RenderState::Queued {
                    c.render_state = RenderState::Unrendered;
                }
                return;
            }
            if job.options.collider {
                store_collider(&out.collider, &mut c.collider);
            }
            if job.options.nav {
                if let Some(old) = c.nav.take() {
                    hooks.nav_released(old);
                }
                if !out.nav.is_empty() {
                    c.nav = hooks.nav_built(job.chunk, &out.nav);
                }
            }
            if out.is_empty() {
                c.render = None;
                c.render_state = RenderState::Empty;
            } else {
                fill_render_mesh(out, c.render.get_or_insert_with(Default::default));
                c.render_state = RenderState::Ready;
            }
            // a newer job for this chunk is still in flight
            if tickets.get(&job.chunk).is_some_and(|&t| t > job.ticket) {
                c.render_state = RenderState::Queued;
            }
            hooks.chunk_rendered(job.chunk, &c);
        });
        self.stats.meshes_consumed += consumed as u64;
        self.stats.failed_jobs += failed;
        consumed
    }

    /// Runs ticks until light is settled and no mesh work remains, or `max_ticks` pass.
    pub fn settle(&mut self, max_ticks: usize) -> usize {
        for t in 0..max_ticks {
            let report = self.tick();
            let idle = self.light.is_idle()
                && self.pipeline.in_flight() == 0
                && report.submitted == 0
                && report.consumed == 0;
            if idle && !self.any_dirty() {
                return t + 1;
            }
            if report.consumed == 0 && self.pipeline.in_flight() > 0 && !self.pipeline.is_inline() {
                std::thread::sleep(Duration::from_millis(1));
            }
        }
        max_ticks
    }

    fn any_dirty(&self) -> bool {
        self.store.loaded().into_iter().any(|h| {
            self.store
                .read(h)
                .is_some_and(|c| c.wants_mesh() && (self.ignore_frustum.contains(&h) || self.hooks.in_frustum(c.coord, c.center)))
        })
    }

    pub fn stats(&self) -> EngineStats {
        let mut s = self.stats;
        for h in self.store.loaded() {
            if let Some(c) = self.store.read(h) {
                s.loaded += 1;
                s.dirty += usize::from(c.dirty);
                s.triangles += c.render.as_ref().map_or(0, |m| m.triangle_count());
            }
        }
        s.in_flight = self.pipeline.in_flight();
        s.light = self.light.totals();
        s
    }

    /// Stops the mesh workers. Further ticks only settle light.
    pub fn shutdown(&mut self) {
        self.pipeline.shutdown();
    }
}

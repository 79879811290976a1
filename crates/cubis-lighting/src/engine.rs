use std::collections::VecDeque;
use std::sync::Arc;

use hashbrown::HashSet;

use cubis_blocks::{MAX_LEVEL, Palette};
use cubis_chunk::{Chunk, ChunkHandle, ChunkStore, Face, Step};
use cubis_world::EngineConfig;

use crate::{LightChannel, RefreshSink};

#[derive(Clone, Copy, Debug)]
struct Removal {
    handle: ChunkHandle,
    index: u32,
    old: u8,
}

#[derive(Clone, Copy, Debug)]
struct Spread {
    handle: ChunkHandle,
    index: u32,
}

#[derive(Default)]
struct Queues {
    removal: VecDeque<Removal>,
    spread: VecDeque<Spread>,
}

impl Queues {
    fn is_empty(&self) -> bool {
        self.removal.is_empty() && self.spread.is_empty()
    }
}

/// Work done by one `process` call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LightStats {
    pub removals: u64,
    pub spreads: u64,
    pub writes: u64,
}

impl LightStats {
    fn add(&mut self, o: LightStats) {
        self.removals += o.removals;
        self.spreads += o.spreads;
        self.writes += o.writes;
    }
}

/// Light state of one voxel.
#[derive(Clone, Copy, Debug)]
struct Cell {
    sun: u8,
    torch: u8,
    opacity: u8,
    sun_emit: u8,
    torch_emit: u8,
    above_surface: bool,
}

/// A voxel plus where its six face neighbors live, read under a single chunk lock.
#[derive(Clone, Copy, Debug)]
struct Site {
    cell: Cell,
    links: [Option<(ChunkHandle, usize)>; 6],
    /// Bit per face whose neighbor voxel lives in another chunk.
    across: u8,
}

impl Site {
    #[inline]
    fn crosses(&self, face: Face) -> bool {
        self.across & (1 << face.index()) != 0
    }
}

impl Cell {
    #[inline]
    fn light(&self, ch: LightChannel) -> u8 {
        match ch {
            LightChannel::Sun => self.sun,
            LightChannel::Torch => self.torch,
        }
    }

    #[inline]
    fn emission(&self, ch: LightChannel) -> u8 {
        match ch {
            LightChannel::Sun => self.sun_emit,
            LightChannel::Torch => self.torch_emit,
        }
    }
}

/// Two-channel light propagation over the chunks of a `ChunkStore`.
///
/// A voxel's level is the larger of its own emission and what its six face
/// neighbors pass on. A neighbor `n` passes `light(n) - att - opacity(n)`, or
/// `emission(n) - att` if that is larger, so opaque voxels are lit but only
/// shed the light they emit themselves. Sunlight falling straight down inside
/// an above-surface chunk does not attenuate.
pub struct LightEngine {
    store: Arc<ChunkStore>,
    palette: Arc<Palette>,
    enabled: bool,
    sun_att: u8,
    torch_att: u8,
    sun: Queues,
    torch: Queues,
    refresh: HashSet<ChunkHandle>,
    total: LightStats,
}

impl LightEngine {
    pub fn new(store: Arc<ChunkStore>, palette: Arc<Palette>, cfg: &EngineConfig) -> Self {
        Self {
            store,
            palette,
            enabled: cfg.global_illumination,
            sun_att: cfg.sun_attenuation.max(1),
            torch_att: cfg.torch_attenuation.max(1),
            sun: Queues::default(),
            torch: Queues::default(),
            refresh: HashSet::new(),
            total: LightStats::default(),
        }
    }

    /// False when global illumination is off and everything stays full-bright.
    #[inline]
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    #[inline]
    pub fn is_idle(&self) -> bool {
        self.sun.is_empty() && self.torch.is_empty()
    }

    pub fn pending(&self) -> usize {
        self.sun.removal.len() + self.sun.spread.len() + self.torch.removal.len() + self.torch.spread.len()
    }

    /// Lifetime totals across every `process` call.
    pub fn totals(&self) -> LightStats {
        self.total
    }

    pub fn level(&self, ch: LightChannel, handle: ChunkHandle, index: usize) -> Option<u8> {
        let c = self.store.read(handle)?;
        Some(ch.get(&c.voxels().at(index)))
    }

    fn queues(&mut self, ch: LightChannel) -> &mut Queues {
        match ch {
            LightChannel::Sun => &mut self.sun,
            LightChannel::Torch => &mut self.torch,
        }
    }

    #[inline]
    fn attenuation(&self, ch: LightChannel) -> u8 {
        match ch {
            LightChannel::Sun => self.sun_att,
            LightChannel::Torch => self.torch_att,
        }
    }

    /// Attenuation for light leaving `from` through `face`.
    #[inline]
    fn step_att(&self, ch: LightChannel, from: &Cell, face: Face) -> u8 {
        if ch == LightChannel::Sun && face == Face::NegY && from.above_surface {
            0
        } else {
            self.attenuation(ch)
        }
    }

    /// Light `from` passes through `face` to the voxel beyond it.
    #[inline]
    fn transmit(&self, ch: LightChannel, from: &Cell, face: Face) -> u8 {
        let att = self.step_att(ch, from, face);
        let through = from.light(ch).saturating_sub(att.saturating_add(from.opacity));
        through.max(from.emission(ch).saturating_sub(att))
    }

    fn cell_of(&self, c: &Chunk, index: usize) -> Cell {
        let g = c.voxels();
        let v = g.at(index);
        let top = g.coords(index).1 == g.size() - 1;
        let sun_emit = if top && c.above_surface && c.neighbor(Face::PosY).is_none() {
            MAX_LEVEL.saturating_sub(v.opacity)
        } else {
            0
        };
        let torch_emit = self
            .palette
            .emission(v.kind)
            .max(c.extras.light_source(index as u32));
        Cell {
            sun: v.sun,
            torch: v.torch,
            opacity: v.opacity,
            sun_emit,
            torch_emit,
            above_surface: c.above_surface,
        }
    }

    fn cell(&self, handle: ChunkHandle, index: usize) -> Option<Cell> {
        let c = self.store.read(handle)?;
        Some(self.cell_of(&c, index))
    }

    fn site(&self, handle: ChunkHandle, index: usize) -> Option<Site> {
        let c = self.store.read(handle)?;
        let g = c.voxels();
        let mut links = [None; 6];
        let mut across = 0u8;
        for f in Face::ALL {
            links[f.index()] = match g.step(index, f) {
                Step::Inside(j) => Some((handle, j)),
                Step::Across(j) => {
                    across |= 1 << f.index();
                    c.neighbor(f).map(|n| (n, j))
                }
            };
        }
        Some(Site {
            cell: self.cell_of(&c, index),
            links,
            across,
        })
    }

    /// Cells across each face of `site`. The home chunk is read once for every
    /// face that stays inside it.
    fn neighbor_cells(&self, handle: ChunkHandle, site: &Site) -> [Option<Cell>; 6] {
        let mut cells = [None; 6];
        if let Some(c) = self.store.read(handle) {
            for f in Face::ALL {
                if let (false, Some((_, j))) = (site.crosses(f), site.links[f.index()]) {
                    cells[f.index()] = Some(self.cell_of(&c, j));
                }
            }
        }
        for f in Face::ALL {
            if let (true, Some((nh, j))) = (site.crosses(f), site.links[f.index()]) {
                cells[f.index()] = self.cell(nh, j);
            }
        }
        cells
    }

    /// Level the voxel at `site` should hold given its neighbors right now.
    fn derive(&self, ch: LightChannel, site: &Site, cells: &[Option<Cell>; 6]) -> u8 {
        let mut level = site.cell.emission(ch);
        for (f, n) in Face::ALL.into_iter().zip(cells) {
            if let Some(n) = n {
                level = level.max(self.transmit(ch, n, f.opposite()));
            }
        }
        level.min(MAX_LEVEL)
    }

    fn write(&mut self, ch: LightChannel, handle: ChunkHandle, index: usize, level: u8) {
        if let Some(mut c) = self.store.write(handle) {
            ch.set(c.voxels_mut().at_mut(index), level);
        }
    }

    fn flag(&mut self, handle: ChunkHandle, site: &Site) {
        self.refresh.insert(handle);
        for f in Face::ALL {
            if site.crosses(f) {
                if let Some((n, _)) = site.links[f.index()] {
                    self.refresh.insert(n);
                }
            }
        }
    }

    /// Zeroes a lit voxel and queues the retraction of everything it fed.
    pub fn clear_at(&mut self, ch: LightChannel, handle: ChunkHandle, index: usize) {
        if !self.enabled {
            return;
        }
        let Some(site) = self.site(handle, index) else {
            return;
        };
        self.clear_site(ch, handle, index, &site);
    }

    fn clear_site(&mut self, ch: LightChannel, handle: ChunkHandle, index: usize, site: &Site) {
        let old = site.cell.light(ch);
        if old == 0 {
            return;
        }
        self.write(ch, handle, index, 0);
        self.flag(handle, site);
        self.queues(ch).removal.push_back(Removal {
            handle,
            index: index as u32,
            old,
        });
    }

    /// Queues a voxel for re-derivation.
    pub fn seed(&mut self, ch: LightChannel, handle: ChunkHandle, index: usize) {
        if !self.enabled {
            return;
        }
        self.queues(ch).spread.push_back(Spread {
            handle,
            index: index as u32,
        });
    }

    /// A voxel's kind, opacity or light source changed.
    pub fn voxel_changed(&mut self, handle: ChunkHandle, index: usize) {
        for ch in LightChannel::ALL {
            self.clear_at(ch, handle, index);
            self.seed(ch, handle, index);
        }
    }

    /// Recomputes a (re)populated chunk from scratch: clears what it holds,
    /// then seeds its emitters and every boundary voxel.
    pub fn compute_chunk(&mut self, handle: ChunkHandle) {
        if !self.enabled {
            return;
        }
        let (lit, seeds) = {
            let Some(c) = self.store.read(handle) else {
                return;
            };
            let g = c.voxels();
            let mut lit = Vec::new();
            let mut seeds: HashSet<usize> = HashSet::new();
            for (i, v) in g.as_slice().iter().enumerate() {
                if v.sun > 0 || v.torch > 0 {
                    lit.push(i);
                }
                if self.palette.emission(v.kind) > 0 {
                    seeds.insert(i);
                }
            }
            for (i, _) in c.extras.light_sources() {
                seeds.insert(i as usize);
            }
            for f in Face::ALL {
                seeds.extend(g.face_indices(f));
            }
            (lit, seeds)
        };
        for &i in &lit {
            for ch in LightChannel::ALL {
                self.clear_at(ch, handle, i);
            }
        }
        for &i in &seeds {
            for ch in LightChannel::ALL {
                self.seed(ch, handle, i);
            }
        }
        for &i in &lit {
            if !seeds.contains(&i) {
                for ch in LightChannel::ALL {
                    self.seed(ch, handle, i);
                }
            }
        }
        log::trace!(
            target: "light",
            "recompute slot {}: {} lit, {} seeds",
            handle.slot,
            lit.len(),
            seeds.len()
        );
    }

    /// Drains both channels to quiescence and reports changed chunks.
    pub fn process<S: RefreshSink + ?Sized>(&mut self, sink: &mut S) -> LightStats {
        let mut stats = LightStats::default();
        if self.enabled {
            for ch in LightChannel::ALL {
                stats.add(self.drain(ch));
            }
        }
        for h in self.refresh.drain() {
            sink.refresh(h);
        }
        self.total.add(stats);
        if stats.removals + stats.spreads > 0 {
            log::debug!(
                target: "light",
                "processed {} removals, {} spreads, {} writes",
                stats.removals,
                stats.spreads,
                stats.writes
            );
        }
        stats
    }

    fn drain(&mut self, ch: LightChannel) -> LightStats {
        let mut stats = LightStats::default();
        loop {
            while let Some(r) = self.queues(ch).removal.pop_front() {
                stats.removals += 1;
                self.removal_step(ch, r, &mut stats);
            }
            let Some(s) = self.queues(ch).spread.pop_front() else {
                break;
            };
            stats.spreads += 1;
            self.spread_step(ch, s, &mut stats);
        }
        stats
    }

    fn removal_step(&mut self, ch: LightChannel, r: Removal, stats: &mut LightStats) {
        let Some(here) = self.site(r.handle, r.index as usize) else {
            return;
        };
        let cells = self.neighbor_cells(r.handle, &here);
        for f in Face::ALL {
            let (Some((nh, j)), Some(n)) = (here.links[f.index()], cells[f.index()]) else {
                continue;
            };
            let nl = n.light(ch);
            if nl == 0 {
                continue;
            }
            let bound = r.old.saturating_sub(self.step_att(ch, &here.cell, f));
            if nl <= bound {
                self.write(ch, nh, j, 0);
                stats.writes += 1;
                if let Some(ns) = self.site(nh, j) {
                    self.flag(nh, &ns);
                }
                let q = self.queues(ch);
                q.removal.push_back(Removal {
                    handle: nh,
                    index: j as u32,
                    old: nl,
                });
                if n.emission(ch) > 0 {
                    q.spread.push_back(Spread {
                        handle: nh,
                        index: j as u32,
                    });
                }
            } else {
                self.queues(ch).spread.push_back(Spread {
                    handle: nh,
                    index: j as u32,
                });
            }
        }
    }

    fn spread_step(&mut self, ch: LightChannel, s: Spread, stats: &mut LightStats) {
        let index = s.index as usize;
        let Some(mut here) = self.site(s.handle, index) else {
            return;
        };
        let cells = self.neighbor_cells(s.handle, &here);
        let current = here.cell.light(ch);
        let level = self.derive(ch, &here, &cells);
        if level < current {
            // stale: retract, then re-derive once the removal settles
            self.clear_site(ch, s.handle, index, &here);
            self.queues(ch).spread.push_back(s);
            return;
        }
        if level > current {
            self.write(ch, s.handle, index, level);
            stats.writes += 1;
            self.flag(s.handle, &here);
            match ch {
                LightChannel::Sun => here.cell.sun = level,
                LightChannel::Torch => here.cell.torch = level,
            }
        }
        // writing `here` leaves its neighbors' cells as read
        for f in Face::ALL {
            let (Some((nh, j)), Some(n)) = (here.links[f.index()], cells[f.index()]) else {
                continue;
            };
            let offer = self.transmit(ch, &here.cell, f);
            if offer > n.light(ch) {
                self.queues(ch).spread.push_back(Spread {
                    handle: nh,
                    index: j as u32,
                });
            }
        }
    }
}

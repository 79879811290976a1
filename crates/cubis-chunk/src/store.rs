use std::error::Error;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use hashbrown::HashMap;

use cubis_blocks::MAX_LEVEL;
use cubis_world::{ChunkCoord, ChunkKey, EngineConfig, KeyPacker};

use crate::chunk::{Chunk, RenderState};
use crate::face::Face;
use crate::pool::ChunkPool;

/// Non-owning reference to a pooled chunk. Stops resolving once the slot is
/// unloaded or reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChunkHandle {
    pub slot: u32,
    pub generation: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnloadMode {
    /// Keep render and collider buffers for the next occupant.
    Recycle,
    /// Drop all buffers.
    Destroy,
}

/// What a pre-fill collaborator did to a fresh chunk.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FillOutcome {
    /// At least one non-hole voxel was written.
    pub wrote: bool,
    /// Generation finished; detail passes may run.
    pub complete: bool,
    pub above_surface: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreError {
    PoolExhausted { capacity: usize },
    CoordOutOfRange { coord: ChunkCoord, extent: i32 },
    KeyCollision { key: ChunkKey, existing: ChunkCoord, incoming: ChunkCoord },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::PoolExhausted { capacity } => {
                write!(f, "chunk pool exhausted ({capacity} slots in use)")
            }
            StoreError::CoordOutOfRange { coord, extent } => write!(
                f,
                "chunk ({}, {}, {}) outside world extent ±{extent}",
                coord.cx, coord.cy, coord.cz
            ),
            StoreError::KeyCollision {
                key,
                existing,
                incoming,
            } => write!(
                f,
                "key {:#x} already maps ({}, {}, {}), refusing ({}, {}, {})",
                key.0, existing.cx, existing.cy, existing.cz, incoming.cx, incoming.cy, incoming.cz
            ),
        }
    }
}

impl Error for StoreError {}

#[inline]
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Sparse spatial hash of live chunks over a recycled pool.
pub struct ChunkStore {
    chunk_size: usize,
    global_illumination: bool,
    packer: KeyPacker,
    pool: ChunkPool,
    table: RwLock<HashMap<ChunkKey, ChunkHandle>>,
    last_fetched: Mutex<Option<(ChunkCoord, ChunkHandle)>>,
}

impl ChunkStore {
    pub fn new(cfg: &EngineConfig) -> Self {
        log::info!(
            target: "store",
            "allocating {} chunk slots of {}³",
            cfg.pool_capacity,
            cfg.chunk_size
        );
        Self {
            chunk_size: cfg.chunk_size,
            global_illumination: cfg.global_illumination,
            packer: KeyPacker::new(cfg.world_extent_chunks),
            pool: ChunkPool::new(cfg.pool_capacity, cfg.chunk_size),
            table: RwLock::new(HashMap::with_capacity(cfg.pool_capacity)),
            last_fetched: Mutex::new(None),
        }
    }

    #[inline]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.pool.capacity()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pool.live()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn global_illumination(&self) -> bool {
        self.global_illumination
    }

    pub fn key_of(&self, coord: ChunkCoord) -> Result<ChunkKey, StoreError> {
        self.packer
            .pack(coord)
            .ok_or(StoreError::CoordOutOfRange {
                coord,
                extent: self.packer.extent(),
            })
    }

    fn table_read(&self) -> RwLockReadGuard<'_, HashMap<ChunkKey, ChunkHandle>> {
        self.table.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn table_write(&self) -> RwLockWriteGuard<'_, HashMap<ChunkKey, ChunkHandle>> {
        self.table.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// True while `handle` still names the chunk it was issued for.
    #[inline]
    pub fn is_live(&self, handle: ChunkHandle) -> bool {
        self.pool.is_in_use(handle.slot) && self.pool.generation(handle.slot) == Some(handle.generation)
    }

    pub fn read(&self, handle: ChunkHandle) -> Option<RwLockReadGuard<'_, Chunk>> {
        let slot = self.pool.slot(handle.slot)?;
        let guard = slot.read();
        self.is_live(handle).then_some(guard)
    }

    pub fn write(&self, handle: ChunkHandle) -> Option<RwLockWriteGuard<'_, Chunk>> {
        let slot = self.pool.slot(handle.slot)?;
        let guard = slot.write();
        self.is_live(handle).then_some(guard)
    }

    /// Looks `coord` up, creating it through `fill` when absent and allowed.
    pub fn get<F>(
        &self,
        coord: ChunkCoord,
        create_if_missing: bool,
        fill: F,
    ) -> Result<Option<ChunkHandle>, StoreError>
    where
        F: FnOnce(&mut Chunk) -> FillOutcome,
    {
        let key = self.key_of(coord)?;
        if let Some((c, h)) = *lock(&self.last_fetched) {
            if c == coord && self.is_live(h) {
                return Ok(Some(h));
            }
        }
        let found = self.table_read().get(&key).copied();
        if let Some(h) = found {
            *lock(&self.last_fetched) = Some((coord, h));
            return Ok(Some(h));
        }
        if !create_if_missing {
            return Ok(None);
        }
        self.create(coord, key, fill).map(Some)
    }

    /// Lookup without creation.
    pub fn get_if_present(&self, coord: ChunkCoord) -> Option<ChunkHandle> {
        self.get(coord, false, |_| FillOutcome::default())
            .ok()
            .flatten()
    }

    pub fn get_by_key(&self, key: ChunkKey) -> Option<ChunkHandle> {
        self.table_read().get(&key).copied()
    }

    pub fn handle_of(&self, coord: ChunkCoord) -> Option<ChunkHandle> {
        let key = self.packer.pack(coord)?;
        self.get_by_key(key)
    }

    /// Snapshot of every live handle.
    pub fn loaded(&self) -> Vec<ChunkHandle> {
        self.table_read().values().copied().collect()
    }

    fn create<F>(&self, coord: ChunkCoord, key: ChunkKey, fill: F) -> Result<ChunkHandle, StoreError>
    where
        F: FnOnce(&mut Chunk) -> FillOutcome,
    {
        let Some(slot) = self.pool.claim() else {
            let capacity = self.pool.capacity();
            log::error!(
                target: "store",
                "chunk pool exhausted ({capacity} slots); cannot create ({}, {}, {})",
                coord.cx,
                coord.cy,
                coord.cz
            );
            return Err(StoreError::PoolExhausted { capacity });
        };
        let Some(generation) = self.pool.generation(slot) else {
            self.pool.release(slot);
            return Err(StoreError::PoolExhausted {
                capacity: self.pool.capacity(),
            });
        };
        let handle = ChunkHandle { slot, generation };

        // Fill outside the table lock so collaborators may query the store.
        if let Some(mut chunk) = self.write(handle) {
            chunk.reset(coord);
            let outcome = fill(&mut chunk);
            chunk.populated = outcome.wrote;
            chunk.above_surface = outcome.above_surface;
            if outcome.wrote {
                chunk.render_state = RenderState::Unrendered;
                chunk.dirty = true;
            } else {
                chunk.render_state = RenderState::Empty;
            }
            if !self.global_illumination {
                chunk.voxels_mut().fill_sun(MAX_LEVEL);
            }
        }

        let mut table = self.table_write();
        if let Some(existing) = table.get(&key).copied() {
            drop(table);
            self.abandon(handle);
            let existing_coord = self.read(existing).map(|c| c.coord);
            if existing_coord == Some(coord) {
                return Ok(existing);
            }
            let existing = existing_coord.unwrap_or_else(|| self.packer.unpack(key));
            debug_assert!(
                false,
                "chunk key collision: {key:?} maps {existing:?}, got {coord:?}"
            );
            log::error!(
                target: "store",
                "chunk key collision: {key:?} maps {existing:?}, got {coord:?}"
            );
            return Err(StoreError::KeyCollision {
                key,
                existing,
                incoming: coord,
            });
        }
        table.insert(key, handle);
        drop(table);

        self.link_neighbors(handle, coord);
        *lock(&self.last_fetched) = Some((coord, handle));
        log::trace!(
            target: "store",
            "created chunk ({}, {}, {}) in slot {slot}",
            coord.cx,
            coord.cy,
            coord.cz
        );
        Ok(handle)
    }

    /// Vacates a claimed slot that never made it into the table.
    fn abandon(&self, handle: ChunkHandle) {
        if let Some(mut c) = self.write(handle) {
            c.clear(UnloadMode::Recycle);
        }
        self.pool.release(handle.slot);
    }

    fn link_neighbors(&self, handle: ChunkHandle, coord: ChunkCoord) {
        for face in Face::ALL {
            let (dx, dy, dz) = face.delta();
            let Some(other) = self.handle_of(coord.offset(dx, dy, dz)) else {
                continue;
            };
            if let Some(mut n) = self.write(other) {
                n.neighbors[face.opposite().index()] = Some(handle);
            } else {
                continue;
            }
            if let Some(mut c) = self.write(handle) {
                c.neighbors[face.index()] = Some(other);
            }
        }
    }

    /// Removes the chunk from the table and vacates its slot. Returns false for
    /// stale handles.
    pub fn unload(&self, handle: ChunkHandle, mode: UnloadMode) -> bool {
        let (coord, neighbors) = match self.read(handle) {
            Some(c) => (c.coord, c.neighbors),
            None => return false,
        };
        if let Some(key) = self.packer.pack(coord) {
            let mut table = self.table_write();
            if table.get(&key) == Some(&handle) {
                table.remove(&key);
            }
        }
        {
            let mut last = lock(&self.last_fetched);
            if matches!(*last, Some((_, h)) if h == handle) {
                *last = None;
            }
        }
        for (i, n) in neighbors.iter().enumerate() {
            let Some(n) = *n else { continue };
            if let Some(mut other) = self.write(n) {
                let back = Face::from_index(i).opposite().index();
                if other.neighbors[back] == Some(handle) {
                    other.neighbors[back] = None;
                }
            }
        }
        if let Some(mut c) = self.write(handle) {
            c.clear(mode);
        }
        self.pool.release(handle.slot);
        log::trace!(target: "store", "unloaded chunk ({}, {}, {})", coord.cx, coord.cy, coord.cz);
        true
    }
}

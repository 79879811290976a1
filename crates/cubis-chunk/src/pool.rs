use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::chunk::Chunk;

pub(crate) struct Slot {
    pub(crate) chunk: RwLock<Chunk>,
    /// Bumped on every claim and release; handles carry the value they saw.
    pub(crate) generation: AtomicU32,
    in_use: AtomicBool,
}

impl Slot {
    #[inline]
    pub(crate) fn read(&self) -> RwLockReadGuard<'_, Chunk> {
        self.chunk.read().unwrap_or_else(PoisonError::into_inner)
    }

    #[inline]
    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, Chunk> {
        self.chunk.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Fixed set of chunk slots allocated up front and recycled round-robin.
pub struct ChunkPool {
    slots: Box<[Slot]>,
    cursor: AtomicUsize,
    live: AtomicUsize,
}

impl ChunkPool {
    pub fn new(capacity: usize, chunk_size: usize) -> Self {
        let slots = (0..capacity)
            .map(|_| Slot {
                chunk: RwLock::new(Chunk::new(chunk_size)),
                generation: AtomicU32::new(0),
                in_use: AtomicBool::new(false),
            })
            .collect();
        Self {
            slots,
            cursor: AtomicUsize::new(0),
            live: AtomicUsize::new(0),
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn live(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn slot(&self, index: u32) -> Option<&Slot> {
        self.slots.get(index as usize)
    }

    /// Claims the next vacant slot after the cursor. Never steals a live one.
    pub(crate) fn claim(&self) -> Option<u32> {
        let cap = self.slots.len();
        let start = self.cursor.load(Ordering::Relaxed);
        for step in 0..cap {
            let i = (start + step) % cap;
            if self.slots[i]
                .in_use
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                self.cursor.store((i + 1) % cap, Ordering::Relaxed);
                self.slots[i].generation.fetch_add(1, Ordering::AcqRel);
                self.live.fetch_add(1, Ordering::AcqRel);
                return Some(i as u32);
            }
        }
        None
    }

    pub(crate) fn release(&self, index: u32) {
        if let Some(slot) = self.slot(index) {
            slot.generation.fetch_add(1, Ordering::AcqRel);
            if slot.in_use.swap(false, Ordering::AcqRel) {
                self.live.fetch_sub(1, Ordering::AcqRel);
            }
        }
    }

    #[inline]
    pub(crate) fn generation(&self, index: u32) -> Option<u32> {
        self.slot(index)
            .map(|s| s.generation.load(Ordering::Acquire))
    }

    pub(crate) fn is_in_use(&self, index: u32) -> bool {
        self.slot(index)
            .is_some_and(|s| s.in_use.load(Ordering::Acquire))
    }
}

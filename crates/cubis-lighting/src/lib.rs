//! Incremental sun and torch flood fill across linked chunks.
#![forbid(unsafe_code)]

mod engine;

pub use engine::{LightEngine, LightStats};

use cubis_chunk::{ChunkHandle, Voxel};
use hashbrown::HashSet;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LightChannel {
    Sun,
    Torch,
}

impl LightChannel {
    pub const ALL: [LightChannel; 2] = [LightChannel::Sun, LightChannel::Torch];

    #[inline]
    pub fn get(self, v: &Voxel) -> u8 {
        match self {
            LightChannel::Sun => v.sun,
            LightChannel::Torch => v.torch,
        }
    }

    #[inline]
    pub fn set(self, v: &mut Voxel, level: u8) {
        match self {
            LightChannel::Sun => v.sun = level,
            LightChannel::Torch => v.torch = level,
        }
    }
}

/// Receives the chunks whose light changed and need remeshing.
pub trait RefreshSink {
    fn refresh(&mut self, chunk: ChunkHandle);
}

impl RefreshSink for HashSet<ChunkHandle> {
    fn refresh(&mut self, chunk: ChunkHandle) {
        self.insert(chunk);
    }
}

impl RefreshSink for Vec<ChunkHandle> {
    fn refresh(&mut self, chunk: ChunkHandle) {
        if !self.contains(&chunk) {
            self.push(chunk);
        }
    }
}

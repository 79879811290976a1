//! World addressing, engine configuration, chunk key packing and terrain sampling.
#![forbid(unsafe_code)]

pub mod config;
pub mod key;
pub mod terrain;

pub use config::{ConfigError, EngineConfig, TerrainParams};
pub use key::{ChunkKey, KeyPacker};
pub use terrain::{Terrain, TerrainLayer};

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkCoord {
    pub cx: i32,
    pub cy: i32,
    pub cz: i32,
}

impl ChunkCoord {
    #[inline]
    pub const fn new(cx: i32, cy: i32, cz: i32) -> Self {
        Self { cx, cy, cz }
    }

    #[inline]
    pub fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self {
            cx: self.cx + dx,
            cy: self.cy + dy,
            cz: self.cz + dz,
        }
    }

    /// Chebyshev distance in chunks, split into horizontal and vertical parts.
    #[inline]
    pub fn reach(self, other: ChunkCoord) -> (u32, u32) {
        let h = (self.cx - other.cx)
            .unsigned_abs()
            .max((self.cz - other.cz).unsigned_abs());
        let v = (self.cy - other.cy).unsigned_abs();
        (h, v)
    }

    #[inline]
    pub fn distance_sq(self, other: ChunkCoord) -> i64 {
        let dx = i64::from(self.cx - other.cx);
        let dy = i64::from(self.cy - other.cy);
        let dz = i64::from(self.cz - other.cz);
        dx * dx + dy * dy + dz * dz
    }

    /// Minimum world-space voxel corner of this chunk.
    #[inline]
    pub fn origin(self, size: usize) -> WorldPos {
        let s = size as i32;
        WorldPos::new(self.cx * s, self.cy * s, self.cz * s)
    }
}

impl From<(i32, i32, i32)> for ChunkCoord {
    fn from(value: (i32, i32, i32)) -> Self {
        Self::new(value.0, value.1, value.2)
    }
}

impl From<ChunkCoord> for (i32, i32, i32) {
    fn from(value: ChunkCoord) -> Self {
        (value.cx, value.cy, value.cz)
    }
}

/// Integer world-space voxel position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorldPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl WorldPos {
    #[inline]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub fn chunk(self, size: usize) -> ChunkCoord {
        let s = size as i32;
        ChunkCoord::new(
            self.x.div_euclid(s),
            self.y.div_euclid(s),
            self.z.div_euclid(s),
        )
    }

    /// Position inside the owning chunk, each axis in `0..size`.
    #[inline]
    pub fn local(self, size: usize) -> (usize, usize, usize) {
        let s = size as i32;
        (
            self.x.rem_euclid(s) as usize,
            self.y.rem_euclid(s) as usize,
            self.z.rem_euclid(s) as usize,
        )
    }

    #[inline]
    pub fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }
}

impl From<(i32, i32, i32)> for WorldPos {
    fn from(value: (i32, i32, i32)) -> Self {
        Self::new(value.0, value.1, value.2)
    }
}

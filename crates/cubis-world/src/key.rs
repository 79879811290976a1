use crate::ChunkCoord;

/// Integer hash of a chunk coordinate. Unique for every coordinate accepted
/// by the `KeyPacker` that produced it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkKey(pub u64);

/// Packs each axis into its own bit range. The range width comes from the
/// configured world extent, so keys never collide inside `[-extent, extent]`.
#[derive(Clone, Copy, Debug)]
pub struct KeyPacker {
    bits: u32,
    extent: i32,
}

impl KeyPacker {
    /// Widest supported axis: three ranges must fit into 64 bits.
    pub const MAX_BITS: u32 = 21;

    /// Largest extent whose packed axes still fit.
    pub const MAX_EXTENT: u32 = (1 << (Self::MAX_BITS - 1)) - 1;

    pub fn new(extent: u32) -> Self {
        let extent = extent.clamp(1, Self::MAX_EXTENT);
        // values in 0..=2*extent after biasing
        let span = 2 * extent;
        let bits = 32 - span.leading_zeros();
        Self {
            bits,
            extent: extent as i32,
        }
    }

    #[inline]
    pub fn bits_per_axis(&self) -> u32 {
        self.bits
    }

    #[inline]
    pub fn extent(&self) -> i32 {
        self.extent
    }

    #[inline]
    pub fn in_range(&self, c: ChunkCoord) -> bool {
        let e = self.extent;
        (-e..=e).contains(&c.cx) && (-e..=e).contains(&c.cy) && (-e..=e).contains(&c.cz)
    }

    /// `None` when the coordinate lies outside the packable extent.
    #[inline]
    pub fn pack(&self, c: ChunkCoord) -> Option<ChunkKey> {
        if !self.in_range(c) {
            return None;
        }
        let bias = |v: i32| (v + self.extent) as u64;
        let b = self.bits;
        Some(ChunkKey(
            (bias(c.cy) << (2 * b)) | (bias(c.cz) << b) | bias(c.cx),
        ))
    }

    #[inline]
    pub fn unpack(&self, key: ChunkKey) -> ChunkCoord {
        let b = self.bits;
        let mask = (1u64 << b) - 1;
        let unbias = |v: u64| v as i32 - self.extent;
        ChunkCoord::new(
            unbias(key.0 & mask),
            unbias((key.0 >> (2 * b)) & mask),
            unbias((key.0 >> b) & mask),
        )
    }
}

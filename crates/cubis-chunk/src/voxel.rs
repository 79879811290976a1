use cubis_blocks::{HOLE, KindId, MAX_LEVEL, Palette};

/// Per-voxel bit flags: texture rotation in the low two bits, user tint above.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct VoxelFlags(pub u8);

impl VoxelFlags {
    const ROTATION_MASK: u8 = 0b0000_0011;
    const USER_TINT: u8 = 0b0000_0100;

    #[inline]
    pub fn rotation(self) -> u8 {
        self.0 & Self::ROTATION_MASK
    }

    #[inline]
    pub fn with_rotation(self, quarter_turns: u8) -> Self {
        Self((self.0 & !Self::ROTATION_MASK) | (quarter_turns & Self::ROTATION_MASK))
    }

    #[inline]
    pub fn has_user_tint(self) -> bool {
        self.0 & Self::USER_TINT != 0
    }

    #[inline]
    pub fn with_user_tint(self, on: bool) -> Self {
        if on {
            Self(self.0 | Self::USER_TINT)
        } else {
            Self(self.0 & !Self::USER_TINT)
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Voxel {
    pub kind: KindId,
    /// 0..=15. Always 0 for the hole kind.
    pub opacity: u8,
    pub sun: u8,
    pub torch: u8,
    pub tint: [u8; 3],
    pub flags: VoxelFlags,
}

impl Default for Voxel {
    fn default() -> Self {
        Self::HOLE
    }
}

impl Voxel {
    pub const HOLE: Voxel = Voxel {
        kind: HOLE,
        opacity: 0,
        sun: 0,
        torch: 0,
        tint: [255, 255, 255],
        flags: VoxelFlags(0),
    };

    #[inline]
    pub fn new(kind: KindId, opacity: u8) -> Self {
        Self {
            kind,
            opacity: if kind == HOLE {
                0
            } else {
                opacity.min(MAX_LEVEL)
            },
            ..Self::HOLE
        }
    }

    /// Voxel of `kind` carrying the palette opacity.
    #[inline]
    pub fn of_kind(palette: &Palette, kind: KindId) -> Self {
        Self::new(kind, palette.opacity(kind))
    }

    #[inline]
    pub fn with_tint(mut self, tint: [u8; 3]) -> Self {
        self.tint = tint;
        self.flags = self.flags.with_user_tint(true);
        self
    }

    #[inline]
    pub fn is_hole(&self) -> bool {
        self.kind == HOLE
    }

    #[inline]
    pub fn is_opaque(&self) -> bool {
        self.opacity >= MAX_LEVEL
    }

    /// Tint to multiply into face colors; white unless the user set one.
    #[inline]
    pub fn effective_tint(&self) -> [u8; 3] {
        if self.flags.has_user_tint() {
            self.tint
        } else {
            [255, 255, 255]
        }
    }
}

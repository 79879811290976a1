//! Engine-wide voxel palette: kinds, their light behavior and material slots.
#![forbid(unsafe_code)]

pub mod config;
pub mod palette;

pub use config::{KindDef, PaletteConfig};
pub use palette::{KindId, Palette, PaletteError, VoxelKind};

/// Palette index reserved for the empty voxel.
pub const HOLE: KindId = 0;
/// Highest light and opacity level.
pub const MAX_LEVEL: u8 = 15;
/// Number of material slots a chunk mesh can be split into.
pub const MATERIAL_SLOTS: usize = 16;

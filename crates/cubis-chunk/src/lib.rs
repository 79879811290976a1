//! Voxel storage: grids, chunk entities, overlays and the pooled chunk store.
#![forbid(unsafe_code)]

pub mod chunk;
pub mod extras;
pub mod face;
pub mod generate;
pub mod grid;
pub mod pool;
pub mod render;
pub mod store;
pub mod voxel;

pub use chunk::{Chunk, NavMeshHandle, RenderState};
pub use extras::{ChunkExtras, LightSource, PropertyValue};
pub use face::Face;
pub use generate::{TerrainKinds, fill_terrain};
pub use grid::{Step, VoxelGrid};
pub use render::{ColliderMesh, RenderMesh, SubMesh};
pub use store::{ChunkHandle, ChunkStore, FillOutcome, StoreError, UnloadMode};
pub use voxel::{Voxel, VoxelFlags};

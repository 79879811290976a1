//! CPU surface extraction for one chunk and its 26 neighbors.
#![forbid(unsafe_code)]

mod constants;
mod emit;
pub mod extract;
pub mod mesh_build;
pub mod neighborhood;

pub use extract::{ExtractOptions, MeshOutput, extract, extract_into};
pub use mesh_build::{MeshBuild, face_rect};
pub use neighborhood::{Neighborhood, Sentinels};

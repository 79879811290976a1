//! Main-thread engine façade and the pinned mesh worker pipeline.
#![forbid(unsafe_code)]

pub mod engine;
pub mod hooks;
pub mod pipeline;
pub mod render;

pub use engine::{Engine, EngineError, EngineStats, TickReport, ViewChange};
pub use hooks::{NoHooks, TerrainHooks, WorldHooks};
pub use pipeline::{MeshJob, MeshPipeline, resolve_workers};
pub use render::{fill_render_mesh, store_collider};

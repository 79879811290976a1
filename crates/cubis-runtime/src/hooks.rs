use cubis_blocks::Palette;
use cubis_chunk::{Chunk, ChunkHandle, ColliderMesh, FillOutcome, NavMeshHandle, TerrainKinds, fill_terrain};
use cubis_geom::Vec3;
use cubis_world::{ChunkCoord, Terrain, TerrainParams};

/// Callbacks into the game around the chunk lifecycle. Every method defaults to a no-op.
pub trait WorldHooks {
    /// Fills a freshly claimed chunk. The default leaves it empty and finished.
    fn before_chunk_create(&mut self, _chunk: &mut Chunk) -> FillOutcome {
        FillOutcome {
            complete: true,
            ..FillOutcome::default()
        }
    }

    /// Decorates a chunk whose pre-fill reported `complete` (trees, ores).
    /// Returns whether anything was written.
    fn detail_generators(&mut self, _chunk: &mut Chunk) -> bool {
        false
    }

    /// Announces a new chunk. Chunks left incomplete by their pre-fill are not announced.
    fn after_chunk_create(&mut self, _handle: ChunkHandle, _chunk: &Chunk) {}

    /// A finished mesh was installed on the chunk.
    fn chunk_rendered(&mut self, _handle: ChunkHandle, _chunk: &Chunk) {}

    /// The chunk entered (`true`) or left the view distance.
    fn chunk_visibility_changed(&mut self, _handle: ChunkHandle, _coord: ChunkCoord, _visible: bool) {}

    fn in_frustum(&self, _coord: ChunkCoord, _center: Vec3) -> bool {
        true
    }

    /// Bakes a navigation contribution from walkable faces.
    fn nav_built(&mut self, _handle: ChunkHandle, _faces: &ColliderMesh) -> Option<NavMeshHandle> {
        None
    }

    fn nav_released(&mut self, _nav: NavMeshHandle) {}
}

/// Hooks that do nothing; chunks start empty.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoHooks;

impl WorldHooks for NoHooks {}

/// Fills chunks from the noise heightmap.
pub struct TerrainHooks {
    terrain: Terrain,
    kinds: TerrainKinds,
}

impl TerrainHooks {
    pub fn new(params: TerrainParams, palette: &Palette) -> Self {
        Self {
            terrain: Terrain::new(params),
            kinds: TerrainKinds::from_palette(palette),
        }
    }

    pub fn terrain(&self) -> &Terrain {
        &self.terrain
    }
}

impl WorldHooks for TerrainHooks {
    fn before_chunk_create(&mut self, chunk: &mut Chunk) -> FillOutcome {
        fill_terrain(chunk, &self.terrain, &self.kinds)
    }
}

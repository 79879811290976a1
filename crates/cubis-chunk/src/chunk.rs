use std::sync::Arc;

use cubis_geom::Vec3;
use cubis_world::ChunkCoord;

use crate::extras::ChunkExtras;
use crate::face::Face;
use crate::grid::VoxelGrid;
use crate::render::{ColliderMesh, RenderMesh};
use crate::store::{ChunkHandle, UnloadMode};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RenderState {
    #[default]
    Unrendered,
    Queued,
    Ready,
    /// No geometry; nothing to draw.
    Empty,
}

/// Opaque id of a navigation contribution owned by the nav collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NavMeshHandle(pub u64);

/// One pooled chunk. Lives in its pool slot for the lifetime of the store.
#[derive(Debug)]
pub struct Chunk {
    pub coord: ChunkCoord,
    pub center: Vec3,
    grid: Arc<VoxelGrid>,
    /// Face-indexed links to loaded neighbor chunks.
    pub neighbors: [Option<ChunkHandle>; 6],
    pub render_state: RenderState,
    pub dirty: bool,
    pub populated: bool,
    pub modified: bool,
    pub above_surface: bool,
    pub force_mesh: bool,
    pub rebuild_collider: bool,
    pub in_view: bool,
    pub extras: ChunkExtras,
    pub nav: Option<NavMeshHandle>,
    pub collider: Option<ColliderMesh>,
    pub render: Option<RenderMesh>,
}

impl Chunk {
    pub fn new(size: usize) -> Self {
        Self {
            coord: ChunkCoord::default(),
            center: Vec3::ZERO,
            grid: Arc::new(VoxelGrid::new(size)),
            neighbors: [None; 6],
            render_state: RenderState::Unrendered,
            dirty: false,
            populated: false,
            modified: false,
            above_surface: false,
            force_mesh: false,
            rebuild_collider: false,
            in_view: false,
            extras: ChunkExtras::default(),
            nav: None,
            collider: None,
            render: None,
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.grid.size()
    }

    #[inline]
    pub fn voxels(&self) -> &VoxelGrid {
        &self.grid
    }

    /// Mutable grid access. Clones first if a mesh job still holds a snapshot.
    #[inline]
    pub fn voxels_mut(&mut self) -> &mut VoxelGrid {
        Arc::make_mut(&mut self.grid)
    }

    /// Shared, immutable view of the current voxels.
    #[inline]
    pub fn snapshot(&self) -> Arc<VoxelGrid> {
        Arc::clone(&self.grid)
    }

    #[inline]
    pub fn neighbor(&self, face: Face) -> Option<ChunkHandle> {
        self.neighbors[face.index()]
    }

    /// Prepares a claimed slot for `coord`.
    pub(crate) fn reset(&mut self, coord: ChunkCoord) {
        let n = self.size();
        let half = n as f32 * 0.5;
        let o = coord.origin(n);
        self.coord = coord;
        self.center = Vec3::new(o.x as f32 + half, o.y as f32 + half, o.z as f32 + half);
        self.neighbors = [None; 6];
        self.render_state = RenderState::Unrendered;
        self.dirty = false;
        self.populated = false;
        self.modified = false;
        self.above_surface = false;
        self.force_mesh = false;
        self.rebuild_collider = false;
        self.in_view = false;
    }

    /// Returns the chunk to its vacant state.
    pub(crate) fn clear(&mut self, mode: UnloadMode) {
        let n = self.size();
        match Arc::get_mut(&mut self.grid) {
            Some(g) => g.clear(),
            None => self.grid = Arc::new(VoxelGrid::new(n)),
        }
        self.extras.clear();
        self.neighbors = [None; 6];
        self.populated = false;
        self.dirty = false;
        self.render_state = RenderState::Unrendered;
        self.nav = None;
        match mode {
            UnloadMode::Recycle => {
                if let Some(m) = self.render.as_mut() {
                    m.clear_keep_capacity();
                }
                if let Some(c) = self.collider.as_mut() {
                    c.clear_keep_capacity();
                }
            }
            UnloadMode::Destroy => {
                self.render = None;
                self.collider = None;
            }
        }
    }

    /// Flags the chunk for remeshing.
    #[inline]
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// True when the chunk holds drawable data or the caller forces a mesh.
    #[inline]
    pub fn wants_mesh(&self) -> bool {
        self.dirty && (self.populated || self.force_mesh)
    }
}

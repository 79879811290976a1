use cubis_geom::Aabb;

/// Index range of one material inside a `RenderMesh`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubMesh {
    pub material: u8,
    pub first_index: u32,
    pub index_count: u32,
}

/// Renderer-ready chunk surface: one vertex buffer, per-material index ranges.
#[derive(Clone, Debug, Default)]
pub struct RenderMesh {
    pub positions: Vec<f32>,
    pub normals: Vec<f32>,
    pub uvs: Vec<f32>,
    /// RGBA per vertex with face light baked in.
    pub colors: Vec<u8>,
    pub indices: Vec<u32>,
    pub submeshes: Vec<SubMesh>,
    pub bounds: Aabb,
    /// Some voxel carries a user tint.
    pub tinted: bool,
}

impl RenderMesh {
    /// Clears all arrays but retains capacity for reuse.
    pub fn clear_keep_capacity(&mut self) {
        self.positions.clear();
        self.normals.clear();
        self.uvs.clear();
        self.colors.clear();
        self.indices.clear();
        self.submeshes.clear();
        self.bounds = Aabb::EMPTY;
        self.tinted = false;
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Triangle soup of solid faces handed to the physics collaborator.
#[derive(Clone, Debug, Default)]
pub struct ColliderMesh {
    pub positions: Vec<f32>,
    pub indices: Vec<u32>,
}

impl ColliderMesh {
    pub fn clear_keep_capacity(&mut self) {
        self.positions.clear();
        self.indices.clear();
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

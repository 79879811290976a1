use cubis_chunk::Face;
use cubis_geom::Vec3;

#[derive(Default, Clone, Debug)]
pub struct MeshBuild {
    pub pos: Vec<f32>,
    pub norm: Vec<f32>,
    pub uv: Vec<f32>,
    pub idx: Vec<u32>,
    pub col: Vec<u8>,
}

/// Corners `(a, b, c, d)` of a face-aligned `u1 × v1` rectangle at `origin`.
pub fn face_rect(face: Face, origin: Vec3, u1: f32, v1: f32) -> [Vec3; 4] {
    let o = origin;
    match face {
        Face::PosY => [
            o,
            Vec3::new(o.x + u1, o.y, o.z),
            Vec3::new(o.x + u1, o.y, o.z + v1),
            Vec3::new(o.x, o.y, o.z + v1),
        ],
        Face::NegY => [
            Vec3::new(o.x, o.y, o.z + v1),
            Vec3::new(o.x + u1, o.y, o.z + v1),
            Vec3::new(o.x + u1, o.y, o.z),
            o,
        ],
        Face::PosX => [
            Vec3::new(o.x, o.y + v1, o.z + u1),
            Vec3::new(o.x, o.y + v1, o.z),
            o,
            Vec3::new(o.x, o.y, o.z + u1),
        ],
        Face::NegX => [
            Vec3::new(o.x, o.y + v1, o.z),
            Vec3::new(o.x, o.y + v1, o.z + u1),
            Vec3::new(o.x, o.y, o.z + u1),
            o,
        ],
        Face::PosZ => [
            Vec3::new(o.x + u1, o.y + v1, o.z),
            Vec3::new(o.x, o.y + v1, o.z),
            o,
            Vec3::new(o.x + u1, o.y, o.z),
        ],
        Face::NegZ => [
            Vec3::new(o.x, o.y + v1, o.z),
            Vec3::new(o.x + u1, o.y + v1, o.z),
            Vec3::new(o.x + u1, o.y, o.z),
            o,
        ],
    }
}

/// Vertex order for a quad so its triangles face along `n`.
/// Returns the permutation applied to `[a, b, c, d]`.
#[inline]
pub(crate) fn wind(corners: [Vec3; 4], n: Vec3) -> ([Vec3; 4], [usize; 4]) {
    let [a, b, c, d] = corners;
    let mut vs = [a, d, c, b];
    let mut order = [0, 3, 2, 1];
    let cross = (vs[1] - vs[0]).cross(vs[2] - vs[0]);
    if cross.dot(n) < 0.0 {
        vs.swap(1, 3);
        order.swap(1, 3);
    }
    (vs, order)
}

impl MeshBuild {
    /// Clears all arrays but retains capacity for reuse across frames.
    #[inline]
    pub fn clear_keep_capacity(&mut self) {
        self.pos.clear();
        self.norm.clear();
        self.uv.clear();
        self.idx.clear();
        self.col.clear();
    }
    /// Pre-reserve capacity for approximately `n_quads` quads worth of data.
    #[inline]
    pub fn reserve_quads(&mut self, n_quads: usize) {
        // 4 vertices per quad
        self.pos.reserve(n_quads * 4 * 3);
        self.norm.reserve(n_quads * 4 * 3);
        self.uv.reserve(n_quads * 4 * 2);
        self.col.reserve(n_quads * 4 * 4);
        self.idx.reserve(n_quads * 6);
    }

    /// Appends a quad with explicit per-vertex UVs.
    pub fn add_quad_uv(&mut self, corners: [Vec3; 4], n: Vec3, uvs: [(f32, f32); 4], rgba: [u8; 4]) {
        let base = (self.pos.len() / 3) as u32;
        let (vs, order) = wind(corners, n);
        for (v, &k) in vs.iter().zip(order.iter()) {
            let (u, t) = uvs[k];
            self.pos.extend_from_slice(&[v.x, v.y, v.z]);
            self.norm.extend_from_slice(&[n.x, n.y, n.z]);
            // flip V so textures aren't upside-down (top-left origin)
            self.uv.extend_from_slice(&[u, -t]);
            self.col.extend_from_slice(&rgba);
        }
        self.idx
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    /// Emits a face-aligned rectangle for the given face at `origin` with size `(u1,v1)`.
    /// `rotation` turns the texture by quarter turns.
    pub fn add_face_rect(
        &mut self,
        face: Face,
        origin: Vec3,
        u1: f32,
        v1: f32,
        rotation: u8,
        rgba: [u8; 4],
    ) {
        let corners = face_rect(face, origin, u1, v1);
        // Derive absolute UVs from local coordinates per face orientation
        let uv_from = |p: Vec3| match face {
            Face::PosY | Face::NegY => (p.x, p.z),
            Face::PosX | Face::NegX => (p.z, p.y),
            Face::PosZ | Face::NegZ => (p.x, p.y),
        };
        let mut uvs = corners.map(uv_from);
        uvs.rotate_left((rotation & 3) as usize);
        self.add_quad_uv(corners, face.normal(), uvs, rgba);
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.pos.len() / 3
    }

    #[inline]
    pub fn quad_count(&self) -> usize {
        self.idx.len() / 6
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.idx.is_empty()
    }
}

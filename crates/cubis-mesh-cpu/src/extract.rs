use cubis_blocks::{HOLE, MATERIAL_SLOTS, Palette};
use cubis_chunk::{ColliderMesh, Face, Voxel};
use cubis_geom::{Aabb, Vec3};

use crate::constants::{BRIGHTNESS, OPAQUE_ALPHA, SENTINEL_KIND};
use crate::emit::{emit_face, emit_soup_face};
use crate::mesh_build::MeshBuild;
use crate::neighborhood::Neighborhood;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Collect solid faces into `MeshOutput::collider`.
    pub collider: bool,
    /// Collect walkable up-faces into `MeshOutput::nav`.
    pub nav: bool,
}

/// Everything one extraction produces for a chunk. Positions are chunk-local.
#[derive(Clone, Debug)]
pub struct MeshOutput {
    /// One build per material slot.
    pub parts: Vec<MeshBuild>,
    pub collider: ColliderMesh,
    pub nav: ColliderMesh,
    pub bounds: Aabb,
    /// At least one emitted face carries a user tint.
    pub tinted: bool,
    /// The job panicked; contents are empty.
    pub failed: bool,
}

impl Default for MeshOutput {
    fn default() -> Self {
        Self {
            parts: vec![MeshBuild::default(); MATERIAL_SLOTS],
            collider: ColliderMesh::default(),
            nav: ColliderMesh::default(),
            bounds: Aabb::EMPTY,
            tinted: false,
            failed: false,
        }
    }
}

impl MeshOutput {
    /// Clears every buffer but keeps capacity.
    pub fn clear(&mut self) {
        for p in &mut self.parts {
            p.clear_keep_capacity();
        }
        self.collider.clear_keep_capacity();
        self.nav.clear_keep_capacity();
        self.bounds = Aabb::EMPTY;
        self.tinted = false;
        self.failed = false;
    }

    pub fn quad_count(&self) -> usize {
        self.parts.iter().map(MeshBuild::quad_count).sum()
    }

    pub fn triangle_count(&self) -> usize {
        self.quad_count() * 2
    }

    /// No render geometry.
    pub fn is_empty(&self) -> bool {
        self.parts.iter().all(MeshBuild::is_empty)
    }

    /// Failed output: empty buffers and the failure flag set.
    pub fn mark_failed(&mut self) {
        self.clear();
        self.failed = true;
    }
}

#[inline]
fn face_origin(face: Face, x: f32, y: f32, z: f32) -> Vec3 {
    match face {
        Face::PosY => Vec3::new(x, y + 1.0, z),
        Face::PosX => Vec3::new(x + 1.0, y, z),
        Face::PosZ => Vec3::new(x, y, z + 1.0),
        Face::NegY | Face::NegX | Face::NegZ => Vec3::new(x, y, z),
    }
}

#[inline]
fn is_solid(palette: &Palette, v: Voxel) -> bool {
    v.kind == SENTINEL_KIND || palette.is_solid(v.kind)
}

/// A face of `v` shows when the neighbor across it lets light and view
/// through and is not more of the same translucent kind.
#[inline]
fn face_visible(v: Voxel, across: Voxel) -> bool {
    if across.is_opaque() {
        return false;
    }
    !(across.kind == v.kind && !v.is_opaque())
}

#[inline]
fn shade(tint: [u8; 3], light: u8) -> [u8; 4] {
    let b = BRIGHTNESS[light.min(15) as usize] as u32;
    [
        (tint[0] as u32 * b / 255) as u8,
        (tint[1] as u32 * b / 255) as u8,
        (tint[2] as u32 * b / 255) as u8,
        OPAQUE_ALPHA,
    ]
}

pub fn extract(nb: &Neighborhood, palette: &Palette, opts: ExtractOptions) -> MeshOutput {
    let mut out = MeshOutput::default();
    extract_into(nb, palette, opts, &mut out);
    out
}

/// Face-culling surface extraction of the center chunk into a reused output.
pub fn extract_into(nb: &Neighborhood, palette: &Palette, opts: ExtractOptions, out: &mut MeshOutput) {
    out.clear();
    let n = nb.size();
    let grid = nb.center();
    let mut bmin = Vec3::splat(f32::MAX);
    let mut bmax = Vec3::splat(f32::MIN);
    let mut any = false;
    for (i, &v) in grid.as_slice().iter().enumerate() {
        if v.kind == HOLE {
            continue;
        }
        let (x, y, z) = grid.coords(i);
        let (xi, yi, zi) = (x as i32, y as i32, z as i32);
        let (xf, yf, zf) = (x as f32, y as f32, z as f32);
        let solid = is_solid(palette, v);
        let material = palette.material(v.kind);
        let tint = v.effective_tint();
        let mut emitted = false;
        for face in Face::ALL {
            let (dx, dy, dz) = face.delta();
            let across = nb.get(xi + dx, yi + dy, zi + dz);
            let origin = face_origin(face, xf, yf, zf);
            if face_visible(v, across) {
                let light = across.sun.max(across.torch);
                emit_face(
                    &mut out.parts,
                    material,
                    face,
                    origin,
                    v.flags.rotation(),
                    shade(tint, light),
                );
                emitted = true;
            }
            if solid && !is_solid(palette, across) {
                if opts.collider {
                    emit_soup_face(&mut out.collider, face, origin);
                }
                if opts.nav && face == Face::PosY && palette.get(v.kind).is_some_and(|k| k.walkable) {
                    emit_soup_face(&mut out.nav, face, origin);
                }
            }
        }
        if emitted {
            any = true;
            out.tinted |= v.flags.has_user_tint();
            bmin = bmin.min(Vec3::new(xf, yf, zf));
            bmax = bmax.max(Vec3::new(xf + 1.0, yf + 1.0, zf + 1.0));
        }
    }
    if any {
        out.bounds = Aabb::new(bmin, bmax);
    }
    log::trace!(
        target: "mesh",
        "extracted {} quads from {}³ chunk",
        out.quad_count(),
        n
    );
}

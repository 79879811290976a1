use cubis_blocks::MATERIAL_SLOTS;
use cubis_chunk::{ColliderMesh, Face};
use cubis_geom::Vec3;

use crate::constants::INITIAL_QUAD_CAP;
use crate::mesh_build::{MeshBuild, face_rect, wind};

// Fast-path sink for writing into per-material mesh buffers without map overhead.
pub(crate) trait BuildSink {
    fn get_build_mut(&mut self, material: u8) -> &mut MeshBuild;
}

impl BuildSink for Vec<MeshBuild> {
    #[inline]
    fn get_build_mut(&mut self, material: u8) -> &mut MeshBuild {
        let ix = (material as usize).min(MATERIAL_SLOTS - 1);
        if self.len() <= ix {
            self.resize_with(ix + 1, MeshBuild::default);
        }
        let mb = &mut self[ix];
        if mb.pos.capacity() == 0 {
            // Lazy small reserve to reduce early reallocs when a material is first used in a chunk
            mb.reserve_quads(INITIAL_QUAD_CAP);
        }
        mb
    }
}

/// Emits a unit voxel face into the material's mesh build.
#[inline]
pub(crate) fn emit_face(
    builds: &mut impl BuildSink,
    material: u8,
    face: Face,
    origin: Vec3,
    rotation: u8,
    rgba: [u8; 4],
) {
    builds
        .get_build_mut(material)
        .add_face_rect(face, origin, 1.0, 1.0, rotation, rgba);
}

/// Appends a unit face to a position/index triangle soup.
pub(crate) fn emit_soup_face(soup: &mut ColliderMesh, face: Face, origin: Vec3) {
    let base = (soup.positions.len() / 3) as u32;
    let (vs, _) = wind(face_rect(face, origin, 1.0, 1.0), face.normal());
    for v in vs {
        soup.positions.extend_from_slice(&[v.x, v.y, v.z]);
    }
    soup.indices
        .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
}

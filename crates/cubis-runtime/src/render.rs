use cubis_chunk::{ColliderMesh, RenderMesh, SubMesh};
use cubis_mesh_cpu::MeshOutput;

/// Packs per-material builds into one vertex buffer with an index range per material.
pub fn fill_render_mesh(out: &MeshOutput, mesh: &mut RenderMesh) {
    mesh.clear_keep_capacity();
    let quads = out.quad_count();
    mesh.positions.reserve(quads * 12);
    mesh.normals.reserve(quads * 12);
    mesh.uvs.reserve(quads * 8);
    mesh.colors.reserve(quads * 16);
    mesh.indices.reserve(quads * 6);
    for (material, part) in out.parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        let base = mesh.vertex_count() as u32;
        let first_index = mesh.indices.len() as u32;
        mesh.positions.extend_from_slice(&part.pos);
        mesh.normals.extend_from_slice(&part.norm);
        mesh.uvs.extend_from_slice(&part.uv);
        mesh.colors.extend_from_slice(&part.col);
        mesh.indices.extend(part.idx.iter().map(|i| i + base));
        mesh.submeshes.push(SubMesh {
            material: material as u8,
            first_index,
            index_count: part.idx.len() as u32,
        });
    }
    mesh.bounds = out.bounds;
    mesh.tinted = out.tinted;
}

/// Copies a collision soup into `slot`, reusing its buffers. Empty soups clear the slot.
pub fn store_collider(soup: &ColliderMesh, slot: &mut Option<ColliderMesh>) {
    if soup.is_empty() {
        *slot = None;
        return;
    }
    let dst = slot.get_or_insert_with(ColliderMesh::default);
    dst.positions.clone_from(&soup.positions);
    dst.indices.clone_from(&soup.indices);
}

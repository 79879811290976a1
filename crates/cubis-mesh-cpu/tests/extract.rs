use std::sync::Arc;

use cubis_blocks::{MAX_LEVEL, Palette};
use cubis_chunk::{Voxel, VoxelGrid};
use cubis_mesh_cpu::{ExtractOptions, Neighborhood, Sentinels, extract};
use proptest::prelude::*;

const N: usize = 4;

fn palette() -> Palette {
    Palette::builtin()
}

fn kind(name: &str) -> Voxel {
    let p = palette();
    Voxel::of_kind(&p, p.id_by_name(name).unwrap())
}

fn open_air(center: VoxelGrid) -> Neighborhood {
    let s = Sentinels::new(N);
    let air = Arc::clone(&s.air);
    Neighborhood::gather(Arc::new(center), &s, |_, _, _| Some(Arc::clone(&air)))
}

fn all() -> ExtractOptions {
    ExtractOptions {
        collider: true,
        nav: true,
    }
}

#[test]
fn lone_voxel_has_six_faces() {
    let p = palette();
    let mut g = VoxelGrid::new(N);
    g.set(1, 1, 1, kind("stone"));
    let out = extract(&open_air(g), &p, all());
    let slot = p.material(p.id_by_name("stone").unwrap()) as usize;
    assert_eq!(out.parts[slot].quad_count(), 6);
    assert_eq!(out.quad_count(), 6);
    assert_eq!(out.triangle_count(), 12);
    assert_eq!(out.collider.indices.len(), 36);
    assert_eq!(out.nav.indices.len(), 6);
    assert_eq!(out.bounds.min.x, 1.0);
    assert_eq!(out.bounds.max.y, 2.0);
    assert!(!out.tinted);
}

#[test]
fn shared_faces_between_opaque_voxels_are_culled() {
    let mut g = VoxelGrid::new(N);
    g.set(1, 1, 1, kind("stone"));
    g.set(2, 1, 1, kind("dirt"));
    let out = extract(&open_air(g), &palette(), ExtractOptions::default());
    assert_eq!(out.quad_count(), 10);
    assert!(out.collider.is_empty() && out.nav.is_empty());
}

#[test]
fn neighbor_chunk_hides_border_faces() {
    let p = palette();
    let s = Sentinels::new(N);
    let mut center = VoxelGrid::new(N);
    center.set(N - 1, 0, 0, kind("stone"));
    let mut east = VoxelGrid::new(N);
    east.set(0, 0, 0, kind("stone"));
    let east = Arc::new(east);
    let air = Arc::clone(&s.air);
    let nb = Neighborhood::gather(Arc::new(center), &s, |dx, _, _| {
        Some(if dx == 1 { Arc::clone(&east) } else { Arc::clone(&air) })
    });
    assert_eq!(extract(&nb, &p, ExtractOptions::default()).quad_count(), 5);
}

#[test]
fn unloaded_sides_cull_and_sky_stays_open() {
    let s = Sentinels::new(N);
    let g = VoxelGrid::filled(N, kind("stone"));
    let out = extract(&Neighborhood::isolated(Arc::new(g), &s), &palette(), all());
    // only the top layer faces the sky sentinel
    assert_eq!(out.quad_count(), N * N);
    assert_eq!(out.nav.indices.len(), N * N * 6);
}

#[test]
fn water_merges_but_shows_against_glass() {
    let mut g = VoxelGrid::new(N);
    g.set(0, 0, 0, kind("water"));
    g.set(1, 0, 0, kind("water"));
    g.set(2, 0, 0, kind("glass"));
    let out = extract(&open_air(g), &palette(), ExtractOptions::default());
    // water: 10 outer faces, glass: 6 (its face toward water is visible too)
    assert_eq!(out.quad_count(), 16);
}

#[test]
fn face_color_follows_light_across_it() {
    let p = palette();
    let mut g = VoxelGrid::new(N);
    let mut lit = Voxel::HOLE;
    lit.torch = MAX_LEVEL;
    g.set(1, 1, 1, kind("stone").with_tint([255, 0, 0]));
    g.set(1, 2, 1, lit);
    // leave the rest dark by using a dark neighborhood
    let s = Sentinels::new(N);
    let dark = Arc::new(VoxelGrid::new(N));
    let nb = Neighborhood::gather(Arc::new(g), &s, |_, _, _| Some(Arc::clone(&dark)));
    let out = extract(&nb, &p, ExtractOptions::default());
    let slot = p.material(p.id_by_name("stone").unwrap()) as usize;
    let cols = &out.parts[slot].col;
    let reds: Vec<u8> = cols.chunks(4).map(|c| c[0]).collect();
    assert!(reds.contains(&255));
    assert!(reds.contains(&18));
    assert!(cols.chunks(4).all(|c| c[1] == 0 && c[2] == 0 && c[3] == 255));
    assert!(out.tinted);
}

fn exposed_faces(g: &VoxelGrid) -> usize {
    let n = g.size() as i32;
    let mut count = 0;
    for i in 0..g.len() {
        let v = g.at(i);
        if v.is_hole() {
            continue;
        }
        let (x, y, z) = g.coords(i);
        for (dx, dy, dz) in [(1, 0, 0), (-1, 0, 0), (0, 1, 0), (0, -1, 0), (0, 0, 1), (0, 0, -1)] {
            let (nx, ny, nz) = (x as i32 + dx, y as i32 + dy, z as i32 + dz);
            let inside = (0..n).contains(&nx) && (0..n).contains(&ny) && (0..n).contains(&nz);
            if !inside || g.get(nx as usize, ny as usize, nz as usize).is_hole() {
                count += 1;
            }
        }
    }
    count
}

proptest! {
    #[test]
    fn quad_count_matches_exposed_faces(cells in prop::collection::vec(any::<bool>(), N * N * N)) {
        let mut g = VoxelGrid::new(N);
        for (i, on) in cells.iter().enumerate() {
            if *on {
                *g.at_mut(i) = kind("stone");
            }
        }
        let expect = exposed_faces(&g);
        let out = extract(&open_air(g), &palette(), ExtractOptions::default());
        prop_assert_eq!(out.quad_count(), expect);
    }
}

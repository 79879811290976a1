use rayon::prelude::*;

use cubis_blocks::{HOLE, KindId, Palette};
use cubis_world::{Terrain, TerrainLayer};

use crate::chunk::Chunk;
use crate::store::FillOutcome;
use crate::voxel::Voxel;

/// Palette kinds painted for each terrain band.
#[derive(Clone, Copy, Debug)]
pub struct TerrainKinds {
    pub grass: Voxel,
    pub dirt: Voxel,
    pub stone: Voxel,
}

impl TerrainKinds {
    /// Looks up `grass`, `dirt` and `stone`; missing names fall back to the
    /// first solid kind.
    pub fn from_palette(palette: &Palette) -> Self {
        let fallback: KindId = palette
            .iter()
            .find(|k| k.id != HOLE && k.solid)
            .map(|k| k.id)
            .unwrap_or(HOLE);
        let pick = |name: &str| {
            let id = palette.id_by_name(name).unwrap_or(fallback);
            Voxel::of_kind(palette, id)
        };
        Self {
            grass: pick("grass"),
            dirt: pick("dirt"),
            stone: pick("stone"),
        }
    }

    #[inline]
    fn voxel(&self, layer: TerrainLayer) -> Voxel {
        match layer {
            TerrainLayer::Air => Voxel::HOLE,
            TerrainLayer::Grass => self.grass,
            TerrainLayer::Dirt => self.dirt,
            TerrainLayer::Stone => self.stone,
        }
    }
}

/// Pre-fills a fresh chunk from the heightfield. Columns are sampled once,
/// then Y layers are painted in parallel.
pub fn fill_terrain(chunk: &mut Chunk, terrain: &Terrain, kinds: &TerrainKinds) -> FillOutcome {
    let n = chunk.size();
    let origin = chunk.coord.origin(n);
    let mut heights = Vec::with_capacity(n * n);
    for z in 0..n as i32 {
        for x in 0..n as i32 {
            heights.push(terrain.height_at(origin.x + x, origin.z + z));
        }
    }
    let top = origin.y + n as i32 - 1;
    let lowest = heights.iter().copied().min().unwrap_or(i32::MAX);
    let highest = heights.iter().copied().max().unwrap_or(i32::MIN);
    let above_surface = top > lowest;
    if origin.y > highest {
        return FillOutcome {
            wrote: false,
            complete: true,
            above_surface,
        };
    }

    let soil = terrain.params().soil_depth;
    let kinds = *kinds;
    chunk
        .voxels_mut()
        .as_mut_slice()
        .par_chunks_mut(n * n)
        .enumerate()
        .for_each(|(ly, layer)| {
            let wy = origin.y + ly as i32;
            for (i, v) in layer.iter_mut().enumerate() {
                *v = kinds.voxel(TerrainLayer::classify(wy, heights[i], soil));
            }
        });
    FillOutcome {
        wrote: chunk.voxels().has_non_hole(),
        complete: true,
        above_surface,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cubis_world::{ChunkCoord, TerrainParams};

    fn flat() -> Terrain {
        Terrain::new(TerrainParams {
            amplitude: 0,
            base_height: 5,
            ..TerrainParams::default()
        })
    }

    #[test]
    fn flat_terrain_paints_bands() {
        let palette = Palette::builtin();
        let kinds = TerrainKinds::from_palette(&palette);
        let mut c = Chunk::new(8);
        c.coord = ChunkCoord::new(0, 0, 0);
        let out = fill_terrain(&mut c, &flat(), &kinds);
        assert!(out.wrote && out.complete && out.above_surface);
        let g = c.voxels();
        assert_eq!(g.get(3, 5, 3).kind, palette.id_by_name("grass").unwrap());
        assert_eq!(g.get(3, 4, 3).kind, palette.id_by_name("dirt").unwrap());
        assert_eq!(g.get(3, 0, 3).kind, palette.id_by_name("stone").unwrap());
        assert!(g.get(3, 6, 3).is_hole());
    }

    #[test]
    fn sky_and_deep_chunks() {
        let kinds = TerrainKinds::from_palette(&Palette::builtin());
        let mut sky = Chunk::new(8);
        sky.coord = ChunkCoord::new(0, 1, 0);
        let out = fill_terrain(&mut sky, &flat(), &kinds);
        assert!(!out.wrote && out.above_surface);
        assert!(!sky.voxels().has_non_hole());

        let mut deep = Chunk::new(8);
        deep.coord = ChunkCoord::new(0, -2, 0);
        let out = fill_terrain(&mut deep, &flat(), &kinds);
        assert!(out.wrote && !out.above_surface);
    }
}

use std::sync::Arc;

use cubis_blocks::MAX_LEVEL;
use cubis_chunk::{Voxel, VoxelGrid};

use crate::constants::SENTINEL_KIND;

/// Shared stand-ins for neighbors that are not loaded.
#[derive(Clone, Debug)]
pub struct Sentinels {
    pub air: Arc<VoxelGrid>,
    pub solid: Arc<VoxelGrid>,
}

impl Sentinels {
    pub fn new(size: usize) -> Self {
        let air = Voxel {
            sun: MAX_LEVEL,
            ..Voxel::HOLE
        };
        let solid = Voxel {
            kind: SENTINEL_KIND,
            opacity: MAX_LEVEL,
            ..Voxel::HOLE
        };
        Self {
            air: Arc::new(VoxelGrid::filled(size, air)),
            solid: Arc::new(VoxelGrid::filled(size, solid)),
        }
    }

    /// Open sky above the chunk, unexplored ground beside and below it.
    #[inline]
    pub fn for_offset(&self, dy: i32) -> Arc<VoxelGrid> {
        if dy > 0 {
            Arc::clone(&self.air)
        } else {
            Arc::clone(&self.solid)
        }
    }
}

/// Immutable 3×3×3 block of chunk grids centered on the chunk being meshed.
#[derive(Clone, Debug)]
pub struct Neighborhood {
    size: usize,
    grids: Vec<Arc<VoxelGrid>>,
}

impl Neighborhood {
    /// Slot of the chunk at offset `(dx, dy, dz)`, each in `-1..=1`.
    #[inline]
    pub fn slot(dx: i32, dy: i32, dz: i32) -> usize {
        (((dy + 1) * 3 + (dz + 1)) * 3 + (dx + 1)) as usize
    }

    /// Builds the block from `fetch`, using sentinels wherever it returns `None`.
    pub fn gather(
        center: Arc<VoxelGrid>,
        sentinels: &Sentinels,
        mut fetch: impl FnMut(i32, i32, i32) -> Option<Arc<VoxelGrid>>,
    ) -> Self {
        let size = center.size();
        let mut grids = Vec::with_capacity(27);
        for dy in -1..=1 {
            for dz in -1..=1 {
                for dx in -1..=1 {
                    let g = if (dx, dy, dz) == (0, 0, 0) {
                        Arc::clone(&center)
                    } else {
                        fetch(dx, dy, dz)
                            .filter(|g| g.size() == size)
                            .unwrap_or_else(|| sentinels.for_offset(dy))
                    };
                    grids.push(g);
                }
            }
        }
        Self { size, grids }
    }

    /// A lone chunk surrounded by sentinels.
    pub fn isolated(center: Arc<VoxelGrid>, sentinels: &Sentinels) -> Self {
        Self::gather(center, sentinels, |_, _, _| None)
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn center(&self) -> &VoxelGrid {
        &self.grids[Self::slot(0, 0, 0)]
    }

    /// Voxel at center-local coordinates, each in `-size..2*size`.
    #[inline]
    pub fn get(&self, x: i32, y: i32, z: i32) -> Voxel {
        let n = self.size as i32;
        let (cx, lx) = (x.div_euclid(n), x.rem_euclid(n));
        let (cy, ly) = (y.div_euclid(n), y.rem_euclid(n));
        let (cz, lz) = (z.div_euclid(n), z.rem_euclid(n));
        debug_assert!((-1..=1).contains(&cx) && (-1..=1).contains(&cy) && (-1..=1).contains(&cz));
        self.grids[Self::slot(cx, cy, cz)].get(lx as usize, ly as usize, lz as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_reaches_into_each_neighbor() {
        let s = Sentinels::new(2);
        let center = Arc::new(VoxelGrid::filled(2, Voxel::new(1, 15)));
        let east = Arc::new(VoxelGrid::filled(2, Voxel::new(2, 15)));
        let nb = Neighborhood::gather(center, &s, |dx, dy, dz| {
            ((dx, dy, dz) == (1, 0, 0)).then(|| Arc::clone(&east))
        });
        assert_eq!(nb.get(1, 1, 1).kind, 1);
        assert_eq!(nb.get(2, 0, 0).kind, 2);
        assert_eq!(nb.get(-1, 0, 0).kind, SENTINEL_KIND);
        assert!(nb.get(0, 2, 0).is_hole());
        assert_eq!(nb.get(0, 2, 0).sun, MAX_LEVEL);
        assert_eq!(nb.get(3, -2, 3).opacity, MAX_LEVEL);
    }

    #[test]
    fn mismatched_sizes_fall_back_to_sentinels() {
        let s = Sentinels::new(2);
        let center = Arc::new(VoxelGrid::new(2));
        let nb = Neighborhood::gather(center, &s, |_, _, _| Some(Arc::new(VoxelGrid::new(3))));
        assert_eq!(nb.get(-1, 0, 0).kind, SENTINEL_KIND);
    }
}

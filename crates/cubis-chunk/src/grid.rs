use crate::face::Face;
use crate::voxel::Voxel;

/// Result of stepping from a voxel through one face.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// Index in the same grid.
    Inside(usize),
    /// Index in the neighbor grid across the face.
    Across(usize),
}

/// Dense cube of `size³` voxels, indexed `(y * size + z) * size + x`.
#[derive(Clone, Debug, PartialEq)]
pub struct VoxelGrid {
    size: usize,
    voxels: Vec<Voxel>,
}

impl VoxelGrid {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            voxels: vec![Voxel::HOLE; size * size * size],
        }
    }

    /// Grid with every voxel set to `v`.
    pub fn filled(size: usize, v: Voxel) -> Self {
        Self {
            size,
            voxels: vec![v; size * size * size],
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.voxels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.voxels.is_empty()
    }

    #[inline]
    pub fn idx(&self, x: usize, y: usize, z: usize) -> usize {
        (y * self.size + z) * self.size + x
    }

    #[inline]
    pub fn coords(&self, i: usize) -> (usize, usize, usize) {
        let n = self.size;
        (i % n, i / (n * n), (i / n) % n)
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> Voxel {
        self.voxels[self.idx(x, y, z)]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, z: usize, v: Voxel) {
        let i = self.idx(x, y, z);
        self.voxels[i] = v;
    }

    #[inline]
    pub fn at(&self, i: usize) -> Voxel {
        self.voxels[i]
    }

    #[inline]
    pub fn at_mut(&mut self, i: usize) -> &mut Voxel {
        &mut self.voxels[i]
    }

    #[inline]
    pub fn as_slice(&self) -> &[Voxel] {
        &self.voxels
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [Voxel] {
        &mut self.voxels
    }

    pub fn clear(&mut self) {
        self.voxels.fill(Voxel::HOLE);
    }

    #[inline]
    pub fn has_non_hole(&self) -> bool {
        self.voxels.iter().any(|v| !v.is_hole())
    }

    pub fn fill_sun(&mut self, level: u8) {
        for v in &mut self.voxels {
            v.sun = level;
        }
    }

    pub fn clear_light(&mut self) {
        for v in &mut self.voxels {
            v.sun = 0;
            v.torch = 0;
        }
    }

    /// Steps from voxel `i` through `face`, wrapping into the neighbor grid.
    #[inline]
    pub fn step(&self, i: usize, face: Face) -> Step {
        let n = self.size as i32;
        let (x, y, z) = self.coords(i);
        let (dx, dy, dz) = face.delta();
        let (nx, ny, nz) = (x as i32 + dx, y as i32 + dy, z as i32 + dz);
        let inside = (0..n).contains(&nx) && (0..n).contains(&ny) && (0..n).contains(&nz);
        let j = self.idx(
            nx.rem_euclid(n) as usize,
            ny.rem_euclid(n) as usize,
            nz.rem_euclid(n) as usize,
        );
        if inside { Step::Inside(j) } else { Step::Across(j) }
    }

    /// Faces of the chunk that voxel `i` touches.
    pub fn edge_faces(&self, i: usize) -> impl Iterator<Item = Face> + '_ {
        Face::ALL
            .into_iter()
            .filter(move |f| matches!(self.step(i, *f), Step::Across(_)))
    }

    /// Indices of every voxel on the given boundary face.
    pub fn face_indices(&self, face: Face) -> impl Iterator<Item = usize> + '_ {
        let n = self.size;
        let last = n - 1;
        (0..n * n).map(move |k| {
            let (a, b) = (k % n, k / n);
            match face {
                Face::PosY => self.idx(a, last, b),
                Face::NegY => self.idx(a, 0, b),
                Face::PosX => self.idx(last, a, b),
                Face::NegX => self.idx(0, a, b),
                Face::PosZ => self.idx(a, b, last),
                Face::NegZ => self.idx(a, b, 0),
            }
        })
    }
}

use fastnoise_lite::{FastNoiseLite, NoiseType};

use crate::config::TerrainParams;

/// Material band at a world position, independent of any palette.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TerrainLayer {
    Air,
    Grass,
    Dirt,
    Stone,
}

impl TerrainLayer {
    /// Band of a voxel at height `wy` in a column whose surface is `height`.
    #[inline]
    pub fn classify(wy: i32, height: i32, soil_depth: i32) -> TerrainLayer {
        if wy > height {
            TerrainLayer::Air
        } else if wy == height {
            TerrainLayer::Grass
        } else if wy > height - soil_depth {
            TerrainLayer::Dirt
        } else {
            TerrainLayer::Stone
        }
    }
}

/// Noise heightfield sampler used to pre-fill new chunks.
pub struct Terrain {
    noise: FastNoiseLite,
    params: TerrainParams,
}

impl Terrain {
    pub fn new(params: TerrainParams) -> Self {
        let mut noise = FastNoiseLite::with_seed(params.seed);
        noise.set_noise_type(Some(NoiseType::OpenSimplex2));
        noise.set_frequency(Some(params.frequency));
        Self { noise, params }
    }

    #[inline]
    pub fn params(&self) -> &TerrainParams {
        &self.params
    }

    /// Surface y at a world column. The surface voxel itself is grass.
    pub fn height_at(&self, wx: i32, wz: i32) -> i32 {
        let h = self
            .noise
            .get_noise_2d(wx as f32, wz as f32)
            .clamp(-1.0, 1.0);
        let span = (2 * self.params.amplitude) as f32;
        ((h + 1.0) * 0.5 * span) as i32 + self.params.base_height - self.params.amplitude
    }

    /// Layer for a voxel given the precomputed column height.
    #[inline]
    pub fn layer_for(&self, wy: i32, height: i32) -> TerrainLayer {
        TerrainLayer::classify(wy, height, self.params.soil_depth)
    }

    pub fn layer_at(&self, wx: i32, wy: i32, wz: i32) -> TerrainLayer {
        self.layer_for(wy, self.height_at(wx, wz))
    }

    /// Highest surface any column can reach.
    #[inline]
    pub fn max_height(&self) -> i32 {
        self.params.base_height + self.params.amplitude
    }

    #[inline]
    pub fn min_height(&self) -> i32 {
        self.params.base_height - self.params.amplitude
    }
}

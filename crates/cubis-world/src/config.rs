use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

/// Runtime tuning for the store, light engine and meshing pipeline.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct EngineConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Largest absolute chunk coordinate on any axis.
    #[serde(default = "default_world_extent")]
    pub world_extent_chunks: u32,
    #[serde(default = "default_pool_capacity")]
    pub pool_capacity: usize,
    /// `None` picks `available_parallelism - 1`; `Some(0)` meshes inline on the caller.
    #[serde(default)]
    pub worker_threads: Option<usize>,
    #[serde(default = "default_pending_jobs")]
    pub pending_jobs: usize,
    #[serde(default = "d_one")]
    pub sun_attenuation: u8,
    #[serde(default = "d_one")]
    pub torch_attenuation: u8,
    #[serde(default = "d_true")]
    pub global_illumination: bool,
    #[serde(default = "default_view_radius")]
    pub view_radius: u32,
    #[serde(default = "default_view_height")]
    pub view_height: u32,
    #[serde(default = "default_frame_budget")]
    pub frame_budget_ms: u64,
    #[serde(default = "default_max_submissions")]
    pub max_submissions_per_tick: usize,
    #[serde(default = "d_true")]
    pub build_colliders: bool,
    #[serde(default)]
    pub build_nav: bool,
    #[serde(default)]
    pub terrain: TerrainParams,
}

fn default_chunk_size() -> usize {
    16
}
fn default_world_extent() -> u32 {
    4096
}
fn default_pool_capacity() -> usize {
    2048
}
fn default_pending_jobs() -> usize {
    256
}
fn d_one() -> u8 {
    1
}
fn d_true() -> bool {
    true
}
fn default_view_radius() -> u32 {
    4
}
fn default_view_height() -> u32 {
    2
}
fn default_frame_budget() -> u64 {
    4
}
fn default_max_submissions() -> usize {
    64
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            world_extent_chunks: default_world_extent(),
            pool_capacity: default_pool_capacity(),
            worker_threads: None,
            pending_jobs: default_pending_jobs(),
            sun_attenuation: 1,
            torch_attenuation: 1,
            global_illumination: true,
            view_radius: default_view_radius(),
            view_height: default_view_height(),
            frame_budget_ms: default_frame_budget(),
            max_submissions_per_tick: default_max_submissions(),
            build_colliders: true,
            build_nav: false,
            terrain: TerrainParams::default(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct TerrainParams {
    #[serde(default = "default_seed")]
    pub seed: i32,
    /// World y of the mean surface.
    #[serde(default)]
    pub base_height: i32,
    #[serde(default = "default_amplitude")]
    pub amplitude: i32,
    #[serde(default = "default_frequency")]
    pub frequency: f32,
    #[serde(default = "default_soil_depth")]
    pub soil_depth: i32,
}

fn default_seed() -> i32 {
    1337
}
fn default_amplitude() -> i32 {
    12
}
fn default_frequency() -> f32 {
    0.02
}
fn default_soil_depth() -> i32 {
    3
}

impl Default for TerrainParams {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            base_height: 0,
            amplitude: default_amplitude(),
            frequency: default_frequency(),
            soil_depth: default_soil_depth(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(io::Error),
    Parse(toml::de::Error),
    Invalid { field: &'static str, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "reading engine config: {e}"),
            ConfigError::Parse(e) => write!(f, "parsing engine config: {e}"),
            ConfigError::Invalid { field, reason } => write!(f, "invalid `{field}`: {reason}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            ConfigError::Invalid { .. } => None,
        }
    }
}

impl From<io::Error> for ConfigError {
    fn from(e: io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e)
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

impl EngineConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: EngineConfig = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let s = fs::read_to_string(path)?;
        let cfg = Self::from_toml_str(&s)?;
        log::info!(
            target: "config",
            "loaded {}: chunk {}, pool {}, view radius {}",
            path.display(),
            cfg.chunk_size,
            cfg.pool_capacity,
            cfg.view_radius
        );
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(2..=64).contains(&self.chunk_size) {
            return Err(invalid("chunk_size", "must be within 2..=64"));
        }
        if self.world_extent_chunks == 0 || self.world_extent_chunks > crate::KeyPacker::MAX_EXTENT
        {
            return Err(invalid(
                "world_extent_chunks",
                format!("must be within 1..={}", crate::KeyPacker::MAX_EXTENT),
            ));
        }
        if self.pool_capacity == 0 || self.pool_capacity > u32::MAX as usize {
            return Err(invalid("pool_capacity", "must be at least 1"));
        }
        if self.pending_jobs == 0 {
            return Err(invalid("pending_jobs", "must be at least 1"));
        }
        for (field, v) in [
            ("sun_attenuation", self.sun_attenuation),
            ("torch_attenuation", self.torch_attenuation),
        ] {
            if !(1..=15).contains(&v) {
                return Err(invalid(field, "must be within 1..=15"));
            }
        }
        if self.max_submissions_per_tick == 0 {
            return Err(invalid("max_submissions_per_tick", "must be at least 1"));
        }
        Ok(())
    }

    /// Chunks inside the streamed view box around one center.
    pub fn view_volume(&self) -> usize {
        let w = (2 * self.view_radius as usize) + 1;
        let h = (2 * self.view_height as usize) + 1;
        w * w * h
    }

    #[inline]
    pub fn chunk_volume(&self) -> usize {
        self.chunk_size * self.chunk_size * self.chunk_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.chunk_size, 16);
        assert_eq!(cfg.world_extent_chunks, 4096);
        assert_eq!(cfg.worker_threads, None);
        assert_eq!(cfg.sun_attenuation, 1);
        assert!(cfg.global_illumination);
        assert_eq!(cfg.terrain, TerrainParams::default());
    }

    #[test]
    fn partial_sections_fill_in() {
        let cfg = EngineConfig::from_toml_str(
            "worker_threads = 0\npool_capacity = 8\n[terrain]\nseed = 7\n",
        )
        .unwrap();
        assert_eq!(cfg.worker_threads, Some(0));
        assert_eq!(cfg.pool_capacity, 8);
        assert_eq!(cfg.terrain.seed, 7);
        assert_eq!(cfg.terrain.amplitude, 12);
        assert_eq!(cfg.view_volume(), 9 * 9 * 5);
    }

    #[test]
    fn zero_attenuation_is_rejected() {
        let err = EngineConfig::from_toml_str("torch_attenuation = 0").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "torch_attenuation",
                ..
            }
        ));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = EngineConfig::from_toml_str("chunk_size = [").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().starts_with("parsing engine config"));
    }
}

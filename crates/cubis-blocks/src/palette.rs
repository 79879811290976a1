use std::error::Error;
use std::fmt;
use std::fs;
use std::path::Path;

use hashbrown::HashMap;

use crate::config::{KindDef, PaletteConfig};
use crate::{HOLE, MATERIAL_SLOTS, MAX_LEVEL};

pub type KindId = u16;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoxelKind {
    pub id: KindId,
    pub name: String,
    /// 0..=15; 15 blocks light and view completely.
    pub opacity: u8,
    /// Torch emission 0..=15.
    pub emission: u8,
    pub solid: bool,
    pub walkable: bool,
    pub material: u8,
}

impl VoxelKind {
    #[inline]
    pub fn is_opaque(&self) -> bool {
        self.opacity >= MAX_LEVEL
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaletteError {
    HoleRedefined,
    DuplicateName(String),
    IdMismatch { name: String, expected: KindId, got: KindId },
    LevelOutOfRange { name: String, field: &'static str, value: u8 },
    MaterialOutOfRange { name: String, slot: u8 },
    TooManyKinds,
}

impl fmt::Display for PaletteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaletteError::HoleRedefined => write!(f, "kind 0 ('hole') is reserved"),
            PaletteError::DuplicateName(n) => write!(f, "duplicate voxel kind '{n}'"),
            PaletteError::IdMismatch {
                name,
                expected,
                got,
            } => write!(f, "kind '{name}' declares id {got}, expected {expected}"),
            PaletteError::LevelOutOfRange { name, field, value } => {
                write!(f, "kind '{name}': {field}={value} exceeds {MAX_LEVEL}")
            }
            PaletteError::MaterialOutOfRange { name, slot } => write!(
                f,
                "kind '{name}': material slot {slot} exceeds {}",
                MATERIAL_SLOTS - 1
            ),
            PaletteError::TooManyKinds => write!(f, "palette exceeds {} kinds", u16::MAX),
        }
    }
}

impl Error for PaletteError {}

/// Shared, read-only table of voxel kinds. Index 0 is always the empty "hole".
#[derive(Clone, Debug)]
pub struct Palette {
    kinds: Vec<VoxelKind>,
    by_name: HashMap<String, KindId>,
}

impl Default for Palette {
    fn default() -> Self {
        Self::empty()
    }
}

impl Palette {
    /// A palette holding only the hole kind.
    pub fn empty() -> Self {
        let hole = VoxelKind {
            id: HOLE,
            name: "hole".to_string(),
            opacity: 0,
            emission: 0,
            solid: false,
            walkable: false,
            material: 0,
        };
        let mut by_name = HashMap::new();
        by_name.insert(hole.name.clone(), HOLE);
        Self {
            kinds: vec![hole],
            by_name,
        }
    }

    /// Small default palette used by the demo and tests.
    pub fn builtin() -> Self {
        let mut p = Self::empty();
        let defs = [
            ("stone", 15, 0, true, 1),
            ("dirt", 15, 0, true, 2),
            ("grass", 15, 0, true, 3),
            ("glass", 0, 0, true, 4),
            ("water", 3, 0, false, 5),
            ("leaves", 2, 0, true, 6),
            ("torch", 0, 14, false, 7),
            ("glowstone", 15, 15, true, 8),
        ];
        for (name, opacity, emission, solid, material) in defs {
            let id = p.kinds.len() as KindId;
            p.by_name.insert(name.to_string(), id);
            p.kinds.push(VoxelKind {
                id,
                name: name.to_string(),
                opacity,
                emission,
                solid,
                walkable: solid,
                material,
            });
        }
        p
    }

    pub fn from_config(cfg: PaletteConfig) -> Result<Self, PaletteError> {
        let mut p = Self::empty();
        for def in cfg.kinds {
            p.push_def(def)?;
        }
        Ok(p)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, Box<dyn Error>> {
        let cfg: PaletteConfig = toml::from_str(s)?;
        Ok(Self::from_config(cfg)?)
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, Box<dyn Error>> {
        let s = fs::read_to_string(path)?;
        Self::from_toml_str(&s)
    }

    fn push_def(&mut self, def: KindDef) -> Result<KindId, PaletteError> {
        if def.name == "hole" || def.id == Some(HOLE) {
            return Err(PaletteError::HoleRedefined);
        }
        if self.by_name.contains_key(&def.name) {
            return Err(PaletteError::DuplicateName(def.name));
        }
        let expected = KindId::try_from(self.kinds.len()).map_err(|_| PaletteError::TooManyKinds)?;
        if let Some(got) = def.id {
            if got != expected {
                return Err(PaletteError::IdMismatch {
                    name: def.name,
                    expected,
                    got,
                });
            }
        }
        let opacity = def.opacity.unwrap_or(MAX_LEVEL);
        let emission = def.emission.unwrap_or(0);
        for (field, value) in [("opacity", opacity), ("emission", emission)] {
            if value > MAX_LEVEL {
                return Err(PaletteError::LevelOutOfRange {
                    name: def.name,
                    field,
                    value,
                });
            }
        }
        let material = def.material.unwrap_or(0);
        if material as usize >= MATERIAL_SLOTS {
            return Err(PaletteError::MaterialOutOfRange {
                name: def.name,
                slot: material,
            });
        }
        let solid = def.solid.unwrap_or(true);
        self.by_name.insert(def.name.clone(), expected);
        self.kinds.push(VoxelKind {
            id: expected,
            name: def.name,
            opacity,
            emission,
            solid,
            walkable: def.walkable.unwrap_or(solid),
            material,
        });
        Ok(expected)
    }

    #[inline]
    pub fn get(&self, id: KindId) -> Option<&VoxelKind> {
        self.kinds.get(id as usize)
    }

    pub fn id_by_name(&self, name: &str) -> Option<KindId> {
        self.by_name.get(name).copied()
    }

    /// Opacity for a kind; unknown kinds are treated as fully opaque.
    #[inline]
    pub fn opacity(&self, id: KindId) -> u8 {
        if id == HOLE {
            return 0;
        }
        self.get(id).map(|k| k.opacity).unwrap_or(MAX_LEVEL)
    }

    #[inline]
    pub fn emission(&self, id: KindId) -> u8 {
        self.get(id).map(|k| k.emission).unwrap_or(0)
    }

    #[inline]
    pub fn is_solid(&self, id: KindId) -> bool {
        self.get(id).map(|k| k.solid).unwrap_or(false)
    }

    #[inline]
    pub fn material(&self, id: KindId) -> u8 {
        self.get(id).map(|k| k.material).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.len() <= 1
    }

    pub fn iter(&self) -> impl Iterator<Item = &VoxelKind> {
        self.kinds.iter()
    }
}

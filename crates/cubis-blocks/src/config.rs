use serde::Deserialize;

/// One `[[kinds]]` table of a palette file.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct KindDef {
    pub name: String,
    #[serde(default)]
    pub id: Option<u16>,
    #[serde(default)]
    pub opacity: Option<u8>,
    #[serde(default)]
    pub emission: Option<u8>,
    #[serde(default)]
    pub solid: Option<bool>,
    #[serde(default)]
    pub walkable: Option<bool>,
    #[serde(default)]
    pub material: Option<u8>,
}

impl KindDef {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn opacity(mut self, v: u8) -> Self {
        self.opacity = Some(v);
        self
    }

    pub fn emission(mut self, v: u8) -> Self {
        self.emission = Some(v);
        self
    }

    pub fn solid(mut self, v: bool) -> Self {
        self.solid = Some(v);
        self
    }

    pub fn material(mut self, v: u8) -> Self {
        self.material = Some(v);
        self
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct PaletteConfig {
    #[serde(default)]
    pub kinds: Vec<KindDef>,
}

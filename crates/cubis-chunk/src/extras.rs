use hashbrown::{HashMap, HashSet};

use cubis_blocks::MAX_LEVEL;

/// Dynamic light attached to a voxel independently of its kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LightSource {
    pub level: u8,
}

#[derive(Clone, Debug, PartialEq)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

/// Sparse per-voxel overlays keyed by voxel index.
#[derive(Clone, Debug, Default)]
pub struct ChunkExtras {
    hidden: HashSet<u32>,
    light_sources: HashMap<u32, LightSource>,
    properties: HashMap<u32, HashMap<String, PropertyValue>>,
}

impl ChunkExtras {
    /// Returns true if the hidden state changed.
    pub fn set_hidden(&mut self, index: u32, hidden: bool) -> bool {
        if hidden {
            self.hidden.insert(index)
        } else {
            self.hidden.remove(&index)
        }
    }

    #[inline]
    pub fn is_hidden(&self, index: u32) -> bool {
        self.hidden.contains(&index)
    }

    pub fn hidden(&self) -> impl Iterator<Item = u32> + '_ {
        self.hidden.iter().copied()
    }

    #[inline]
    pub fn has_hidden(&self) -> bool {
        !self.hidden.is_empty()
    }

    /// `None` or level 0 removes the source. Returns the previous level.
    pub fn set_light_source(&mut self, index: u32, level: Option<u8>) -> u8 {
        let prev = self.light_source(index);
        match level {
            Some(l) if l > 0 => {
                self.light_sources.insert(
                    index,
                    LightSource {
                        level: l.min(MAX_LEVEL),
                    },
                );
            }
            _ => {
                self.light_sources.remove(&index);
            }
        }
        prev
    }

    #[inline]
    pub fn light_source(&self, index: u32) -> u8 {
        self.light_sources
            .get(&index)
            .map(|s| s.level)
            .unwrap_or(0)
    }

    pub fn light_sources(&self) -> impl Iterator<Item = (u32, LightSource)> + '_ {
        self.light_sources.iter().map(|(i, s)| (*i, *s))
    }

    pub fn set_property(&mut self, index: u32, name: &str, value: Option<PropertyValue>) {
        match value {
            Some(v) => {
                self.properties
                    .entry(index)
                    .or_default()
                    .insert(name.to_string(), v);
            }
            None => {
                if let Some(props) = self.properties.get_mut(&index) {
                    props.remove(name);
                    if props.is_empty() {
                        self.properties.remove(&index);
                    }
                }
            }
        }
    }

    pub fn property(&self, index: u32, name: &str) -> Option<&PropertyValue> {
        self.properties.get(&index).and_then(|p| p.get(name))
    }

    /// Drops every overlay attached to one voxel.
    pub fn clear_voxel(&mut self, index: u32) {
        self.hidden.remove(&index);
        self.light_sources.remove(&index);
        self.properties.remove(&index);
    }

    pub fn clear(&mut self) {
        self.hidden.clear();
        self.light_sources.clear();
        self.properties.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.hidden.is_empty() && self.light_sources.is_empty() && self.properties.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn light_source_levels_clamp_and_remove() {
        let mut e = ChunkExtras::default();
        assert_eq!(e.set_light_source(5, Some(40)), 0);
        assert_eq!(e.light_source(5), 15);
        assert_eq!(e.set_light_source(5, Some(0)), 15);
        assert_eq!(e.light_source(5), 0);
        assert!(e.is_empty());
    }

    #[test]
    fn properties_are_per_voxel() {
        let mut e = ChunkExtras::default();
        e.set_property(1, "owner", Some(PropertyValue::Text("ana".into())));
        e.set_property(1, "hp", Some(PropertyValue::Int(3)));
        assert_eq!(e.property(1, "hp"), Some(&PropertyValue::Int(3)));
        assert_eq!(e.property(2, "hp"), None);
        e.set_property(1, "hp", None);
        e.set_property(1, "owner", None);
        assert!(e.is_empty());
    }

    #[test]
    fn clear_voxel_drops_all_overlays() {
        let mut e = ChunkExtras::default();
        assert!(e.set_hidden(9, true));
        assert!(!e.set_hidden(9, true));
        e.set_light_source(9, Some(4));
        e.set_property(9, "k", Some(PropertyValue::Bool(true)));
        e.clear_voxel(9);
        assert!(e.is_empty());
    }
}

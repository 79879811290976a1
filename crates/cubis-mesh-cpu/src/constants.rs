//! Shared constants for cubis-mesh-cpu.

pub(crate) const OPAQUE_ALPHA: u8 = 255;
/// Visual-only lighting floor to avoid pitch-black faces in darkness.
/// Does not affect logical light propagation.
pub(crate) const VISUAL_LIGHT_MIN: u8 = 18; // ~7% brightness floor

/// Brightness per light level, 0..=15.
pub(crate) const BRIGHTNESS: [u8; 16] = {
    let mut t = [0u8; 16];
    let mut i = 0;
    while i < 16 {
        // linear ramp from the floor to full white
        t[i] = (VISUAL_LIGHT_MIN as u32 + (255 - VISUAL_LIGHT_MIN as u32) * i as u32 / 15) as u8;
        i += 1;
    }
    t
};

/// Kind id carried by the solid stand-in for unloaded neighbors.
pub(crate) const SENTINEL_KIND: u16 = u16::MAX;

/// Quads reserved the first time a material slot is written.
pub(crate) const INITIAL_QUAD_CAP: usize = 256;

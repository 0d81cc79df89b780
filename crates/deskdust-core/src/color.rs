//! RGBA color with the small HSV helpers the toys use for tinting

use serde::{Deserialize, Serialize};

/// 8-bit straight-alpha RGBA color
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba::new(0, 0, 0, 0);
    pub const WHITE: Rgba = Rgba::new(255, 255, 255, 255);
    pub const YELLOW: Rgba = Rgba::new(255, 249, 0, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Return the same color with its alpha scaled by `alpha` (clamped to 0..=1).
    pub fn fade(self, alpha: f32) -> Self {
        let a = (self.a as f32 * alpha.clamp(0.0, 1.0)) as u8;
        Self { a, ..self }
    }

    pub fn is_transparent(self) -> bool {
        self.a == 0
    }
}

/// Convert HSV (h in degrees, s/v in 0..=1) to an opaque color.
///
/// The ramp runs over 30 degrees instead of the usual 60, which warms
/// mid-sector hues; the sand tint relies on this.
pub fn hsv(h: f32, s: f32, v: f32) -> Rgba {
    let c = v * s;
    let x = c * (1.0 - ((h / 30.0).rem_euclid(2.0) - 1.0).abs());
    let m = v - c;

    let (r, g, b) = match h {
        h if h < 60.0 => (c, x, 0.0),
        h if h < 120.0 => (x, c, 0.0),
        h if h < 180.0 => (0.0, c, x),
        h if h < 240.0 => (0.0, x, c),
        h if h < 300.0 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    Rgba::rgb(
        ((r + m) * 255.0) as u8,
        ((g + m) * 255.0) as u8,
        ((b + m) * 255.0) as u8,
    )
}

/// Fixed-hue color whose brightness oscillates over time.
///
/// Saturation is pinned at 0.5 for the muted, sandy look; `cycle_speed`
/// controls how fast the shading breathes.
pub fn shade_cycle(base_hue: f32, time: f32, cycle_speed: f32) -> Rgba {
    let v = 0.8 + 0.2 * (time * cycle_speed).sin();
    hsv(base_hue, 0.5, v)
}

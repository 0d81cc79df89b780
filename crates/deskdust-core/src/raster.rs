//! Screen-sized accumulation rasters
//!
//! Two of the toys amortize their drawing cost into a persistent raster
//! that the host blits in one call per frame: sand bakes settled grains
//! into its static deposit, and the drawing toy stamps ink strokes. Nothing
//! here is re-rendered from particle state: paint once, blit forever.

use crate::color::Rgba;

/// Additively-painted RGBA raster the same size as the screen.
pub struct Raster {
    width: u32,
    height: u32,
    pixels: Vec<Rgba>,
}

impl Raster {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Rgba::TRANSPARENT; (width * height) as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Row-major pixel data for `Canvas::blit`.
    pub fn pixels(&self) -> &[Rgba] {
        &self.pixels
    }

    /// Paint one pixel. Out-of-bounds coordinates are ignored.
    pub fn paint(&mut self, x: i32, y: i32, color: Rgba) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let idx = y as usize * self.width as usize + x as usize;
        self.pixels[idx] = blend(self.pixels[idx], color);
    }

    /// Stamp a filled circle (ink brush).
    pub fn fill_circle(&mut self, cx: f32, cy: f32, radius: f32, color: Rgba) {
        let r = radius.max(0.0);
        let r_sq = r * r;
        let (min_x, max_x) = ((cx - r).floor() as i32, (cx + r).ceil() as i32);
        let (min_y, max_y) = ((cy - r).floor() as i32, (cy + r).ceil() as i32);
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let dx = x as f32 - cx;
                let dy = y as f32 - cy;
                if dx * dx + dy * dy <= r_sq {
                    self.paint(x, y, color);
                }
            }
        }
    }

    pub fn clear(&mut self) {
        self.pixels.fill(Rgba::TRANSPARENT);
    }

    /// Reset to a new size; all painted content is dropped.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.pixels.clear();
        self.pixels
            .resize((width * height) as usize, Rgba::TRANSPARENT);
    }

    /// Painted (non-transparent) pixel count. Diagnostics and tests only.
    pub fn painted_count(&self) -> usize {
        self.pixels.iter().filter(|p| !p.is_transparent()).count()
    }
}

/// Alpha-over composite of `src` onto `dst`, straight alpha.
fn blend(dst: Rgba, src: Rgba) -> Rgba {
    if src.a == 255 || dst.a == 0 {
        return src;
    }
    if src.a == 0 {
        return dst;
    }
    let sa = src.a as f32 / 255.0;
    let da = dst.a as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    let lerp = |s: u8, d: u8| -> u8 {
        (((s as f32 * sa) + (d as f32 * da * (1.0 - sa))) / out_a) as u8
    };
    Rgba::new(
        lerp(src.r, dst.r),
        lerp(src.g, dst.g),
        lerp(src.b, dst.b),
        (out_a * 255.0) as u8,
    )
}

//! CPU pixel canvas the simulations draw into each frame
//!
//! Backed by one RGBA8 buffer that the renderer uploads as the overlay
//! texture. Cleared to fully transparent every frame; whatever stays
//! transparent shows the desktop underneath.

use bresenham::Bresenham;
use deskdust_core::canvas::Canvas;
use deskdust_core::color::Rgba;
use glam::Vec2;

pub struct PixelCanvas {
    width: u32,
    height: u32,
    buffer: Vec<u8>,
}

impl PixelCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            buffer: vec![0; (width * height * 4) as usize],
        }
    }

    /// Raw RGBA8 bytes for the texture upload.
    pub fn bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Reset to fully transparent for the next frame.
    pub fn clear(&mut self) {
        self.buffer.fill(0);
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.buffer.clear();
        self.buffer.resize((width * height * 4) as usize, 0);
    }

    fn blend_at(&mut self, x: i32, y: i32, color: Rgba) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 || color.a == 0 {
            return;
        }
        let idx = ((y as u32 * self.width + x as u32) * 4) as usize;
        if color.a == 255 {
            self.buffer[idx] = color.r;
            self.buffer[idx + 1] = color.g;
            self.buffer[idx + 2] = color.b;
            self.buffer[idx + 3] = 255;
            return;
        }
        let sa = color.a as f32 / 255.0;
        let da = self.buffer[idx + 3] as f32 / 255.0;
        let out_a = sa + da * (1.0 - sa);
        if out_a <= 0.0 {
            return;
        }
        for (offset, channel) in [color.r, color.g, color.b].into_iter().enumerate() {
            let dst = self.buffer[idx + offset] as f32;
            let blended = (channel as f32 * sa + dst * da * (1.0 - sa)) / out_a;
            self.buffer[idx + offset] = blended as u8;
        }
        self.buffer[idx + 3] = (out_a * 255.0) as u8;
    }
}

impl Canvas for PixelCanvas {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn set_pixel(&mut self, x: i32, y: i32, color: Rgba) {
        self.blend_at(x, y, color);
    }

    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Rgba) {
        let r = radius.max(0.0);
        let r_sq = r * r;
        let (min_x, max_x) = ((center.x - r).floor() as i32, (center.x + r).ceil() as i32);
        let (min_y, max_y) = ((center.y - r).floor() as i32, (center.y + r).ceil() as i32);
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let dx = x as f32 - center.x;
                let dy = y as f32 - center.y;
                if dx * dx + dy * dy <= r_sq {
                    self.blend_at(x, y, color);
                }
            }
        }
    }

    fn stroke_circle(&mut self, center: Vec2, radius: f32, color: Rgba) {
        // Angular stepping; fine enough for brush previews.
        let r = radius.max(1.0);
        let steps = (r * std::f32::consts::TAU).ceil().max(8.0) as i32;
        for i in 0..steps {
            let angle = i as f32 / steps as f32 * std::f32::consts::TAU;
            let x = (center.x + angle.cos() * r).round() as i32;
            let y = (center.y + angle.sin() * r).round() as i32;
            self.blend_at(x, y, color);
        }
    }

    fn line(&mut self, from: Vec2, to: Vec2, color: Rgba) {
        let start = (from.x.round() as isize, from.y.round() as isize);
        let end = (to.x.round() as isize, to.y.round() as isize);
        for (x, y) in Bresenham::new(start, end) {
            self.blend_at(x as i32, y as i32, color);
        }
        // Bresenham excludes the endpoint.
        self.blend_at(end.0 as i32, end.1 as i32, color);
    }

    fn blit(&mut self, pixels: &[Rgba]) {
        if pixels.len() != (self.width * self.height) as usize {
            return;
        }
        let width = self.width as i32;
        for (i, px) in pixels.iter().enumerate() {
            if !px.is_transparent() {
                self.blend_at(i as i32 % width, i as i32 / width, *px);
            }
        }
    }
}

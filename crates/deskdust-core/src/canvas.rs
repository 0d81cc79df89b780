//! Pixel-draw primitives consumed from the rendering collaborator

use glam::Vec2;

use crate::color::Rgba;

/// Draw target provided by the host for one frame.
///
/// Colors carry straight alpha; implementations composite alpha-over.
pub trait Canvas {
    /// Canvas size in pixels (matches the screen).
    fn size(&self) -> (u32, u32);

    /// Plot a single pixel. Out-of-bounds coordinates are ignored.
    fn set_pixel(&mut self, x: i32, y: i32, color: Rgba);

    /// Filled circle, center in screen pixels.
    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Rgba);

    /// Circle outline (brush previews).
    fn stroke_circle(&mut self, center: Vec2, radius: f32, color: Rgba);

    /// Line segment (firework trails).
    fn line(&mut self, from: Vec2, to: Vec2, color: Rgba);

    /// Composite a full-screen raster in one call. `pixels` is row-major,
    /// `width * height` entries; anything else is ignored.
    fn blit(&mut self, pixels: &[Rgba]);
}

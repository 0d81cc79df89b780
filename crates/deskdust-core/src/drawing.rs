//! Freehand drawing: persistent ink raster with interpolated stamping
//!
//! Strokes are stamped straight into a screen-sized raster, so a finished
//! drawing costs one blit per frame no matter how long the session ran.
//! Consecutive pointer samples are bridged with evenly spaced stamps to
//! keep fast strokes gap-free.

use glam::Vec2;

use crate::canvas::Canvas;
use crate::color::Rgba;
use crate::config::DrawingConfig;
use crate::input::FrameInput;
use crate::raster::Raster;
use crate::simulation::Simulation;

pub struct DrawingSimulation {
    config: DrawingConfig,
    ink: Raster,
    brush_size: i32,
    color_index: usize,
    /// Last stamped position, present while a stroke is in flight.
    last_stamp: Option<Vec2>,
    /// Last seen pointer, for the brush preview ring.
    pointer: Vec2,
    /// Modifier state carried into `draw` for the palette and highlighter
    /// previews.
    ctrl: bool,
    shift: bool,
    strokes: usize,
}

impl DrawingSimulation {
    pub fn new(width: u32, height: u32, config: DrawingConfig) -> Self {
        let brush_size = config
            .default_brush_size
            .clamp(config.min_brush_size, config.max_brush_size);
        Self {
            config,
            ink: Raster::new(width, height),
            brush_size,
            color_index: 0,
            last_stamp: None,
            pointer: Vec2::ZERO,
            ctrl: false,
            shift: false,
            strokes: 0,
        }
    }

    pub fn brush_size(&self) -> i32 {
        self.brush_size
    }

    pub fn stroke_count(&self) -> usize {
        self.strokes
    }

    pub fn ink(&self) -> &Raster {
        &self.ink
    }

    fn current_color(&self, highlighter: bool) -> Rgba {
        let base = self
            .config
            .preset_colors
            .get(self.color_index)
            .copied()
            .unwrap_or(Rgba::WHITE);
        if highlighter {
            base.fade(self.config.highlighter_alpha)
        } else {
            base
        }
    }

    fn adjust_brush(&mut self, delta: i32) {
        self.brush_size =
            (self.brush_size + delta).clamp(self.config.min_brush_size, self.config.max_brush_size);
    }

    fn cycle_color(&mut self, steps: i32) {
        let n = self.config.preset_colors.len();
        if n == 0 {
            return;
        }
        let idx = self.color_index as i32 + steps;
        self.color_index = idx.rem_euclid(n as i32) as usize;
    }

    /// Stamp from `from` to `to` with spacing tied to the brush radius so
    /// fast pointer motion leaves a solid line.
    fn stamp_segment(&mut self, from: Vec2, to: Vec2, color: Rgba) {
        let radius = self.brush_size as f32;
        let dist = from.distance(to);
        let steps = (dist / (radius * 0.5).max(1.0)).ceil() as i32;
        for i in 0..=steps {
            let t = if steps == 0 { 0.0 } else { i as f32 / steps as f32 };
            let p = from.lerp(to, t);
            self.ink.fill_circle(p.x, p.y, radius, color);
        }
    }

    /// Prev/current/next color bubbles above the cursor, shown while the
    /// cycle modifier is held.
    fn draw_palette(&self, canvas: &mut dyn Canvas) {
        let colors = &self.config.preset_colors;
        let n = colors.len();
        if n == 0 {
            return;
        }
        let radius = 10.0;
        let spacing = radius * 2.5;
        let base = self.pointer - Vec2::new(0.0, radius * 1.5 + self.brush_size as f32 + 2.0);
        let prev = (self.color_index + n - 1) % n;
        let next = (self.color_index + 1) % n;
        canvas.fill_circle(base - Vec2::new(spacing, 0.0), radius, colors[prev]);
        let current = radius * 1.2;
        canvas.fill_circle(base, current, colors[self.color_index]);
        canvas.stroke_circle(base, current + 2.0, Rgba::WHITE);
        canvas.fill_circle(base + Vec2::new(spacing, 0.0), radius, colors[next]);
    }
}

impl Simulation for DrawingSimulation {
    fn name(&self) -> &str {
        "Drawing"
    }

    fn update(&mut self, input: &FrameInput) {
        self.pointer = input.pointer;
        self.ctrl = input.ctrl;
        self.shift = input.shift;

        if input.clear_requested {
            self.ink.clear();
            self.strokes = 0;
        }

        let wheel = input.wheel_steps();
        if input.ctrl && wheel != 0 {
            self.cycle_color(wheel);
        } else if wheel != 0 || input.brush_delta != 0 {
            self.adjust_brush(wheel + input.brush_delta);
        }

        if input.pointer_down {
            let color = self.current_color(input.shift);
            if input.pointer_pressed {
                self.strokes += 1;
                self.last_stamp = None;
            }
            let from = self.last_stamp.unwrap_or(input.pointer);
            self.stamp_segment(from, input.pointer, color);
            self.last_stamp = Some(input.pointer);
        } else {
            self.last_stamp = None;
        }
    }

    fn draw(&self, canvas: &mut dyn Canvas) {
        canvas.blit(self.ink.pixels());
        let radius = self.brush_size as f32;
        // Highlighter mode previews the translucent fill under the ring.
        if self.shift {
            canvas.fill_circle(self.pointer, radius, self.current_color(true));
        }
        canvas.stroke_circle(self.pointer, radius, self.current_color(false).fade(0.6));
        if self.ctrl {
            self.draw_palette(canvas);
        }
    }

    fn overlay(&self, lines: &mut Vec<String>) {
        lines.push("Ctrl + Wheel: cycle color".to_string());
        lines.push("Wheel: change brush size".to_string());
        lines.push("Shift: highlighter".to_string());
        lines.push("Ctrl + C: clear canvas".to_string());
        lines.push(format!("Brush size: {}", self.brush_size));
        lines.push(format!("Strokes: {}", self.strokes));
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.ink.resize(width, height);
        self.strokes = 0;
        self.last_stamp = None;
    }
}

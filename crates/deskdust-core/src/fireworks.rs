//! Fireworks: pointer-targeted rockets, pop flash, spark showers
//!
//! No occupancy grid and no settling: sparks just live and burn out. Each
//! spark drags a short ring-buffer trail drawn as fading line segments.

use glam::Vec2;
use rand::{Rng, RngCore, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;

use crate::canvas::Canvas;
use crate::color::Rgba;
use crate::config::FireworksConfig;
use crate::input::FrameInput;
use crate::simulation::Simulation;

/// Trail length kept short for per-frame cost.
const TRAIL_MAX: usize = 10;
/// Seconds the pop flash lasts before the spark shower.
const POP_DURATION: f32 = 0.2;
/// Frames-to-target used to solve the launch arc.
const FLIGHT_TIME: f32 = 60.0;
const LAUNCH_GRAVITY: f32 = 0.15;

struct Spark {
    pos: Vec2,
    vel: Vec2,
    life: f32,
    color: Rgba,
    trail: [Vec2; TRAIL_MAX],
    trail_count: usize,
    trail_head: usize,
}

impl Spark {
    fn new(origin: Vec2, rng: &mut dyn RngCore) -> Self {
        let angle = rng.gen::<f32>() * std::f32::consts::TAU;
        let speed = rng.gen::<f32>() * 4.0 + 1.0;
        Self {
            pos: origin,
            vel: Vec2::new(angle.cos(), angle.sin()) * speed,
            life: rng.gen::<f32>() + 1.0,
            color: Rgba::rgb(rng.gen(), rng.gen(), rng.gen()),
            trail: [origin; TRAIL_MAX],
            trail_count: 1,
            trail_head: 0,
        }
    }

    fn push_trail(&mut self) {
        self.trail[self.trail_head] = self.pos;
        self.trail_head = (self.trail_head + 1) % TRAIL_MAX;
        if self.trail_count < TRAIL_MAX {
            self.trail_count += 1;
        }
    }

    /// Returns false once the spark has burned out.
    fn update(&mut self, dt: f32, gravity: f32) -> bool {
        self.push_trail();
        self.vel.y += gravity * dt;
        self.pos += self.vel;
        self.life -= dt;
        self.life > 0.0
    }

    fn draw(&self, canvas: &mut dyn Canvas) {
        if self.trail_count > 1 {
            let mut idx = self.trail_head;
            for i in 1..self.trail_count {
                let prev = (idx + TRAIL_MAX - 1) % TRAIL_MAX;
                let alpha = i as f32 / self.trail_count as f32;
                let color = Rgba::new(self.color.r, self.color.g, self.color.b, (alpha * 180.0) as u8);
                canvas.line(self.trail[prev], self.trail[idx], color);
                idx = (idx + 1) % TRAIL_MAX;
            }
        }
        let core_alpha = (self.life * 255.0).clamp(0.0, 255.0) as u8;
        canvas.fill_circle(self.pos, 2.0, Rgba::new(255, 255, 255, core_alpha));
    }
}

struct Firework {
    pos: Vec2,
    target: Vec2,
    vel: Vec2,
    exploded: bool,
    popping: bool,
    pop_timer: f32,
    sparks: Vec<Spark>,
}

impl Firework {
    fn new(start: Vec2, target: Vec2) -> Self {
        // Solve the launch velocity so the arc peaks at the target after
        // FLIGHT_TIME frames of per-frame gravity.
        let delta = target - start;
        let vx = delta.x / FLIGHT_TIME;
        let vy = (delta.y - 0.5 * LAUNCH_GRAVITY * FLIGHT_TIME * FLIGHT_TIME) / FLIGHT_TIME;
        Self {
            pos: start,
            target,
            vel: Vec2::new(vx, vy),
            exploded: false,
            popping: false,
            pop_timer: 0.0,
            sparks: Vec::new(),
        }
    }

    /// Returns true when the show is over and the firework can be dropped.
    fn update(&mut self, dt: f32, gravity: f32, rng: &mut dyn RngCore) -> bool {
        if !self.exploded && !self.popping {
            self.vel.y += LAUNCH_GRAVITY;
            self.pos += self.vel;

            let past_x = (self.vel.x >= 0.0 && self.pos.x >= self.target.x)
                || (self.vel.x <= 0.0 && self.pos.x <= self.target.x);
            let past_y = (self.vel.y >= 0.0 && self.pos.y >= self.target.y)
                || (self.vel.y <= 0.0 && self.pos.y <= self.target.y);
            if past_x && past_y {
                self.popping = true;
                self.pop_timer = POP_DURATION;
            }
        } else if self.popping {
            self.pop_timer -= dt;
            if self.pop_timer <= 0.0 {
                self.explode(rng);
            }
        } else {
            let mut i = 0;
            while i < self.sparks.len() {
                if self.sparks[i].update(dt, gravity) {
                    i += 1;
                } else {
                    self.sparks.swap_remove(i);
                }
            }
            if self.sparks.is_empty() {
                return true;
            }
        }
        false
    }

    fn explode(&mut self, rng: &mut dyn RngCore) {
        self.popping = false;
        self.exploded = true;
        let count = (rng.gen::<f32>() * 25.0 + 25.0) as usize;
        self.sparks.reserve(count);
        for _ in 0..count {
            self.sparks.push(Spark::new(self.pos, rng));
        }
    }

    fn draw(&self, canvas: &mut dyn Canvas) {
        if !self.exploded && !self.popping {
            canvas.fill_circle(self.pos, 2.0, Rgba::YELLOW);
        } else if self.popping {
            let progress = 1.0 - self.pop_timer / POP_DURATION;
            let radius = 30.0 * progress;
            let fade = 1.0 - progress;
            canvas.fill_circle(self.pos, radius * 0.4, Rgba::new(255, 255, 255, (255.0 * fade) as u8));
            canvas.fill_circle(self.pos, radius * 0.7, Rgba::new(255, 255, 0, (200.0 * fade) as u8));
            canvas.fill_circle(self.pos, radius, Rgba::new(255, 200, 50, (120.0 * fade) as u8));
        } else {
            for spark in &self.sparks {
                spark.draw(canvas);
            }
        }
    }
}

pub struct FireworksSimulation {
    config: FireworksConfig,
    fireworks: Vec<Firework>,
    width: u32,
    height: u32,
    rng: Xoshiro256StarStar,
}

impl FireworksSimulation {
    pub fn new(width: u32, height: u32, config: FireworksConfig) -> Self {
        Self::seeded(width, height, config, rand::random())
    }

    pub fn seeded(width: u32, height: u32, config: FireworksConfig, seed: u64) -> Self {
        Self {
            config,
            fireworks: Vec::new(),
            width,
            height,
            rng: Xoshiro256StarStar::seed_from_u64(seed),
        }
    }

    pub fn active_count(&self) -> usize {
        self.fireworks.len()
    }

    fn launch(&mut self, target: Vec2) {
        let start = Vec2::new(self.width as f32 / 2.0, self.height as f32);
        self.fireworks.push(Firework::new(start, target));
    }
}

impl Simulation for FireworksSimulation {
    fn name(&self) -> &str {
        "Fireworks"
    }

    fn update(&mut self, input: &FrameInput) {
        if input.pointer_pressed {
            self.launch(input.pointer);
        } else if self.rng.gen::<f32>() < self.config.auto_launch_chance {
            self.launch(input.pointer);
        }

        let gravity = self.config.spark_gravity;
        let mut i = 0;
        while i < self.fireworks.len() {
            if self.fireworks[i].update(input.dt, gravity, &mut self.rng) {
                self.fireworks.swap_remove(i);
            } else {
                i += 1;
            }
        }
    }

    fn draw(&self, canvas: &mut dyn Canvas) {
        for firework in &self.fireworks {
            firework.draw(canvas);
        }
    }

    fn overlay(&self, lines: &mut Vec<String>) {
        lines.push(format!("Fireworks in flight: {}", self.fireworks.len()));
        lines.push("Click: launch toward pointer".to_string());
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_click_launches_toward_pointer() {
        let mut sim = FireworksSimulation::seeded(800, 600, FireworksConfig::default(), 4);
        let mut input = FrameInput::idle(800, 600, 1.0 / 60.0, 0.0);
        input.pointer = Vec2::new(200.0, 150.0);
        input.pointer_pressed = true;
        sim.update(&input);
        assert_eq!(sim.active_count(), 1);
        let fw = &sim.fireworks[0];
        assert_eq!(fw.target, Vec2::new(200.0, 150.0));
        // Launches rise: negative vy in screen coordinates.
        assert!(fw.vel.y < 0.0);
    }

    #[test]
    fn test_firework_show_eventually_ends() {
        let mut cfg = FireworksConfig::default();
        cfg.auto_launch_chance = 0.0;
        let mut sim = FireworksSimulation::seeded(400, 400, cfg, 12);
        let mut input = FrameInput::idle(400, 400, 1.0 / 60.0, 0.0);
        input.pointer = Vec2::new(200.0, 100.0);
        input.pointer_pressed = true;
        sim.update(&input);
        input.pointer_pressed = false;

        for frame in 1..2000 {
            input.now = frame as f64 / 60.0;
            sim.update(&input);
            if sim.active_count() == 0 {
                break;
            }
        }
        assert_eq!(sim.active_count(), 0);
    }

    #[test]
    fn test_spark_trail_ring_buffer_fills_and_wraps() {
        let mut rng = Xoshiro256StarStar::seed_from_u64(2);
        let mut spark = Spark::new(Vec2::new(10.0, 10.0), &mut rng);
        assert_eq!(spark.trail_count, 1);
        for _ in 0..TRAIL_MAX + 5 {
            spark.update(1.0 / 60.0, 1.5);
        }
        assert_eq!(spark.trail_count, TRAIL_MAX);
        assert!(spark.trail_head < TRAIL_MAX);
    }

    #[test]
    fn test_spark_burns_out_after_life() {
        let mut rng = Xoshiro256StarStar::seed_from_u64(2);
        let mut spark = Spark::new(Vec2::ZERO, &mut rng);
        let mut alive = true;
        let mut frames = 0;
        while alive && frames < 1000 {
            alive = spark.update(1.0 / 60.0, 1.5);
            frames += 1;
        }
        assert!(!alive);
        // Life is rolled in [1, 2) seconds.
        assert!(frames >= 59 && frames <= 121, "burned out after {frames}");
    }
}

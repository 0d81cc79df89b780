//! Sand spawner: fountain bursts and the hold-to-spawn density ramp

use std::f32::consts::PI;

use glam::{IVec2, Vec2};
use rand::{Rng, RngCore};

use crate::color::Rgba;
use crate::deposition::{DepositionEngine, ForceModel, SettleModel};

const MIN_EXPLOSION_SPEED: f32 = 2.0;
const MAX_EXPLOSION_SPEED: f32 = 5.0;
const SPREAD: f32 = PI / 2.0;
const TILT: f32 = PI / 3.0;

/// Spawn `density` grains in a disk around `center` and fire them along an
/// upward-and-outward cone (two symmetric lobes with angle jitter).
///
/// Samples use `sqrt(u) * radius` so the disk is area-uniform. Samples that
/// land outside the horizontal bound or on an occupied cell are discarded
/// without complaint. Returns the number of grains actually admitted.
pub fn fountain_burst<F, S>(
    engine: &mut DepositionEngine<F, S>,
    center: Vec2,
    density: i32,
    brush_radius: f32,
    color: Rgba,
    rng: &mut dyn RngCore,
) -> usize
where
    F: ForceModel<Traits = ()>,
    S: SettleModel<()>,
{
    let width = engine.grid().width() as i32;
    let mut spawned = 0;

    for _ in 0..density {
        let angle_offset = rng.gen::<f32>() * 2.0 * PI;
        let dist = rng.gen::<f32>().sqrt() * brush_radius;
        let px = (center.x + angle_offset.cos() * dist) as i32;
        let py = (center.y + angle_offset.sin() * dist) as i32;

        if px < 0 || py < 0 || px >= width {
            continue;
        }

        // Left or right lobe, with jitter biased toward the cone's center.
        let side = if rng.gen::<f32>() < 0.5 { PI } else { 2.0 * PI };
        let t = rng.gen::<f32>().powf(1.5);
        let angle = side - TILT - SPREAD / 2.0 + t * SPREAD;

        let speed = MIN_EXPLOSION_SPEED + rng.gen::<f32>() * (MAX_EXPLOSION_SPEED - MIN_EXPLOSION_SPEED);
        let mut vel = Vec2::new(angle.cos() * speed, angle.sin() * speed);

        // Grains must visibly arc before falling.
        if vel.y < 0.5 {
            vel.y = 0.5 + rng.gen::<f32>();
        }

        if engine.try_spawn(IVec2::new(px, py), vel, color, ()) {
            spawned += 1;
        }
    }

    spawned
}

/// Hold-to-spawn density ramp.
///
/// A fresh press yields density 1 and arms the delay timer; while the
/// trigger stays held past the delay, density grows linearly with held
/// time, capped at the configured maximum. Releasing resets both timers.
#[derive(Default)]
pub struct HoldRamp {
    held: f32,
    delay_left: f32,
}

impl HoldRamp {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the ramp one frame; returns the spawn density for this
    /// frame (0 when the trigger is up).
    pub fn update(
        &mut self,
        pressed: bool,
        down: bool,
        dt: f32,
        hold_delay: f32,
        ramp_rate: f32,
        max_density: i32,
    ) -> i32 {
        if pressed {
            self.held = 0.0;
            self.delay_left = hold_delay;
            return 1;
        }
        if down {
            if self.delay_left > 0.0 {
                self.delay_left -= dt;
                return 1;
            }
            self.held += dt;
            return 1 + (self.held * ramp_rate).min(max_density as f32) as i32;
        }
        self.held = 0.0;
        self.delay_left = 0.0;
        0
    }
}

//! Falling snow: drifting flakes, shared wind gusts, land-then-fade settling
//!
//! Flakes do not claim occupancy cells while airborne; a cell is claimed
//! the moment a flake lands on the floor or on top of another landed
//! flake. Landed flakes keep full alpha for `fade_delay` seconds, then
//! fade out and release their cell exactly once.

use glam::{IVec2, Vec2};
use rand::{Rng, RngCore, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;

use crate::canvas::Canvas;
use crate::color::Rgba;
use crate::config::SnowConfig;
use crate::deposition::{
    DepositionEngine, ForceEnv, ForceModel, Mobile, MotionStyle, SettleEvent, SettleModel,
    Transition,
};
use crate::grid::OccupancyGrid;
use crate::input::FrameInput;
use crate::simulation::Simulation;

/// Per-flake physical variance, fixed at spawn and never changed.
#[derive(Clone, Copy, Debug)]
pub struct FlakeTraits {
    /// Draw diameter in pixels.
    pub size: i32,
    /// Personal gravity; small flakes fall faster relative to their size.
    pub gravity: f32,
    /// How strongly the shared wind scalar couples to this flake.
    pub wind_factor: f32,
    /// Constant personal drift on the horizontal axis.
    pub drift: f32,
}

/// Wind, drift, personal gravity and radius-limited pointer repulsion.
pub struct DriftForces {
    pub avoid_radius: f32,
    pub avoid_strength: f32,
}

impl ForceModel for DriftForces {
    type Traits = FlakeTraits;

    fn motion_style(&self) -> MotionStyle {
        MotionStyle::Ballistic
    }

    fn apply(&self, flake: &mut Mobile<FlakeTraits>, env: &ForceEnv, _rng: &mut dyn RngCore) {
        let dt = env.dt;
        flake.vel.x += flake.traits.drift * 0.1 * dt;
        flake.vel.x += env.wind * flake.traits.wind_factor * dt;
        flake.vel.y += flake.traits.gravity * dt;

        // Inverse-linear pointer repulsion, zero beyond the radius.
        let delta = flake.pos.as_vec2() - env.pointer;
        let dist_sq = delta.length_squared();
        if dist_sq < self.avoid_radius * self.avoid_radius && dist_sq > 1.0 {
            let dist = dist_sq.sqrt();
            let falloff = (self.avoid_radius - dist) / self.avoid_radius;
            flake.vel.x += (delta.x / dist) * self.avoid_strength * dt * falloff;
            if delta.y < 0.0 {
                // Push up only when the flake is above the pointer.
                flake.vel.y += (delta.y / dist) * (self.avoid_strength * 0.2) * dt * falloff;
            }
        }
    }
}

/// Instant landing: the first blocked frame settles the flake; leaving the
/// screen discards it with no landing effect.
pub struct FadeAfterLanding;

impl SettleModel<FlakeTraits> for FadeAfterLanding {
    fn on_moved(&self, _flake: &mut Mobile<FlakeTraits>) {}

    fn on_blocked(&self, _flake: &mut Mobile<FlakeTraits>, _dt: f32) -> Transition {
        Transition::Settle
    }

    fn on_escaped(&self, _flake: &mut Mobile<FlakeTraits>) -> Transition {
        Transition::Discard
    }
}

/// A landed flake, tracked only for fade/removal bookkeeping.
#[derive(Clone, Debug)]
pub struct RestingFlake {
    pub pos: IVec2,
    pub cell: usize,
    pub color: Rgba,
    pub size: i32,
    pub alpha: f32,
    pub landed_at: f64,
    pub fade_from: f64,
}

/// Fade bookkeeping for landed flakes.
///
/// Alpha holds at 1.0 until `fade_from`, then drops by `fade_speed * dt`
/// per frame; a flake at or below zero alpha is removed exactly once and
/// its occupancy cell released.
#[derive(Default)]
pub struct FadePool {
    flakes: Vec<RestingFlake>,
}

impl FadePool {
    pub fn land(&mut self, flake: Mobile<FlakeTraits>, now: f64, fade_delay: f32) {
        self.flakes.push(RestingFlake {
            pos: flake.pos,
            cell: flake.cell,
            color: flake.color,
            size: flake.traits.size,
            alpha: 1.0,
            landed_at: now,
            fade_from: now + fade_delay as f64,
        });
    }

    pub fn update(&mut self, now: f64, dt: f32, fade_speed: f32, grid: &mut OccupancyGrid) {
        for flake in &mut self.flakes {
            if now > flake.fade_from {
                flake.alpha -= fade_speed * dt;
            }
        }
        self.flakes.retain(|flake| {
            if flake.alpha <= 0.0 {
                grid.release(flake.cell);
                false
            } else {
                true
            }
        });
    }

    pub fn len(&self) -> usize {
        self.flakes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flakes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RestingFlake> {
        self.flakes.iter()
    }

    pub fn clear(&mut self) {
        self.flakes.clear();
    }
}

/// Shared gust scalar, smoothed toward a target that is re-rolled every
/// 2-5 seconds. All flakes feel the same wind, each scaled by its own
/// fixed susceptibility: coherent gusts, not per-flake noise.
pub struct WindModel {
    wind: f32,
    target: f32,
    gust_timer: f32,
    next_gust: f32,
}

impl WindModel {
    pub fn new() -> Self {
        Self {
            wind: 0.0,
            target: 0.0,
            gust_timer: 0.0,
            next_gust: 2.0,
        }
    }

    pub fn update(&mut self, dt: f32, rng: &mut dyn RngCore) {
        self.gust_timer += dt;
        if self.gust_timer > self.next_gust {
            self.target = rng.gen_range(-0.5..=0.5);
            self.gust_timer = 0.0;
            self.next_gust = rng.gen_range(2.0..5.0);
        }
        self.wind += (self.target - self.wind) * 0.5 * dt;
    }

    pub fn wind(&self) -> f32 {
        self.wind
    }
}

impl Default for WindModel {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawns one flake per `spawn_interval` seconds at a random column of
/// row 0, with size-scaled gravity and personal drift rolled once.
pub struct FlakeSpawner {
    timer: f32,
}

impl FlakeSpawner {
    pub fn new() -> Self {
        Self { timer: 0.0 }
    }

    /// Advance the spawn timer; at most one flake per frame.
    pub fn poll(
        &mut self,
        dt: f32,
        width: u32,
        cfg: &SnowConfig,
        rng: &mut dyn RngCore,
    ) -> Option<(IVec2, Vec2, FlakeTraits)> {
        self.timer += dt;
        if self.timer <= cfg.spawn_interval {
            return None;
        }
        self.timer = 0.0;

        let x = rng.gen_range(0..width as i32);
        let size = rng.gen_range(cfg.min_flake_size..=cfg.max_flake_size);
        let base_fall = 0.3 + 0.6 / size as f32;
        let gravity = base_fall * rng.gen_range(0.8..=1.2);
        let wind_factor = rng.gen_range(0.5..=1.5);
        let drift = rng.gen_range(-1.0..=1.0) * 0.3;

        let traits = FlakeTraits {
            size,
            gravity,
            wind_factor,
            drift,
        };
        Some((IVec2::new(x, 0), Vec2::new(drift, gravity), traits))
    }
}

impl Default for FlakeSpawner {
    fn default() -> Self {
        Self::new()
    }
}

pub struct SnowSimulation {
    config: SnowConfig,
    engine: DepositionEngine<DriftForces, FadeAfterLanding>,
    resting: FadePool,
    spawner: FlakeSpawner,
    wind: WindModel,
    rng: Xoshiro256StarStar,
}

impl SnowSimulation {
    pub fn new(width: u32, height: u32, config: SnowConfig) -> Self {
        Self::seeded(width, height, config, rand::random())
    }

    /// Deterministic construction for tests.
    pub fn seeded(width: u32, height: u32, config: SnowConfig, seed: u64) -> Self {
        let engine = DepositionEngine::new(
            width,
            height,
            DriftForces {
                avoid_radius: config.mouse_avoid_radius,
                avoid_strength: config.mouse_avoid_strength,
            },
            FadeAfterLanding,
        );
        Self {
            config,
            engine,
            resting: FadePool::default(),
            spawner: FlakeSpawner::new(),
            wind: WindModel::new(),
            rng: Xoshiro256StarStar::seed_from_u64(seed),
        }
    }

    pub fn mobile_count(&self) -> usize {
        self.engine.mobile_count()
    }

    pub fn resting_count(&self) -> usize {
        self.resting.len()
    }

    fn draw_flake(canvas: &mut dyn Canvas, pos: IVec2, size: i32, color: Rgba) {
        if size <= 1 {
            canvas.set_pixel(pos.x, pos.y, color);
        } else {
            canvas.fill_circle(pos.as_vec2(), size as f32 * 0.5, color);
        }
    }
}

impl Simulation for SnowSimulation {
    fn name(&self) -> &str {
        "Snow"
    }

    fn update(&mut self, input: &FrameInput) {
        self.engine.set_floor(input.floor);
        self.wind.update(input.dt, &mut self.rng);

        if let Some((pos, vel, traits)) =
            self.spawner
                .poll(input.dt, input.width, &self.config, &mut self.rng)
        {
            self.engine.try_spawn(pos, vel, Rgba::WHITE, traits);
        }

        let env = ForceEnv {
            dt: input.dt,
            pointer: input.pointer,
            wind: self.wind.wind(),
        };
        let resting = &mut self.resting;
        let fade_delay = self.config.fade_delay;
        let now = input.now;
        self.engine.step(&env, &mut self.rng, &mut |event| match event {
            SettleEvent::Settled(flake) => resting.land(flake, now, fade_delay),
            // Off-screen flakes vanish without a landing effect.
            SettleEvent::Escaped(_) => {}
        });

        self.resting.update(
            now,
            input.dt,
            self.config.fade_speed,
            self.engine.grid_mut(),
        );
    }

    fn draw(&self, canvas: &mut dyn Canvas) {
        for flake in self.resting.iter() {
            Self::draw_flake(canvas, flake.pos, flake.size, flake.color.fade(flake.alpha));
        }
        for flake in self.engine.mobile() {
            Self::draw_flake(canvas, flake.pos, flake.traits.size, flake.color);
        }
    }

    fn overlay(&self, lines: &mut Vec<String>) {
        lines.push(format!("Dynamic flakes: {}", self.engine.mobile_count()));
        lines.push(format!("Static flakes: {}", self.resting.len()));
        lines.push(format!(
            "Flake size: {}..{}",
            self.config.min_flake_size, self.config.max_flake_size
        ));
        lines.push(format!("Spawn interval: {:.3}s", self.config.spawn_interval));
        lines.push(format!("Fade delay: {:.0}s", self.config.fade_delay));
        lines.push(format!("Wind: {:+.2}", self.wind.wind()));
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.engine.resize(width, height);
        self.resting.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flake(pos: IVec2) -> Mobile<FlakeTraits> {
        Mobile::new(
            pos,
            Vec2::ZERO,
            Rgba::WHITE,
            0,
            FlakeTraits {
                size: 2,
                gravity: 0.5,
                wind_factor: 1.0,
                drift: 0.0,
            },
        )
    }

    #[test]
    fn test_fade_holds_alpha_until_delay_elapses() {
        let mut pool = FadePool::default();
        let mut grid = OccupancyGrid::new(10, 10);
        grid.claim(0);
        pool.land(flake(IVec2::new(0, 0)), 100.0, 5.0);

        let dt = 0.5;
        let mut now = 100.0;
        while now <= 104.9 {
            pool.update(now, dt, 1.0, &mut grid);
            now += dt as f64;
        }
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.iter().next().unwrap().alpha, 1.0);
    }

    #[test]
    fn test_fade_strictly_decreases_then_removes_once() {
        let mut pool = FadePool::default();
        let mut grid = OccupancyGrid::new(10, 10);
        grid.claim(0);
        pool.land(flake(IVec2::new(0, 0)), 0.0, 0.0);

        let dt = 0.25;
        let mut now = 0.1f64;
        let mut last_alpha = 1.0f32;
        let mut removed_at = None;
        for frame in 0..100 {
            pool.update(now, dt, 0.5, &mut grid);
            if let Some(f) = pool.iter().next() {
                assert!(f.alpha < last_alpha, "alpha must strictly decrease");
                last_alpha = f.alpha;
            } else if removed_at.is_none() {
                removed_at = Some(frame);
                // Cell released exactly when the flake is removed.
                assert!(!grid.is_occupied(0));
            }
            now += dt as f64;
        }
        // 1.0 / (0.5 * 0.25) = 8 fade updates; removal lands in the
        // eighth (index 7).
        assert_eq!(removed_at, Some(7));
        assert!(pool.is_empty());
    }

    #[test]
    fn test_default_fade_timeline() {
        // FadeDelay=180s, FadeSpeed=0.05: alpha holds 1.0 for 180s after
        // landing, reaches 0 after a further 20s.
        let mut pool = FadePool::default();
        let mut grid = OccupancyGrid::new(10, 10);
        grid.claim(0);
        pool.land(flake(IVec2::new(0, 0)), 0.0, 180.0);

        let dt = 1.0;
        let mut now = 0.0f64;
        for _ in 0..180 {
            pool.update(now, dt, 0.05, &mut grid);
            now += 1.0;
        }
        assert_eq!(pool.iter().next().unwrap().alpha, 1.0);

        let mut removal_time = None;
        for _ in 0..40 {
            pool.update(now, dt, 0.05, &mut grid);
            now += 1.0;
            if pool.is_empty() && removal_time.is_none() {
                removal_time = Some(now);
            }
        }
        // 1.0 / 0.05 = 20 more simulated seconds.
        let removal = removal_time.expect("flake never faded out");
        assert!((removal - 201.0).abs() <= 1.0, "removed at {removal}");
        assert!(!grid.is_occupied(0));
    }

    #[test]
    fn test_wind_stays_within_gust_bounds() {
        let mut wind = WindModel::new();
        let mut rng = Xoshiro256StarStar::seed_from_u64(77);
        for _ in 0..10_000 {
            wind.update(1.0 / 60.0, &mut rng);
            assert!(wind.wind().abs() <= 0.5 + f32::EPSILON);
        }
    }

    #[test]
    fn test_wind_converges_toward_target() {
        let mut wind = WindModel::new();
        let mut rng = Xoshiro256StarStar::seed_from_u64(1);
        // Big dt forces visible convergence inside one gust window.
        wind.update(0.5, &mut rng);
        let first = wind.wind();
        wind.update(0.5, &mut rng);
        let second = wind.wind();
        assert!((second - wind.target).abs() <= (first - wind.target).abs());
    }

    #[test]
    fn test_spawner_respects_interval_and_trait_ranges() {
        let cfg = SnowConfig {
            spawn_interval: 1.0,
            ..SnowConfig::default()
        };
        let mut spawner = FlakeSpawner::new();
        let mut rng = Xoshiro256StarStar::seed_from_u64(8);

        assert!(spawner.poll(0.4, 800, &cfg, &mut rng).is_none());
        assert!(spawner.poll(0.4, 800, &cfg, &mut rng).is_none());
        let (pos, vel, traits) = spawner
            .poll(0.4, 800, &cfg, &mut rng)
            .expect("interval elapsed");

        assert_eq!(pos.y, 0);
        assert!(pos.x >= 0 && pos.x < 800);
        assert!(traits.size >= cfg.min_flake_size && traits.size <= cfg.max_flake_size);
        let base = 0.3 + 0.6 / traits.size as f32;
        assert!(traits.gravity >= base * 0.8 - f32::EPSILON);
        assert!(traits.gravity <= base * 1.2 + f32::EPSILON);
        assert!((0.5..=1.5).contains(&traits.wind_factor));
        assert!(traits.drift.abs() <= 0.3 + f32::EPSILON);
        assert_eq!(vel, Vec2::new(traits.drift, traits.gravity));
    }

    #[test]
    fn test_avoidance_zero_beyond_radius() {
        let forces = DriftForces {
            avoid_radius: 50.0,
            avoid_strength: 6.0,
        };
        let mut far = flake(IVec2::new(500, 500));
        far.traits.gravity = 0.0;
        far.traits.drift = 0.0;
        let env = ForceEnv {
            dt: 1.0 / 60.0,
            pointer: Vec2::new(0.0, 0.0),
            wind: 0.0,
        };
        let mut rng = Xoshiro256StarStar::seed_from_u64(0);
        forces.apply(&mut far, &env, &mut rng);
        assert_eq!(far.vel.x, 0.0);

        let mut near = flake(IVec2::new(510, 500));
        near.traits.gravity = 0.0;
        near.traits.drift = 0.0;
        let env_near = ForceEnv {
            dt: 1.0 / 60.0,
            pointer: Vec2::new(500.0, 500.0),
            wind: 0.0,
        };
        forces.apply(&mut near, &env_near, &mut rng);
        // Pushed away from the pointer along +x.
        assert!(near.vel.x > 0.0);
    }

    #[test]
    fn test_landed_flake_blocks_the_next_one() {
        let cfg = SnowConfig::default();
        let mut sim = SnowSimulation::seeded(20, 20, cfg, 3);
        // Land one flake by hand at the floor column.
        let mut first = flake(IVec2::new(10, 18));
        first.cell = sim.engine.grid().index(10, 18).unwrap();
        sim.engine.grid_mut().claim(first.cell);
        sim.resting.land(first, 0.0, 1000.0);

        // A second flake falling straight down the same column lands on top.
        let idx_above = sim.engine.grid().index(10, 17).unwrap();
        assert!(sim
            .engine
            .try_spawn(IVec2::new(10, 16), Vec2::new(0.0, 1.0), Rgba::WHITE, flake(IVec2::ZERO).traits));
        let mut input = FrameInput::idle(20, 20, 1.0 / 60.0, 0.0);
        input.floor = 19;
        for frame in 0..10 {
            input.now = frame as f64 / 60.0;
            sim.update(&input);
        }
        assert!(sim.resting_count() >= 2);
        assert!(sim.engine.grid().is_occupied(idx_above));
    }
}

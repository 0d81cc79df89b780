//! Per-simulation tunables and the overlay-wide settings
//!
//! Loaded once at startup by the host's config store; some fields are
//! mutated live by wheel input during the run and are never flushed back
//! automatically. Every field falls back to its documented default
//! independently (`#[serde(default)]` on each struct), so a partially
//! present or stale config file degrades silently instead of failing.

use serde::{Deserialize, Serialize};

use crate::color::Rgba;
use crate::simulation::SimulationKind;

/// Falling-sand tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SandConfig {
    /// Spawn disk radius in pixels (Alt+wheel, 1..=100).
    pub brush_radius: f32,
    /// Density ramp cap (Ctrl+wheel, 1..=100).
    pub max_density: i32,
    /// Brightness oscillation speed of the sand hue.
    pub hue_cycle_speed: f32,
    /// Density growth per held second once the hold delay elapsed.
    pub density_ramp_rate: f32,
    /// Seconds the trigger must stay held before the ramp starts.
    pub hold_delay: f32,
    /// Downward acceleration per frame step.
    pub gravity: f32,
    /// Vertical speed cap.
    pub max_fall_speed: f32,
    /// Horizontal velocity multiplier per frame.
    pub air_resistance: f32,
    /// Continuous stillness seconds before a grain bakes into the deposit.
    pub settle_threshold: f32,
}

impl Default for SandConfig {
    fn default() -> Self {
        Self {
            brush_radius: 10.0,
            max_density: 30,
            hue_cycle_speed: 2.0,
            density_ramp_rate: 40.0,
            hold_delay: 0.15,
            gravity: 0.05,
            max_fall_speed: 5.0,
            air_resistance: 0.99,
            settle_threshold: 5.0,
        }
    }
}

/// Falling-snow tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnowConfig {
    pub min_flake_size: i32,
    pub max_flake_size: i32,
    /// Seconds between flake spawns.
    pub spawn_interval: f32,
    /// Seconds a landed flake keeps full alpha before fading.
    pub fade_delay: f32,
    /// Alpha drop per second once fading.
    pub fade_speed: f32,
    /// Pointer repulsion radius in pixels.
    pub mouse_avoid_radius: f32,
    /// Pointer repulsion strength.
    pub mouse_avoid_strength: f32,
}

impl Default for SnowConfig {
    fn default() -> Self {
        Self {
            min_flake_size: 1,
            max_flake_size: 6,
            spawn_interval: 0.01,
            fade_delay: 180.0,
            fade_speed: 0.05,
            mouse_avoid_radius: 75.0,
            mouse_avoid_strength: 6.0,
        }
    }
}

/// Fireworks tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FireworksConfig {
    /// Chance per frame of an unprompted launch toward the pointer.
    pub auto_launch_chance: f32,
    /// Spark gravity in velocity units per second.
    pub spark_gravity: f32,
}

impl Default for FireworksConfig {
    fn default() -> Self {
        Self {
            auto_launch_chance: 0.01,
            spark_gravity: 1.5,
        }
    }
}

/// Freehand drawing tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawingConfig {
    pub default_brush_size: i32,
    pub min_brush_size: i32,
    pub max_brush_size: i32,
    /// Ink alpha while shift is held.
    pub highlighter_alpha: f32,
    /// Ctrl+wheel cycles through these.
    pub preset_colors: Vec<Rgba>,
}

impl Default for DrawingConfig {
    fn default() -> Self {
        Self {
            default_brush_size: 4,
            min_brush_size: 1,
            max_brush_size: 40,
            highlighter_alpha: 0.35,
            preset_colors: vec![
                Rgba::rgb(255, 255, 255),
                Rgba::rgb(230, 41, 55),
                Rgba::rgb(255, 161, 0),
                Rgba::rgb(253, 249, 0),
                Rgba::rgb(0, 228, 48),
                Rgba::rgb(102, 191, 255),
                Rgba::rgb(200, 122, 255),
                Rgba::rgb(0, 0, 0),
            ],
        }
    }
}

/// Host/window settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Monitor index; -1 means the current monitor.
    pub active_monitor: i32,
    /// Start with the window click-through.
    pub mouse_passthrough: bool,
    /// Start always-on-top.
    pub topmost: bool,
    /// Reserve the taskbar strip at the bottom of the screen.
    pub taskbar_aware: bool,
    /// Reserved strip height in pixels when taskbar-aware.
    pub taskbar_height: i32,
    pub target_fps: u32,
    pub active_sim: SimulationKind,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            active_monitor: -1,
            mouse_passthrough: true,
            topmost: true,
            taskbar_aware: true,
            taskbar_height: 48,
            target_fps: 60,
            active_sim: SimulationKind::Sand,
        }
    }
}

/// The whole persisted configuration object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub overlay: OverlayConfig,
    pub sand: SandConfig,
    pub snow: SnowConfig,
    pub fireworks: FireworksConfig,
    pub drawing: DrawingConfig,
}

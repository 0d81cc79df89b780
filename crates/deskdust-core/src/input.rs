//! Per-frame input snapshot handed to simulations by the host

use glam::Vec2;

/// Everything a simulation may consume during one `update` call.
///
/// The host collects this once per frame from its window/input collaborator;
/// simulations never query the OS themselves. Shared flags are plain scalars
/// read once per frame, so no simulation ever observes a partial update.
#[derive(Clone, Debug)]
pub struct FrameInput {
    /// Seconds since the previous frame.
    pub dt: f32,
    /// Monotonic seconds since the host started.
    pub now: f64,
    /// Screen width in pixels.
    pub width: u32,
    /// Screen height in pixels.
    pub height: u32,
    /// Effective bottom bound: screen height minus the reserved taskbar
    /// height, or height minus one when not taskbar-aware. Particles never
    /// enter rows at or below this value.
    pub floor: i32,
    /// Pointer position in screen pixels.
    pub pointer: Vec2,
    /// Primary button went down this frame.
    pub pointer_pressed: bool,
    /// Primary button is currently held.
    pub pointer_down: bool,
    /// Wheel movement this frame, in detents.
    pub wheel: f32,
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    /// Host-mapped "clear the canvas" chord (drawing toy).
    pub clear_requested: bool,
    /// Host-mapped brush size keys, +1/-1 per press (drawing toy).
    pub brush_delta: i32,
}

impl FrameInput {
    /// A quiet frame at a given screen size, the base for tests and for
    /// hosts that fill fields in incrementally.
    pub fn idle(width: u32, height: u32, dt: f32, now: f64) -> Self {
        Self {
            dt,
            now,
            width,
            height,
            floor: height as i32 - 1,
            pointer: Vec2::ZERO,
            pointer_pressed: false,
            pointer_down: false,
            wheel: 0.0,
            ctrl: false,
            alt: false,
            shift: false,
            clear_requested: false,
            brush_delta: 0,
        }
    }

    pub fn wheel_steps(&self) -> i32 {
        self.wheel as i32
    }
}

//! # Deskdust Core
//!
//! The simulation engine behind Deskdust's desktop-overlay particle toys:
//! falling sand, falling snow, fireworks and freehand drawing.
//!
//! The interesting part is the grid-deposition engine shared by sand and
//! snow: a per-pixel occupancy grid, a pool of mobile particles integrated
//! against it every frame, and a settlement step that retires particles
//! into cheap static state (a baked deposit raster for sand, a fading
//! resting pool for snow). Everything host-specific (windowing, input
//! capture, GPU upload, config files) lives in the `deskdust` crate and
//! talks to this one through [`FrameInput`] and [`Canvas`].

pub mod canvas;
pub mod color;
pub mod config;
pub mod deposition;
pub mod drawing;
pub mod fireworks;
pub mod grid;
pub mod input;
pub mod raster;
pub mod sand;
pub mod simulation;
pub mod snow;
pub mod spawn;

pub use canvas::Canvas;
pub use input::FrameInput;
pub use simulation::{Registry, Simulation, SimulationKind};

/// Common imports for internal use
pub mod prelude {
    pub use crate::canvas::Canvas;
    pub use crate::color::Rgba;
    pub use crate::config::AppConfig;
    pub use crate::input::FrameInput;
    pub use crate::simulation::{Registry, Simulation, SimulationKind};
    pub use glam::{IVec2, Vec2};
}

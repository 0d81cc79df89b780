//! # Deskdust - Desktop Overlay Host
//!
//! The windowing half of Deskdust: a transparent, undecorated, always-on-top
//! window covering one monitor, with click-through toggling, per-frame input
//! capture, a CPU pixel canvas uploaded as a GPU texture, and a small egui
//! HUD. All particle behavior lives in `deskdust-core`; this crate only
//! feeds it [`deskdust_core::FrameInput`] and hands it a canvas.

pub mod app;
pub mod canvas;
pub mod config;
pub mod render;
pub mod ui;

pub use app::App;

/// Common imports for internal use
pub mod prelude {
    pub use deskdust_core::prelude::*;
    pub use glam::{IVec2, Vec2};
}

//! UI module for the overlay window

mod hud;

pub use hud::{OverlayStats, show_hud};

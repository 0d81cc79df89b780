//! Rendering module for the overlay window

mod renderer;

pub use renderer::Renderer;

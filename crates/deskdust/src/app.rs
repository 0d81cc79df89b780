//! Application state and event loop for the desktop overlay

use anyhow::Result;
use std::sync::Arc;
use web_time::Instant;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, ModifiersState, PhysicalKey},
    window::{Window, WindowAttributes, WindowId, WindowLevel},
};

use deskdust_core::config::AppConfig;
use deskdust_core::drawing::DrawingSimulation;
use deskdust_core::fireworks::FireworksSimulation;
use deskdust_core::input::FrameInput;
use deskdust_core::sand::SandSimulation;
use deskdust_core::simulation::{Registry, Simulation, SimulationKind};
use deskdust_core::snow::SnowSimulation;

use crate::canvas::PixelCanvas;
use crate::config::ConfigStore;
use crate::render::Renderer;
use crate::ui::{OverlayStats, show_hud};

/// Seconds Escape must be held before the overlay quits.
const EXIT_HOLD_SECONDS: f32 = 2.5;

/// Main application state
pub struct App {
    // Window and rendering
    window: Arc<Window>,
    renderer: Renderer,
    egui_ctx: egui::Context,
    egui_state: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,

    // Simulation
    registry: Registry,
    canvas: PixelCanvas,
    store: ConfigStore,

    // Window state
    passthrough: bool,

    // Input state collected between frames
    pointer: (f32, f32),
    pointer_down: bool,
    pointer_pressed: bool,
    pending_wheel: f32,
    pending_brush_delta: i32,
    clear_requested: bool,
    modifiers: ModifiersState,
    esc_held_since: Option<Instant>,

    // Timing
    started: Instant,
    last_update: Instant,
    frame_count: u64,
    fps_update_time: Instant,
    fps: f32,
}

impl App {
    /// Create a new app
    pub async fn new() -> Result<(Self, EventLoop<()>)> {
        let store = ConfigStore::open(ConfigStore::default_path())?;
        let overlay_cfg = store.config.overlay.clone();

        // Create event loop
        let event_loop = EventLoop::new()?;

        let mut window_attrs = WindowAttributes::default()
            .with_title("Deskdust")
            .with_transparent(true)
            .with_decorations(false)
            .with_resizable(false);
        if overlay_cfg.topmost {
            window_attrs = window_attrs.with_window_level(WindowLevel::AlwaysOnTop);
        }

        let window = Arc::new(event_loop.create_window(window_attrs)?);

        // Stretch over the target monitor; -1 means whatever the primary is.
        let monitor = if overlay_cfg.active_monitor >= 0 {
            window
                .available_monitors()
                .nth(overlay_cfg.active_monitor as usize)
        } else {
            None
        }
        .or_else(|| window.primary_monitor())
        .or_else(|| window.current_monitor());
        if let Some(monitor) = &monitor {
            window.set_outer_position(monitor.position());
            let _ = window.request_inner_size(monitor.size());
        }

        // Click-through by default so the overlay does not steal the desktop.
        let passthrough = overlay_cfg.mouse_passthrough;
        if let Err(err) = window.set_cursor_hittest(!passthrough) {
            log::warn!("cursor hittest unsupported on this platform: {err}");
        }

        // Create renderer
        let renderer = Renderer::new(&window).await?;
        let size = window.inner_size();
        let canvas = PixelCanvas::new(size.width.max(1), size.height.max(1));

        let registry = Registry::new(overlay_cfg.active_sim);
        window.set_cursor_visible(
            passthrough || overlay_cfg.active_sim != SimulationKind::Drawing,
        );

        // Setup egui
        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(
            &renderer.device,
            renderer.surface_format(),
            egui_wgpu::RendererOptions::default(),
        );

        let now = Instant::now();
        Ok((
            Self {
                window,
                renderer,
                egui_ctx,
                egui_state,
                egui_renderer,
                registry,
                canvas,
                store,
                passthrough,
                pointer: (0.0, 0.0),
                pointer_down: false,
                pointer_pressed: false,
                pending_wheel: 0.0,
                pending_brush_delta: 0,
                clear_requested: false,
                modifiers: ModifiersState::empty(),
                esc_held_since: None,
                started: now,
                last_update: now,
                frame_count: 0,
                fps_update_time: now,
                fps: 0.0,
            },
            event_loop,
        ))
    }

    /// Run the event loop
    pub fn run(event_loop: EventLoop<()>, mut app: Self) -> Result<()> {
        event_loop.run_app(&mut app)?;
        Ok(())
    }

    fn exit_progress(&self) -> f32 {
        match self.esc_held_since {
            Some(since) => (since.elapsed().as_secs_f32() / EXIT_HOLD_SECONDS).min(1.0),
            None => 0.0,
        }
    }

    fn floor(&self, height: u32) -> i32 {
        let overlay = &self.store.config.overlay;
        if overlay.taskbar_aware {
            (height as i32 - overlay.taskbar_height).max(1)
        } else {
            height as i32 - 1
        }
    }

    fn build_frame_input(&mut self) -> FrameInput {
        let now = Instant::now();
        let dt = now
            .duration_since(self.last_update)
            .as_secs_f32()
            .min(0.25);
        self.last_update = now;

        let size = self.renderer.size();
        let mut input = FrameInput::idle(
            size.width.max(1),
            size.height.max(1),
            dt,
            self.started.elapsed().as_secs_f64(),
        );
        input.floor = self.floor(size.height.max(1));
        input.pointer = glam::Vec2::new(self.pointer.0, self.pointer.1);
        input.pointer_pressed = self.pointer_pressed;
        input.pointer_down = self.pointer_down;
        input.wheel = self.pending_wheel;
        input.ctrl = self.modifiers.control_key();
        input.alt = self.modifiers.alt_key();
        input.shift = self.modifiers.shift_key();
        input.clear_requested = self.clear_requested;
        input.brush_delta = self.pending_brush_delta;

        // Edge-triggered state is consumed by exactly one frame.
        self.pointer_pressed = false;
        self.pending_wheel = 0.0;
        self.pending_brush_delta = 0;
        self.clear_requested = false;

        input
    }

    fn active_sim(&mut self) -> &mut dyn Simulation {
        let size = self.renderer.size();
        let width = size.width.max(1);
        let height = size.height.max(1);
        let config = self.store.config.clone();
        self.registry
            .active_mut(move |kind| build_simulation(kind, width, height, &config))
    }

    fn switch_simulation(&mut self, kind: SimulationKind) {
        self.registry.switch(kind);
        self.store.config.overlay.active_sim = kind;
        self.sync_cursor_visibility();
    }

    fn toggle_passthrough(&mut self) {
        self.passthrough = !self.passthrough;
        if let Err(err) = self.window.set_cursor_hittest(!self.passthrough) {
            log::warn!("cursor hittest unsupported on this platform: {err}");
        }
        self.sync_cursor_visibility();
        self.store.config.overlay.mouse_passthrough = self.passthrough;
        log::info!("click-through {}", if self.passthrough { "on" } else { "off" });
    }

    fn toggle_topmost(&mut self) {
        let overlay = &mut self.store.config.overlay;
        overlay.topmost = !overlay.topmost;
        let level = if overlay.topmost {
            WindowLevel::AlwaysOnTop
        } else {
            WindowLevel::Normal
        };
        self.window.set_window_level(level);
        log::info!("always-on-top {}", if overlay.topmost { "on" } else { "off" });
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if let Err(err) = self.store.save() {
            log::warn!("could not save config: {err}");
        }
        event_loop.exit();
    }

    /// Update simulation
    fn update(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();

        // Update FPS
        self.frame_count += 1;
        if now.duration_since(self.fps_update_time).as_secs_f32() >= 1.0 {
            self.fps = self.frame_count as f32;
            self.frame_count = 0;
            self.fps_update_time = now;
        }

        if self.exit_progress() >= 1.0 {
            self.shutdown(event_loop);
            return;
        }

        let input = self.build_frame_input();
        self.active_sim().update(&input);
    }

    /// Render frame
    fn render(&mut self) -> Result<()> {
        // Redraw the canvas from simulation state
        self.canvas.clear();
        {
            let canvas = &mut self.canvas;
            let size = self.renderer.size();
            let width = size.width.max(1);
            let height = size.height.max(1);
            let config = self.store.config.clone();
            let sim = self
                .registry
                .active_mut(move |kind| build_simulation(kind, width, height, &config));
            sim.draw(canvas);
        }
        self.renderer.update_overlay_texture(&self.canvas);

        // Collect data for egui closure to avoid borrow checker issues
        let show_diagnostics = self.modifiers.control_key() || self.modifiers.alt_key();
        let stats = if show_diagnostics || self.exit_progress() > 0.0 {
            let mut lines = Vec::new();
            let sim = self.active_sim();
            let sim_name = sim.name().to_string();
            if show_diagnostics {
                sim.overlay(&mut lines);
            }
            Some(OverlayStats {
                fps: self.fps,
                sim_name,
                lines,
                passthrough: self.passthrough,
                exit_progress: self.exit_progress(),
            })
        } else {
            None
        };

        // Begin frame
        let output = self.renderer.begin_frame()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder =
            self.renderer
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("render_encoder"),
                });

        // Render simulation canvas
        self.renderer.render_overlay(&mut encoder, &view)?;

        // Run egui
        let raw_input = self.egui_state.take_egui_input(&self.window);
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            if let Some(stats) = &stats {
                show_hud(ctx, stats);
            }
        });

        // Handle egui platform output
        self.egui_state
            .handle_platform_output(&self.window, full_output.platform_output);

        // Tessellate egui shapes
        let paint_jobs = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        // Update egui textures
        for (id, delta) in &full_output.textures_delta.set {
            self.egui_renderer.update_texture(
                &self.renderer.device,
                &self.renderer.queue,
                *id,
                delta,
            );
        }

        // Create screen descriptor
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.renderer.size().width, self.renderer.size().height],
            pixels_per_point: full_output.pixels_per_point,
        };

        // Update egui buffers
        self.egui_renderer.update_buffers(
            &self.renderer.device,
            &self.renderer.queue,
            &mut encoder,
            &paint_jobs,
            &screen_descriptor,
        );

        // Render egui
        {
            let render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("egui_render_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            self.egui_renderer.render(
                &mut render_pass.forget_lifetime(),
                &paint_jobs,
                &screen_descriptor,
            );
        }

        // Free egui textures
        for id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }

        // Submit and present
        self.renderer
            .queue
            .submit(std::iter::once(encoder.finish()));
        self.renderer.end_frame(output);

        Ok(())
    }

    fn handle_key(&mut self, key: KeyCode, state: ElementState) {
        if key == KeyCode::Escape {
            match state {
                ElementState::Pressed => {
                    if self.esc_held_since.is_none() {
                        self.esc_held_since = Some(Instant::now());
                    }
                }
                ElementState::Released => {
                    self.esc_held_since = None;
                }
            }
            return;
        }
        if state != ElementState::Pressed {
            return;
        }
        match key {
            KeyCode::F2 => self.toggle_passthrough(),
            KeyCode::F3 => {
                let next = self.registry.active_kind().next();
                self.switch_simulation(next);
            }
            KeyCode::Digit1 => self.switch_simulation(SimulationKind::Sand),
            KeyCode::Digit2 => self.switch_simulation(SimulationKind::Snow),
            KeyCode::Digit3 => self.switch_simulation(SimulationKind::Fireworks),
            KeyCode::Digit4 => self.switch_simulation(SimulationKind::Drawing),
            KeyCode::KeyY if self.modifiers.control_key() => self.toggle_topmost(),
            key => match input_key(key, self.modifiers) {
                Some(InputKey::Clear) => self.clear_requested = true,
                Some(InputKey::BrushGrow) => self.pending_brush_delta += 1,
                Some(InputKey::BrushShrink) => self.pending_brush_delta -= 1,
                None => {}
            },
        }
    }

    /// The drawing toy paints its own cursor while the overlay accepts
    /// input; the OS cursor comes back under click-through or other toys.
    fn sync_cursor_visibility(&self) {
        let drawing = self.registry.active_kind() == SimulationKind::Drawing;
        self.window.set_cursor_visible(self.passthrough || !drawing);
    }
}

/// Edge-triggered keys that only feed the next frame's input snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum InputKey {
    Clear,
    BrushGrow,
    BrushShrink,
}

fn input_key(key: KeyCode, mods: ModifiersState) -> Option<InputKey> {
    match key {
        KeyCode::KeyC if mods.control_key() => Some(InputKey::Clear),
        KeyCode::ArrowUp | KeyCode::BracketRight => Some(InputKey::BrushGrow),
        KeyCode::ArrowDown | KeyCode::BracketLeft => Some(InputKey::BrushShrink),
        _ => None,
    }
}

/// Construct a simulation instance for a kind on first activation.
fn build_simulation(
    kind: SimulationKind,
    width: u32,
    height: u32,
    config: &AppConfig,
) -> Box<dyn Simulation> {
    log::info!("creating {} simulation at {}x{}", kind.label(), width, height);
    match kind {
        SimulationKind::Sand => Box::new(SandSimulation::new(width, height, config.sand.clone())),
        SimulationKind::Snow => Box::new(SnowSimulation::new(width, height, config.snow.clone())),
        SimulationKind::Fireworks => Box::new(FireworksSimulation::new(
            width,
            height,
            config.fireworks.clone(),
        )),
        SimulationKind::Drawing => Box::new(DrawingSimulation::new(
            width,
            height,
            config.drawing.clone(),
        )),
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, _event_loop: &ActiveEventLoop) {
        self.window.request_redraw();
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        // Let egui handle events first
        let egui_response = self.egui_state.on_window_event(&self.window, &event);
        if egui_response.consumed {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                self.shutdown(event_loop);
            }
            WindowEvent::Resized(size) => {
                self.resize(size);
            }
            WindowEvent::RedrawRequested => {
                self.update(event_loop);
                if let Err(e) = self.render() {
                    log::error!("Render error: {}", e);
                }
                self.window.request_redraw();
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.pointer = (position.x as f32, position.y as f32);
            }
            WindowEvent::CursorLeft { .. } => {
                self.pointer_down = false;
            }
            WindowEvent::MouseInput { state, button, .. } => {
                if button == MouseButton::Left {
                    let pressed = state == ElementState::Pressed;
                    if pressed && !self.pointer_down {
                        self.pointer_pressed = true;
                    }
                    self.pointer_down = pressed;
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let scroll = match delta {
                    winit::event::MouseScrollDelta::LineDelta(_, y) => y,
                    winit::event::MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 100.0,
                };
                self.pending_wheel += scroll;
            }
            WindowEvent::ModifiersChanged(modifiers) => {
                self.modifiers = modifiers.state();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(code) = event.physical_key {
                    self.handle_key(code, event.state);
                }
            }
            _ => {}
        }
    }
}

impl App {
    fn resize(&mut self, size: PhysicalSize<u32>) {
        if size.width == 0 || size.height == 0 {
            return;
        }
        self.renderer.resize(size);
        self.canvas.resize(size.width, size.height);
        self.registry.resize_all(size.width, size.height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_needs_the_control_chord() {
        assert_eq!(input_key(KeyCode::KeyC, ModifiersState::empty()), None);
        assert_eq!(
            input_key(KeyCode::KeyC, ModifiersState::CONTROL),
            Some(InputKey::Clear)
        );
    }

    #[test]
    fn test_brush_keys_map_both_bindings() {
        for key in [KeyCode::ArrowUp, KeyCode::BracketRight] {
            assert_eq!(input_key(key, ModifiersState::empty()), Some(InputKey::BrushGrow));
        }
        for key in [KeyCode::ArrowDown, KeyCode::BracketLeft] {
            assert_eq!(input_key(key, ModifiersState::empty()), Some(InputKey::BrushShrink));
        }
    }
}

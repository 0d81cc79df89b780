//! HUD overlay shown while a modifier key is held

use egui::{Align2, Color32};

/// Stats for the HUD display
pub struct OverlayStats {
    pub fps: f32,
    pub sim_name: String,
    /// Per-simulation diagnostic lines.
    pub lines: Vec<String>,
    pub passthrough: bool,
    /// Progress of the hold-to-exit gesture, 0 when idle.
    pub exit_progress: f32,
}

/// Show the HUD overlay
pub fn show_hud(ctx: &egui::Context, stats: &OverlayStats) {
    egui::Area::new(egui::Id::new("deskdust_hud"))
        .anchor(Align2::RIGHT_TOP, [-10.0, 10.0])
        .show(ctx, |ui| {
            egui::Frame::new()
                .fill(Color32::from_rgba_unmultiplied(0, 0, 0, 180))
                .inner_margin(8.0)
                .outer_margin(0.0)
                .corner_radius(4.0)
                .show(ui, |ui| {
                    ui.label(format!("FPS: {:.0}", stats.fps));
                    ui.label(format!("Simulation: {}", stats.sim_name));
                    for line in &stats.lines {
                        ui.label(line);
                    }
                    if stats.passthrough {
                        ui.colored_label(Color32::LIGHT_GREEN, "Click-through ON (F2 to toggle)");
                    } else {
                        ui.colored_label(Color32::YELLOW, "Click-through OFF");
                    }
                });
        });

    if stats.exit_progress > 0.0 {
        egui::Area::new(egui::Id::new("deskdust_exit"))
            .anchor(Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                egui::Frame::new()
                    .fill(Color32::from_rgba_unmultiplied(0, 0, 0, 200))
                    .inner_margin(12.0)
                    .corner_radius(6.0)
                    .show(ui, |ui| {
                        ui.label("Hold Esc to quit");
                        ui.add(
                            egui::ProgressBar::new(stats.exit_progress)
                                .desired_width(200.0),
                        );
                    });
            });
    }
}

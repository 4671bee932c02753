use bevy::prelude::*;
use bevy_egui::egui;

use crate::domain::simulation::{ResetEvent, SimStats, SpawnRequest};
use tumble::SimSettings;

/// Returns true when a setting was edited.
pub fn show_debug_panel(
    ctx: &mut egui::Context,
    settings: &mut SimSettings,
    stats: &SimStats,
    ev_spawn: &mut EventWriter<SpawnRequest>,
    ev_reset: &mut EventWriter<ResetEvent>,
) -> bool {
    let mut edited = false;
    egui::Window::new("Debug").show(ctx, |ui| {
        ui.label(format!("Bodies: {}", stats.entities));
        ui.label(format!("Hits: {}", stats.hits));
        ui.label(format!("Substeps last frame: {}", stats.substeps));

        ui.separator();

        ui.horizontal(|ui| {
            if ui.button("Add ball").clicked() {
                ev_spawn.send(SpawnRequest::Sphere);
            }
            if ui.button("Add box").clicked() {
                ev_spawn.send(SpawnRequest::Box);
            }
            if ui.button("reset").clicked() {
                ev_reset.send(ResetEvent);
            }
        });

        ui.separator();

        edited |= ui
            .add(egui::Slider::new(&mut settings.gravity.y, -30.0..=0.0).text("Gravity (y)"))
            .changed();
        edited |= ui
            .add(egui::Slider::new(&mut settings.hit_threshold, 0.0..=10.0).text("Hit threshold"))
            .changed();
        edited |= ui
            .add(egui::Slider::new(&mut settings.restitution, 0.0..=1.0).text("Restitution"))
            .changed();
        edited |= ui
            .add(egui::Slider::new(&mut settings.friction, 0.0..=1.0).text("Friction"))
            .changed();
        edited |= ui.checkbox(&mut settings.allow_sleep, "Allow sleep").changed();
    });
    edited
}

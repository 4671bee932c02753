use bevy_egui::egui;

use crate::domain::presentation::Overlays;

pub fn show_help_panel(ctx: &mut egui::Context, overlays: &Overlays) {
    if overlays.show_help {
        egui::Window::new("Help").show(ctx, |ui| {
            ui.label("B: Add Ball");
            ui.label("N: Add Box");
            ui.label("R: Reset (remove all bodies)");
            ui.label("H: Toggle Help");
            ui.label("F3: Toggle Diagnostics");
            ui.label("Esc: Stop and Quit");
            ui.label("Left Mouse: Orbit Camera (drag)");
            ui.label("Mouse Wheel: Zoom");
        });
    }
}

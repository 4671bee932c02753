use bevy::diagnostic::DiagnosticsStore;
use bevy::prelude::*;
use bevy_egui::{EguiContexts, EguiPlugin};

use crate::domain::simulation::{AppState, ResetEvent, SimStats, SpawnRequest};
use tumble::SimSettings;

pub mod panels;

/// Which optional windows are open.
#[derive(Resource)]
pub struct Overlays {
    pub show_help: bool,
    pub show_diagnostics: bool,
}

impl Default for Overlays {
    fn default() -> Self {
        Self {
            show_help: true,
            show_diagnostics: false,
        }
    }
}

pub struct UiPlugin;
impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(EguiPlugin)
            .init_resource::<Overlays>()
            .add_systems(Update, ui_system.run_if(in_state(AppState::Running)));
    }
}

fn ui_system(
    mut contexts: EguiContexts,
    mut settings: ResMut<SimSettings>,
    stats: Res<SimStats>,
    overlays: Res<Overlays>,
    diagnostics: Res<DiagnosticsStore>,
    mut ev_spawn: EventWriter<SpawnRequest>,
    mut ev_reset: EventWriter<ResetEvent>,
) {
    let ctx = contexts.ctx_mut();
    // Deref-mut marks the resource changed; write back only on edits.
    let mut edited = settings.clone();
    if panels::debug_panel::show_debug_panel(ctx, &mut edited, &stats, &mut ev_spawn, &mut ev_reset) {
        *settings = edited;
    }
    panels::help_panel::show_help_panel(ctx, &overlays);
    panels::diagnostics_panel::show_diagnostics_panel(ctx, &diagnostics, &overlays);
}

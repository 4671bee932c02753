//! Bevy front end over the headless simulation.
//! - `controls`: orbit camera and keyboard shortcuts.
//! - `presentation`: egui debug, help and diagnostics windows.
//! - `simulation`: owns the simulation and mirrors its scene into the ECS.

pub mod controls;
pub mod presentation;
pub mod simulation;

pub use controls::ControlsPlugin;
pub use presentation::UiPlugin;
pub use simulation::{AppState, SimPlugin};

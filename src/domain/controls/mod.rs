use bevy::input::mouse::{MouseMotion, MouseWheel};
use bevy::prelude::*;

use crate::domain::presentation::Overlays;
use crate::domain::simulation::{ResetEvent, Simulation, SpawnRequest};
use crate::MainCamera;

/// Damped orbit around `focus`. Input moves the targets; the camera eases
/// toward them each frame.
#[derive(Component, Debug)]
pub struct OrbitCamera {
    pub focus: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub radius: f32,
    target_yaw: f32,
    target_pitch: f32,
    target_radius: f32,
}

impl OrbitCamera {
    pub fn looking_at(eye: Vec3, focus: Vec3) -> Self {
        let offset = eye - focus;
        let radius = offset.length();
        let yaw = offset.x.atan2(offset.z);
        let pitch = (offset.y / radius).asin();
        Self {
            focus,
            yaw,
            pitch,
            radius,
            target_yaw: yaw,
            target_pitch: pitch,
            target_radius: radius,
        }
    }

    fn eye(&self) -> Vec3 {
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        self.focus + Vec3::new(cos_pitch * sin_yaw, sin_pitch, cos_pitch * cos_yaw) * self.radius
    }
}

pub struct ControlsPlugin;
impl Plugin for ControlsPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (
                camera_controls,
                spawn_keys,
                reset_trigger,
                help_toggle,
                diagnostics_toggle,
                cancel_on_escape,
            ),
        );
    }
}

const ROTATE_SPEED: f32 = 0.005;
const ZOOM_SPEED: f32 = 0.1;
const DAMPING: f32 = 10.0;

fn camera_controls(
    mut scroll_evr: EventReader<MouseWheel>,
    mut motion: EventReader<MouseMotion>,
    buttons: Res<ButtonInput<MouseButton>>,
    mut q_cam: Query<(&mut Transform, &mut OrbitCamera), With<MainCamera>>,
    time: Res<Time>,
) {
    let Ok((mut t, mut orbit)) = q_cam.get_single_mut() else {
        return;
    };

    if buttons.pressed(MouseButton::Left) {
        for m in motion.read() {
            orbit.target_yaw -= m.delta.x * ROTATE_SPEED;
            orbit.target_pitch += m.delta.y * ROTATE_SPEED;
        }
    } else {
        motion.clear();
    }
    orbit.target_pitch = orbit.target_pitch.clamp(-1.5, 1.5);

    for ev in scroll_evr.read() {
        orbit.target_radius = (orbit.target_radius * (1.0 - ev.y * ZOOM_SPEED)).clamp(1.0, 50.0);
    }

    let lerp_factor = (1.0 - (-DAMPING * time.delta_seconds()).exp()).clamp(0.0, 1.0);
    orbit.yaw += (orbit.target_yaw - orbit.yaw) * lerp_factor;
    orbit.pitch += (orbit.target_pitch - orbit.pitch) * lerp_factor;
    orbit.radius += (orbit.target_radius - orbit.radius) * lerp_factor;

    *t = Transform::from_translation(orbit.eye()).looking_at(orbit.focus, Vec3::Y);
}

fn spawn_keys(mut ev_spawn: EventWriter<SpawnRequest>, keys: Res<ButtonInput<KeyCode>>) {
    if keys.just_pressed(KeyCode::KeyB) {
        ev_spawn.send(SpawnRequest::Sphere);
    }
    if keys.just_pressed(KeyCode::KeyN) {
        ev_spawn.send(SpawnRequest::Box);
    }
}

fn reset_trigger(mut ev_reset: EventWriter<ResetEvent>, keys: Res<ButtonInput<KeyCode>>) {
    if keys.just_pressed(KeyCode::KeyR) {
        ev_reset.send(ResetEvent);
    }
}

fn help_toggle(mut overlays: ResMut<Overlays>, keys: Res<ButtonInput<KeyCode>>) {
    if keys.just_pressed(KeyCode::KeyH) {
        overlays.show_help = !overlays.show_help;
    }
}

fn diagnostics_toggle(mut overlays: ResMut<Overlays>, keys: Res<ButtonInput<KeyCode>>) {
    if keys.just_pressed(KeyCode::F3) {
        overlays.show_diagnostics = !overlays.show_diagnostics;
    }
}

fn cancel_on_escape(simulation: Option<Res<Simulation>>, keys: Res<ButtonInput<KeyCode>>) {
    if keys.just_pressed(KeyCode::Escape) {
        if let Some(simulation) = simulation {
            simulation.cycle.cancel_token().cancel();
        }
    }
}

mod domain;

use bevy::diagnostic::{EntityCountDiagnosticsPlugin, FrameTimeDiagnosticsPlugin};
use bevy::prelude::*;
use domain::controls::OrbitCamera;
use domain::{AppState, ControlsPlugin, SimPlugin, UiPlugin};

fn main() {
    App::new()
        .insert_resource(ClearColor(Color::srgb(0.12, 0.12, 0.14)))
        .insert_resource(Msaa::Sample4)
        .insert_resource(AmbientLight {
            color: Color::WHITE,
            brightness: 300.0,
        })
        .add_plugins(FrameTimeDiagnosticsPlugin)
        .add_plugins(EntityCountDiagnosticsPlugin)
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "tumble-rs: rigid body playground".into(),
                resolution: (1280., 800.).into(),
                ..default()
            }),
            ..default()
        }))
        .init_state::<AppState>()
        .add_plugins((SimPlugin, UiPlugin, ControlsPlugin))
        .add_systems(Startup, (setup_camera, setup_lights))
        .run();
}

fn setup_camera(mut commands: Commands) {
    let eye = Vec3::new(-3.0, 3.0, 3.0);
    commands.spawn((
        Camera3dBundle {
            projection: PerspectiveProjection {
                fov: 75f32.to_radians(),
                near: 0.1,
                far: 100.0,
                ..default()
            }
            .into(),
            transform: Transform::from_translation(eye).looking_at(Vec3::ZERO, Vec3::Y),
            ..default()
        },
        OrbitCamera::looking_at(eye, Vec3::ZERO),
        MainCamera,
    ));
}

fn setup_lights(mut commands: Commands) {
    commands.spawn(DirectionalLightBundle {
        directional_light: DirectionalLight {
            illuminance: 4_000.0,
            shadows_enabled: true,
            ..default()
        },
        transform: Transform::from_xyz(5.0, 5.0, 5.0).looking_at(Vec3::ZERO, Vec3::Y),
        ..default()
    });
}

#[derive(Component)]
pub struct MainCamera;

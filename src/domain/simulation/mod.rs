use std::collections::HashMap;
use std::sync::Arc;

use bevy::pbr::{NotShadowCaster, NotShadowReceiver};
use bevy::prelude::*;

use tumble::{
    AudioSink, DebugSurface, Geometry, Headless, ManualTime, NodeId, SimSettings,
    SimulationContext, SimulationLoop, SurfaceMaterial,
};

#[derive(States, Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum AppState {
    #[default]
    Running,
    Stopped,
}

/// The headless simulation and the loop that ticks it, one cycle per frame.
/// `clock` is the context's time source, fed from bevy's `Time`.
#[derive(Resource)]
pub struct Simulation {
    pub context: SimulationContext,
    pub cycle: SimulationLoop,
    clock: ManualTime,
}

#[derive(Resource, Default, Debug)]
pub struct SimStats {
    pub entities: usize,
    pub substeps: u32,
    pub hits: usize,
}

#[derive(Event, Default)]
pub struct ResetEvent;

#[derive(Event, Clone, Copy, Debug)]
pub enum SpawnRequest {
    Sphere,
    Box,
}

/// Hit intensities waiting to be played this frame.
#[derive(Resource, Default)]
pub struct HitSounds {
    pending: Vec<f32>,
}

impl AudioSink for HitSounds {
    fn play(&mut self, intensity: f32) {
        self.pending.push(intensity);
    }
}

#[cfg(feature = "audio")]
#[derive(Resource)]
struct HitClip(Handle<AudioSource>);

/// Render entity mirroring one scene node.
#[derive(Component)]
pub struct SceneNode(pub NodeId);

/// Bevy-side handles for the scene graph. Meshes and materials are keyed by
/// the address of the shared template they were built from.
#[derive(Resource, Default)]
struct RenderCache {
    entities: HashMap<NodeId, Entity>,
    meshes: HashMap<usize, Handle<Mesh>>,
    materials: HashMap<usize, Handle<StandardMaterial>>,
}

pub struct SimPlugin;
impl Plugin for SimPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SimSettings>()
            .init_resource::<SimStats>()
            .init_resource::<HitSounds>()
            .init_resource::<RenderCache>()
            .add_event::<ResetEvent>()
            .add_event::<SpawnRequest>()
            .add_systems(Startup, setup_simulation)
            .add_systems(
                Update,
                (
                    handle_requests,
                    sync_settings,
                    run_cycle,
                    mirror_scene,
                    play_hits,
                )
                    .chain()
                    .run_if(in_state(AppState::Running)),
            )
            .add_systems(OnEnter(AppState::Stopped), exit_app);
    }
}

fn setup_simulation(
    mut commands: Commands,
    settings: Res<SimSettings>,
    #[cfg(feature = "audio")] assets: Res<AssetServer>,
) {
    let clock = ManualTime::new();
    let mut context = SimulationContext::with_time_source(settings.clone(), Box::new(clock.clone()));
    if let Some((radius, position)) = settings.initial_sphere {
        // A bad initial sphere is logged by the context; the app runs without it.
        let _ = context.spawn_sphere(radius, position);
    }
    let cycle = SimulationLoop::for_context(&context);
    commands.insert_resource(Simulation {
        context,
        cycle,
        clock,
    });

    #[cfg(feature = "audio")]
    commands.insert_resource(HitClip(assets.load("sounds/hit.mp3")));
}

fn handle_requests(
    mut simulation: ResMut<Simulation>,
    mut ev_spawn: EventReader<SpawnRequest>,
    mut ev_reset: EventReader<ResetEvent>,
) {
    let context = &mut simulation.context;
    for request in ev_spawn.read() {
        match request {
            SpawnRequest::Sphere => {
                DebugSurface::on_add_sphere_requested(context);
            }
            SpawnRequest::Box => {
                DebugSurface::on_add_box_requested(context);
            }
        }
    }
    for _ in ev_reset.read() {
        DebugSurface::on_reset_requested(context);
    }
}

fn sync_settings(settings: Res<SimSettings>, mut simulation: ResMut<Simulation>) {
    if !settings.is_changed() {
        return;
    }
    let simulation = &mut *simulation;
    simulation.context.apply_settings(&settings);
    simulation.cycle.fixed_timestep = settings.fixed_timestep;
    simulation.cycle.max_substeps = settings.max_substeps;
}

fn run_cycle(
    time: Res<Time>,
    mut simulation: ResMut<Simulation>,
    mut hits: ResMut<HitSounds>,
    mut stats: ResMut<SimStats>,
    mut next_state: ResMut<NextState<AppState>>,
) {
    let Simulation {
        context,
        cycle,
        clock,
    } = &mut *simulation;
    clock.set(time.elapsed_seconds_f64());
    // Camera and drawing run as their own bevy systems.
    match cycle.tick(context, &mut Headless, &mut *hits) {
        Some(report) => {
            stats.entities = context.registry().len();
            stats.substeps = report.substeps;
            stats.hits += report.hits;
        }
        None => next_state.set(AppState::Stopped),
    }
}

fn mirror_scene(
    mut commands: Commands,
    simulation: Res<Simulation>,
    mut cache: ResMut<RenderCache>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut transforms: Query<&mut Transform, With<SceneNode>>,
) {
    let scene = simulation.context.scene();
    let cache = &mut *cache;

    cache.entities.retain(|node, entity| {
        let alive = scene.contains(*node);
        if !alive {
            commands.entity(*entity).despawn();
        }
        alive
    });

    for (node, proxy) in scene.iter() {
        if let Some(&entity) = cache.entities.get(&node) {
            if let Ok(mut transform) = transforms.get_mut(entity) {
                transform.set_if_neq(*proxy.transform());
            }
            continue;
        }

        let mesh = cache
            .meshes
            .entry(Arc::as_ptr(proxy.geometry()) as usize)
            .or_insert_with(|| meshes.add(build_mesh(proxy.geometry())))
            .clone();
        let material = cache
            .materials
            .entry(Arc::as_ptr(proxy.material()) as usize)
            .or_insert_with(|| materials.add(build_material(proxy.material())))
            .clone();

        let mut entity = commands.spawn((
            PbrBundle {
                mesh,
                material,
                transform: *proxy.transform(),
                ..default()
            },
            SceneNode(node),
        ));
        if !proxy.cast_shadow {
            entity.insert(NotShadowCaster);
        }
        if !proxy.receive_shadow {
            entity.insert(NotShadowReceiver);
        }
        cache.entities.insert(node, entity.id());
    }
}

fn build_mesh(geometry: &Geometry) -> Mesh {
    match *geometry {
        Geometry::Sphere {
            radius,
            width_segments,
            height_segments,
        } => Sphere::new(radius)
            .mesh()
            .uv(width_segments as usize, height_segments as usize),
        Geometry::Box {
            width,
            height,
            depth,
        } => Cuboid::new(width, height, depth).into(),
        Geometry::Plane { width, height } => {
            Plane3d::new(Vec3::Z, Vec2::new(width, height) * 0.5).into()
        }
    }
}

fn build_material(surface: &SurfaceMaterial) -> StandardMaterial {
    StandardMaterial {
        base_color: surface.base_color,
        metallic: surface.metalness,
        perceptual_roughness: surface.roughness,
        ..default()
    }
}

#[cfg(feature = "audio")]
fn play_hits(mut commands: Commands, mut hits: ResMut<HitSounds>, clip: Res<HitClip>) {
    use bevy::audio::Volume;

    for intensity in hits.pending.drain(..) {
        commands.spawn(AudioBundle {
            source: clip.0.clone(),
            settings: PlaybackSettings::DESPAWN.with_volume(Volume::new(intensity)),
        });
    }
}

#[cfg(not(feature = "audio"))]
fn play_hits(mut hits: ResMut<HitSounds>) {
    // built without an audio backend
    hits.pending.clear();
}

fn exit_app(mut exit: EventWriter<AppExit>) {
    info!("simulation stopped, exiting");
    exit.send(AppExit::Success);
}

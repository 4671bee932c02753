//! One self-contained simulation: world, scene, registry and clock.

use std::f32::consts::FRAC_PI_2;

use bevy::log::{debug, info, warn};
use bevy::math::{Quat, Vec3};
use bevy::prelude::Transform;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::audio::AudioSink;
use crate::clock::{SimulationClock, TimeSource, WallClock};
use crate::error::SpawnError;
use crate::gate::CollisionGate;
use crate::physics::{Body, BodyHandle, PhysicsWorld, Shape};
use crate::registry::{EntityPairId, EntityRegistry};
use crate::scene::{NodeId, SceneGraph, VisualProxy};
use crate::settings::SimSettings;
use crate::spawn::{ShapeSpec, SharedAssets, SpawnFactory};

/// A mutation requested while the registry may be in use. Applied at the
/// next cycle boundary by `apply_pending`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    Spawn { shape: ShapeSpec, position: Vec3 },
    Remove(EntityPairId),
    Clear,
}

pub struct SimulationContext {
    pub(crate) world: PhysicsWorld,
    pub(crate) registry: EntityRegistry,
    pub(crate) scene: SceneGraph,
    pub(crate) clock: SimulationClock,
    pub(crate) gate: CollisionGate,
    pub(crate) rng: StdRng,
    factory: SpawnFactory,
    settings: SimSettings,
    pending: Vec<Command>,
    floor_body: BodyHandle,
    floor_node: NodeId,
}

impl SimulationContext {
    pub fn new(settings: SimSettings) -> Self {
        Self::with_time_source(settings, Box::new(WallClock::new()))
    }

    /// Builds the world with its static floor and an empty registry.
    pub fn with_time_source(settings: SimSettings, time: Box<dyn TimeSource>) -> Self {
        let mut world = PhysicsWorld::new(settings.physics_config());
        let mut scene = SceneGraph::new();
        let material = world.create_material();
        let assets = SharedAssets::new(settings.floor_size);

        // Plane normal is local +Z; tip it over so the floor faces +Y.
        let floor_rotation = Quat::from_rotation_x(-FRAC_PI_2);
        let floor_body = world.add_body(
            Body::new(Shape::Plane, 0.0)
                .with_orientation(floor_rotation)
                .with_material(material),
        );
        let mut floor = VisualProxy::new(
            assets.floor.clone(),
            assets.floor_surface.clone(),
            Transform::from_rotation(floor_rotation),
        );
        floor.receive_shadow = true;
        let floor_node = scene.add(floor);

        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        info!(
            "simulation created: {:?} broadphase, gravity {}",
            settings.broadphase, settings.gravity
        );

        Self {
            world,
            registry: EntityRegistry::new(),
            scene,
            clock: SimulationClock::new(time),
            gate: CollisionGate::new(settings.hit_threshold),
            rng,
            factory: SpawnFactory::new(assets, material, settings.spawn_limit),
            settings,
            pending: Vec::new(),
            floor_body,
            floor_node,
        }
    }

    pub fn world(&self) -> &PhysicsWorld {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut PhysicsWorld {
        &mut self.world
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn gate(&self) -> &CollisionGate {
        &self.gate
    }

    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    pub fn settings(&self) -> &SimSettings {
        &self.settings
    }

    pub fn assets(&self) -> &SharedAssets {
        self.factory.assets()
    }

    pub fn floor_body(&self) -> BodyHandle {
        self.floor_body
    }

    pub fn floor_node(&self) -> NodeId {
        self.floor_node
    }

    pub fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Pushes live-editable settings into the world, gate and factory.
    /// Timestep and substep changes take effect on the next cycle.
    pub fn apply_settings(&mut self, settings: &SimSettings) {
        *self.world.config_mut() = settings.physics_config();
        self.gate.threshold = settings.hit_threshold;
        self.factory.set_limit(settings.spawn_limit);
        self.settings = settings.clone();
    }

    pub fn spawn(&mut self, shape: ShapeSpec, position: Vec3) -> Result<EntityPairId, SpawnError> {
        self.factory
            .spawn(
                shape,
                position,
                &mut self.world,
                &mut self.scene,
                &mut self.registry,
            )
            .inspect_err(|err| warn!("spawn rejected: {err}"))
    }

    pub fn spawn_sphere(&mut self, radius: f32, position: Vec3) -> Result<EntityPairId, SpawnError> {
        self.spawn(ShapeSpec::Sphere { radius }, position)
    }

    pub fn spawn_box(
        &mut self,
        width: f32,
        height: f32,
        depth: f32,
        position: Vec3,
    ) -> Result<EntityPairId, SpawnError> {
        self.spawn(
            ShapeSpec::Box {
                width,
                height,
                depth,
            },
            position,
        )
    }

    pub fn remove(&mut self, id: EntityPairId) -> bool {
        self.registry.remove(id, &mut self.world, &mut self.scene)
    }

    /// Removes every spawned entity. The floor stays.
    pub fn clear(&mut self) -> usize {
        let removed = self.registry.clear(&mut self.world, &mut self.scene);
        if removed > 0 {
            info!("cleared {removed} entities");
        }
        removed
    }

    pub fn queue(&mut self, command: Command) {
        self.pending.push(command);
    }

    pub fn pending(&self) -> &[Command] {
        &self.pending
    }

    /// Runs queued commands in order. Failed spawns are logged and dropped.
    pub fn apply_pending(&mut self) -> usize {
        let commands = std::mem::take(&mut self.pending);
        let count = commands.len();
        for command in commands {
            match command {
                Command::Spawn { shape, position } => {
                    let _ = self.spawn(shape, position);
                }
                Command::Remove(id) => {
                    if !self.remove(id) {
                        debug!("remove of unknown entity {id:?} ignored");
                    }
                }
                Command::Clear => {
                    self.clear();
                }
            }
        }
        count
    }

    /// Drains the world's collision events through the gate into `audio`.
    /// Returns how many hits were played.
    pub fn dispatch_hits(&mut self, audio: &mut dyn AudioSink) -> usize {
        let mut hits = 0;
        for event in self.world.drain_events() {
            if let Some(intensity) = self.gate.evaluate(event.impact_speed, &mut self.rng) {
                debug!(
                    "hit {:?} -> {:?} at {:.2} m/s, intensity {intensity:.2}",
                    event.body, event.other, event.impact_speed
                );
                audio.play(intensity);
                hits += 1;
            }
        }
        hits
    }
}

impl Default for SimulationContext {
    fn default() -> Self {
        Self::new(SimSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualTime;

    fn context() -> SimulationContext {
        SimulationContext::with_time_source(
            SimSettings {
                seed: Some(1),
                ..SimSettings::default()
            },
            Box::new(ManualTime::new()),
        )
    }

    #[test]
    fn starts_with_floor_only() {
        let ctx = context();
        assert_eq!(ctx.world().len(), 1);
        assert_eq!(ctx.scene().len(), 1);
        assert!(ctx.registry().is_empty());

        let floor = ctx.world().body(ctx.floor_body()).unwrap();
        assert!(!floor.is_dynamic());
        assert!((floor.orientation * Vec3::Z - Vec3::Y).length() < 1e-6);
        assert!(ctx.scene().get(ctx.floor_node()).unwrap().receive_shadow);
    }

    #[test]
    fn clear_keeps_the_floor() {
        let mut ctx = context();
        ctx.spawn_sphere(0.5, Vec3::Y).unwrap();
        ctx.spawn_box(1.0, 1.0, 1.0, Vec3::Y * 2.0).unwrap();
        assert_eq!(ctx.clear(), 2);
        assert!(ctx.world().contains(ctx.floor_body()));
        assert!(ctx.scene().contains(ctx.floor_node()));
        assert_eq!(ctx.clear(), 0);
    }

    #[test]
    fn queued_commands_wait_for_apply() {
        let mut ctx = context();
        ctx.queue(Command::Spawn {
            shape: ShapeSpec::Sphere { radius: 0.3 },
            position: Vec3::Y,
        });
        ctx.queue(Command::Spawn {
            shape: ShapeSpec::Sphere { radius: -1.0 },
            position: Vec3::Y,
        });
        assert!(ctx.registry().is_empty());
        assert_eq!(ctx.apply_pending(), 2);
        assert_eq!(ctx.registry().len(), 1);
        assert!(ctx.pending().is_empty());

        ctx.queue(Command::Clear);
        ctx.apply_pending();
        assert!(ctx.registry().is_empty());
    }

    #[test]
    fn queued_remove_detaches_once() {
        let mut ctx = context();
        let keep = ctx.spawn_sphere(0.5, Vec3::Y).unwrap();
        let gone = ctx.spawn_box(1.0, 1.0, 1.0, Vec3::Y * 2.0).unwrap();
        let before = (ctx.world().len(), ctx.scene().len(), ctx.registry().len());

        ctx.queue(Command::Remove(gone));
        assert_eq!(ctx.registry().len(), before.2);
        assert_eq!(ctx.apply_pending(), 1);
        assert_eq!(
            (ctx.world().len(), ctx.scene().len(), ctx.registry().len()),
            (before.0 - 1, before.1 - 1, before.2 - 1)
        );
        assert!(ctx.registry().get(gone).is_none());
        assert!(ctx.registry().get(keep).is_some());

        // Unknown id by now: applied without effect.
        ctx.queue(Command::Remove(gone));
        assert_eq!(ctx.apply_pending(), 1);
        assert_eq!(
            (ctx.world().len(), ctx.scene().len(), ctx.registry().len()),
            (before.0 - 1, before.1 - 1, before.2 - 1)
        );
        assert!(ctx.pending().is_empty());
    }

    #[test]
    fn settings_reach_world_and_gate() {
        let mut ctx = context();
        let settings = SimSettings {
            gravity: Vec3::ZERO,
            hit_threshold: 4.0,
            spawn_limit: Some(1),
            ..SimSettings::default()
        };
        ctx.apply_settings(&settings);
        assert_eq!(ctx.world().config().gravity, Vec3::ZERO);
        assert_eq!(ctx.gate().threshold, 4.0);
        ctx.spawn_sphere(0.5, Vec3::Y).unwrap();
        assert_eq!(
            ctx.spawn_sphere(0.5, Vec3::Y),
            Err(SpawnError::CapacityReached { limit: 1 })
        );
    }
}

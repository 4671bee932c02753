//! Simulation tunables.

use bevy::math::Vec3;
use bevy::prelude::Resource;

use crate::gate::DEFAULT_HIT_THRESHOLD;
use crate::physics::{Broadphase, ContactMaterial, PhysicsConfig};

/// Tunables for one simulation. Edited live from the debug panel.
#[derive(Resource, Clone, Debug)]
pub struct SimSettings {
    pub gravity: Vec3,
    pub fixed_timestep: f32,
    pub max_substeps: u32,
    pub solver_iterations: u32,
    pub broadphase: Broadphase,
    pub allow_sleep: bool,
    pub sleep_speed_limit: f32,
    pub sleep_time_limit: f32,
    pub friction: f32,
    pub restitution: f32,
    pub hit_threshold: f32,
    /// Entity cap; spawns beyond it are rejected. `None` lifts the cap.
    pub spawn_limit: Option<usize>,
    pub spawn_height: f32,
    pub spawn_spread: f32,
    /// Fixed rng seed for reproducible runs.
    pub seed: Option<u64>,
    pub floor_size: f32,
    /// Radius and position of the sphere the app starts with.
    pub initial_sphere: Option<(f32, Vec3)>,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.82, 0.0),
            fixed_timestep: 1.0 / 60.0,
            max_substeps: 3,
            solver_iterations: 10,
            broadphase: Broadphase::SweepAndPrune,
            allow_sleep: true,
            sleep_speed_limit: 0.1,
            sleep_time_limit: 1.0,
            friction: 0.1,
            restitution: 0.7,
            hit_threshold: DEFAULT_HIT_THRESHOLD,
            spawn_limit: Some(10_000),
            spawn_height: 4.0,
            spawn_spread: 3.0,
            seed: None,
            floor_size: 10.0,
            initial_sphere: Some((0.5, Vec3::new(0.0, 3.0, 0.0))),
        }
    }
}

impl SimSettings {
    pub fn physics_config(&self) -> PhysicsConfig {
        PhysicsConfig {
            gravity: self.gravity,
            broadphase: self.broadphase,
            default_contact: ContactMaterial {
                friction: self.friction,
                restitution: self.restitution,
            },
            solver_iterations: self.solver_iterations,
            allow_sleep: self.allow_sleep,
            sleep_speed_limit: self.sleep_speed_limit,
            sleep_time_limit: self.sleep_time_limit,
        }
    }
}

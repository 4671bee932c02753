//! Builds sphere and box entities.

use std::sync::Arc;

use bevy::color::Color;
use bevy::log::debug;
use bevy::math::Vec3;
use bevy::prelude::Transform;

use crate::error::SpawnError;
use crate::physics::{Body, MaterialId, PhysicsWorld, Shape};
use crate::registry::{EntityPairId, EntityRegistry};
use crate::scene::{Geometry, SceneGraph, SurfaceMaterial, VisualProxy};

/// Mass given to every spawned body, whatever its size.
pub const SPAWN_MASS: f32 = 1.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ShapeSpec {
    Sphere { radius: f32 },
    Box { width: f32, height: f32, depth: f32 },
}

impl ShapeSpec {
    pub fn validate(&self) -> Result<(), SpawnError> {
        let dims: &[(&'static str, f32)] = match self {
            ShapeSpec::Sphere { radius } => &[("radius", *radius)],
            ShapeSpec::Box {
                width,
                height,
                depth,
            } => &[("width", *width), ("height", *height), ("depth", *depth)],
        };
        for &(name, value) in dims {
            if !(value.is_finite() && value > 0.0) {
                return Err(SpawnError::InvalidDimension { name, value });
            }
        }
        Ok(())
    }

    fn physics_shape(&self) -> Shape {
        match *self {
            ShapeSpec::Sphere { radius } => Shape::Sphere { radius },
            ShapeSpec::Box {
                width,
                height,
                depth,
            } => Shape::Box {
                half_extents: Vec3::new(width, height, depth) * 0.5,
            },
        }
    }

    /// Scale applied to the shared unit geometry.
    fn scale(&self) -> Vec3 {
        match *self {
            ShapeSpec::Sphere { radius } => Vec3::splat(radius),
            ShapeSpec::Box {
                width,
                height,
                depth,
            } => Vec3::new(width, height, depth),
        }
    }
}

/// Geometry and materials built once and shared by every spawned proxy.
#[derive(Clone)]
pub struct SharedAssets {
    pub unit_sphere: Arc<Geometry>,
    pub unit_box: Arc<Geometry>,
    pub surface: Arc<SurfaceMaterial>,
    pub floor: Arc<Geometry>,
    pub floor_surface: Arc<SurfaceMaterial>,
}

impl SharedAssets {
    pub fn new(floor_size: f32) -> Self {
        Self {
            unit_sphere: Arc::new(Geometry::Sphere {
                radius: 1.0,
                width_segments: 32,
                height_segments: 32,
            }),
            unit_box: Arc::new(Geometry::Box {
                width: 1.0,
                height: 1.0,
                depth: 1.0,
            }),
            surface: Arc::new(SurfaceMaterial::default()),
            floor: Arc::new(Geometry::Plane {
                width: floor_size,
                height: floor_size,
            }),
            floor_surface: Arc::new(SurfaceMaterial {
                base_color: Color::srgb_u8(0x77, 0x77, 0x77),
                ..SurfaceMaterial::default()
            }),
        }
    }
}

pub struct SpawnFactory {
    assets: SharedAssets,
    material: MaterialId,
    limit: Option<usize>,
}

impl SpawnFactory {
    /// `material` is the physics material every spawned body carries.
    pub fn new(assets: SharedAssets, material: MaterialId, limit: Option<usize>) -> Self {
        Self {
            assets,
            material,
            limit,
        }
    }

    pub fn assets(&self) -> &SharedAssets {
        &self.assets
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    pub fn set_limit(&mut self, limit: Option<usize>) {
        self.limit = limit;
    }

    /// Validates, then registers the body (with a collision listener), the
    /// visual node and the registry entry. On error nothing is registered.
    pub fn spawn(
        &self,
        shape: ShapeSpec,
        position: Vec3,
        world: &mut PhysicsWorld,
        scene: &mut SceneGraph,
        registry: &mut EntityRegistry,
    ) -> Result<EntityPairId, SpawnError> {
        shape.validate()?;
        if !position.is_finite() {
            return Err(SpawnError::NonFinitePosition);
        }
        if let Some(limit) = self.limit {
            if registry.len() >= limit {
                return Err(SpawnError::CapacityReached { limit });
            }
        }

        let geometry = match shape {
            ShapeSpec::Sphere { .. } => &self.assets.unit_sphere,
            ShapeSpec::Box { .. } => &self.assets.unit_box,
        };
        let mut proxy = VisualProxy::new(
            geometry.clone(),
            self.assets.surface.clone(),
            Transform::from_translation(position).with_scale(shape.scale()),
        );
        proxy.cast_shadow = true;

        let body = Body::new(shape.physics_shape(), SPAWN_MASS)
            .with_position(position)
            .with_material(self.material);
        let handle = world.add_body(body);
        world.set_collision_listener(handle, true);
        let node = scene.add(proxy);
        let id = registry.insert(handle, node);

        debug!("spawned {id:?} {shape:?} at {position}");
        Ok(id)
    }

    pub fn spawn_sphere(
        &self,
        radius: f32,
        position: Vec3,
        world: &mut PhysicsWorld,
        scene: &mut SceneGraph,
        registry: &mut EntityRegistry,
    ) -> Result<EntityPairId, SpawnError> {
        self.spawn(ShapeSpec::Sphere { radius }, position, world, scene, registry)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn spawn_box(
        &self,
        width: f32,
        height: f32,
        depth: f32,
        position: Vec3,
        world: &mut PhysicsWorld,
        scene: &mut SceneGraph,
        registry: &mut EntityRegistry,
    ) -> Result<EntityPairId, SpawnError> {
        self.spawn(
            ShapeSpec::Box {
                width,
                height,
                depth,
            },
            position,
            world,
            scene,
            registry,
        )
    }
}

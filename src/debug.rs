//! Entry points for the debug panel. Requests are queued, not applied.

use bevy::math::Vec3;
use rand::Rng;

use crate::context::{Command, SimulationContext};
use crate::spawn::ShapeSpec;

/// Queues debug spawns with random sizes above the floor.
pub struct DebugSurface;

impl DebugSurface {
    fn drop_point(ctx: &mut SimulationContext) -> Vec3 {
        let height = ctx.settings().spawn_height;
        let spread = ctx.settings().spawn_spread;
        let rng = ctx.rng_mut();
        Vec3::new(
            (rng.gen::<f32>() - 0.5) * spread,
            height,
            (rng.gen::<f32>() - 0.5) * spread,
        )
    }

    /// Sphere with radius in `[0, 0.5)`.
    pub fn on_add_sphere_requested(ctx: &mut SimulationContext) -> ShapeSpec {
        let shape = ShapeSpec::Sphere {
            radius: ctx.rng_mut().gen::<f32>() * 0.5,
        };
        let position = Self::drop_point(ctx);
        ctx.queue(Command::Spawn { shape, position });
        shape
    }

    /// Box with each side in `[0, 1)`.
    pub fn on_add_box_requested(ctx: &mut SimulationContext) -> ShapeSpec {
        let rng = ctx.rng_mut();
        let shape = ShapeSpec::Box {
            width: rng.gen(),
            height: rng.gen(),
            depth: rng.gen(),
        };
        let position = Self::drop_point(ctx);
        ctx.queue(Command::Spawn { shape, position });
        shape
    }

    pub fn on_reset_requested(ctx: &mut SimulationContext) {
        ctx.queue(Command::Clear);
    }
}

//! Rigid bodies.
//!
//! A `Body` is the authoritative pose of one simulated object. Visual
//! proxies only ever read from it.

use bevy::math::{Mat3, Quat, Vec3};

/// Stable identifier of a body inside one `PhysicsWorld`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyHandle(pub(crate) u32);

/// Identifier of a surface material, used to look up contact materials.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(pub(crate) u32);

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Shape {
    Sphere { radius: f32 },
    Box { half_extents: Vec3 },
    /// Infinite plane through the body origin with local normal +Z.
    Plane,
}

impl Shape {
    /// Diagonal inertia tensor in body space.
    pub fn inertia(&self, mass: f32) -> Vec3 {
        if mass <= 0.0 {
            return Vec3::ZERO;
        }
        match *self {
            Shape::Sphere { radius } => Vec3::splat(0.4 * mass * radius * radius),
            Shape::Box { half_extents } => {
                let e = half_extents * 2.0;
                let factor = mass / 12.0;
                Vec3::new(
                    factor * (e.y * e.y + e.z * e.z),
                    factor * (e.x * e.x + e.z * e.z),
                    factor * (e.x * e.x + e.y * e.y),
                )
            }
            Shape::Plane => Vec3::ZERO,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SleepState {
    #[default]
    Awake,
    Sleepy,
    Sleeping,
}

#[derive(Clone, Debug)]
pub struct Body {
    pub shape: Shape,
    pub mass: f32,
    pub position: Vec3,
    pub orientation: Quat,
    pub velocity: Vec3,
    pub angular_velocity: Vec3,
    pub material: Option<MaterialId>,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub(crate) inv_mass: f32,
    pub(crate) inv_inertia: Vec3,
    pub(crate) sleep_state: SleepState,
    pub(crate) sleepy_since: f32,
    pub(crate) wake_after_narrowphase: bool,
    pub(crate) collision_listener: bool,
}

impl Body {
    /// Mass 0 makes the body static.
    pub fn new(shape: Shape, mass: f32) -> Self {
        let mass = mass.max(0.0);
        let inv_mass = if mass > 0.0 { 1.0 / mass } else { 0.0 };
        let inertia = shape.inertia(mass);
        let inv_inertia = Vec3::new(
            if inertia.x > 0.0 { 1.0 / inertia.x } else { 0.0 },
            if inertia.y > 0.0 { 1.0 / inertia.y } else { 0.0 },
            if inertia.z > 0.0 { 1.0 / inertia.z } else { 0.0 },
        );
        let damping = if mass > 0.0 { 0.01 } else { 0.0 };

        Self {
            shape,
            mass,
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            material: None,
            linear_damping: damping,
            angular_damping: damping,
            inv_mass,
            inv_inertia,
            sleep_state: SleepState::Awake,
            sleepy_since: 0.0,
            wake_after_narrowphase: false,
            collision_listener: false,
        }
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn with_orientation(mut self, orientation: Quat) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_material(mut self, material: MaterialId) -> Self {
        self.material = Some(material);
        self
    }

    pub fn is_dynamic(&self) -> bool {
        self.inv_mass > 0.0
    }

    pub fn sleep_state(&self) -> SleepState {
        self.sleep_state
    }

    pub fn is_sleeping(&self) -> bool {
        self.sleep_state == SleepState::Sleeping
    }

    pub fn wake_up(&mut self) {
        self.sleep_state = SleepState::Awake;
        self.wake_after_narrowphase = false;
    }

    pub fn has_collision_listener(&self) -> bool {
        self.collision_listener
    }

    /// Velocity of the material point at `offset` from the center of mass.
    pub fn velocity_at(&self, offset: Vec3) -> Vec3 {
        self.velocity + self.angular_velocity.cross(offset)
    }

    /// Inverse inertia tensor in world space.
    pub fn world_inv_inertia(&self) -> Mat3 {
        let rot = Mat3::from_quat(self.orientation);
        rot * Mat3::from_diagonal(self.inv_inertia) * rot.transpose()
    }

    /// Apply an impulse at `offset` from the center of mass.
    pub fn apply_impulse(&mut self, impulse: Vec3, offset: Vec3) {
        if !self.is_dynamic() {
            return;
        }
        self.velocity += impulse * self.inv_mass;
        self.angular_velocity += self.world_inv_inertia() * offset.cross(impulse);
    }

    /// Inverse mass seen by the contact solver. Sleeping bodies are
    /// immovable until woken.
    pub(crate) fn solver_inv_mass(&self) -> f32 {
        if self.is_sleeping() {
            0.0
        } else {
            self.inv_mass
        }
    }

    pub(crate) fn solver_inv_inertia(&self) -> Mat3 {
        if self.is_sleeping() {
            Mat3::ZERO
        } else {
            self.world_inv_inertia()
        }
    }

    pub(crate) fn speed_squared(&self) -> f32 {
        self.velocity.length_squared() + self.angular_velocity.length_squared()
    }

    /// Plane normal and offset in world space. Only meaningful for planes.
    pub(crate) fn plane(&self) -> (Vec3, f32) {
        let normal = self.orientation * Vec3::Z;
        (normal, normal.dot(self.position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_mass_is_static() {
        let body = Body::new(Shape::Plane, 0.0);
        assert!(!body.is_dynamic());
        assert_eq!(body.inv_mass, 0.0);
        assert_eq!(body.inv_inertia, Vec3::ZERO);
    }

    #[test]
    fn impulse_on_static_body_is_ignored() {
        let mut body = Body::new(Shape::Sphere { radius: 1.0 }, 0.0);
        body.apply_impulse(Vec3::X * 10.0, Vec3::Y);
        assert_eq!(body.velocity, Vec3::ZERO);
        assert_eq!(body.angular_velocity, Vec3::ZERO);
    }

    #[test]
    fn off_center_impulse_spins_the_body() {
        let mut body = Body::new(Shape::Sphere { radius: 1.0 }, 1.0);
        body.apply_impulse(Vec3::X, Vec3::Y);
        assert_eq!(body.velocity, Vec3::X);
        // r x J = Y x X = -Z
        assert!(body.angular_velocity.z < 0.0);
    }

    #[test]
    fn box_inertia_matches_solid_cuboid() {
        let inertia = Shape::Box {
            half_extents: Vec3::new(0.5, 1.0, 1.5),
        }
        .inertia(12.0);
        assert_eq!(inertia, Vec3::new(4.0 + 9.0, 1.0 + 9.0, 1.0 + 4.0));
    }

    #[test]
    fn rotated_plane_faces_up() {
        let floor = Body::new(Shape::Plane, 0.0).with_orientation(Quat::from_axis_angle(
            Vec3::NEG_X,
            std::f32::consts::FRAC_PI_2,
        ));
        let (normal, offset) = floor.plane();
        assert!((normal - Vec3::Y).length() < 1e-6);
        assert_eq!(offset, 0.0);
    }
}

//! Rigid body physics: bodies, broad-phase, narrow-phase and the stepping
//! world.

pub mod body;
pub mod broadphase;
pub mod contact;
pub mod world;

pub use body::{Body, BodyHandle, MaterialId, Shape, SleepState};
pub use broadphase::{Aabb, Broadphase};
pub use contact::Contact;
pub use world::{CollisionEvent, ContactMaterial, PhysicsConfig, PhysicsWorld};

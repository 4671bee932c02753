//! Live body/visual pairs.

use bevy::log::debug;

use crate::physics::{BodyHandle, PhysicsWorld};
use crate::scene::{NodeId, SceneGraph};

/// Identifier handed out by `EntityRegistry::insert`; never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityPairId(u64);

/// One body bound to the visual node that mirrors it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntityPair {
    pub id: EntityPairId,
    pub body: BodyHandle,
    pub node: NodeId,
}

/// Pairs in creation order. Grows with every spawn; `clear` and `remove`
/// are the only ways to shrink it.
#[derive(Default)]
pub struct EntityRegistry {
    pairs: Vec<EntityPair>,
    next_id: u64,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a pair whose body and node are already registered.
    pub(crate) fn insert(&mut self, body: BodyHandle, node: NodeId) -> EntityPairId {
        let id = EntityPairId(self.next_id);
        self.next_id += 1;
        self.pairs.push(EntityPair { id, body, node });
        id
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityPair> {
        self.pairs.iter()
    }

    pub fn get(&self, id: EntityPairId) -> Option<&EntityPair> {
        self.pairs.iter().find(|p| p.id == id)
    }

    /// Tears down one pair. Returns false for an unknown id.
    pub fn remove(&mut self, id: EntityPairId, world: &mut PhysicsWorld, scene: &mut SceneGraph) -> bool {
        let Some(i) = self.pairs.iter().position(|p| p.id == id) else {
            return false;
        };
        let pair = self.pairs.remove(i);
        detach(&pair, world, scene);
        debug!("removed entity {:?}", pair.id);
        true
    }

    /// Tears down every pair and empties the registry. Returns how many
    /// pairs were removed; a second call returns 0 and changes nothing.
    pub fn clear(&mut self, world: &mut PhysicsWorld, scene: &mut SceneGraph) -> usize {
        let removed = self.pairs.len();
        for pair in self.pairs.drain(..) {
            detach(&pair, world, scene);
        }
        removed
    }

    /// Copies every body's pose into its visual, in registry order.
    pub fn sync_visuals(&self, world: &PhysicsWorld, scene: &mut SceneGraph) {
        for pair in &self.pairs {
            if let (Some(body), Some(proxy)) = (world.body(pair.body), scene.get_mut(pair.node)) {
                proxy.sync_from(body);
            }
        }
    }
}

/// Listener off, body out of the world, node out of the scene.
fn detach(pair: &EntityPair, world: &mut PhysicsWorld, scene: &mut SceneGraph) {
    world.set_collision_listener(pair.body, false);
    world.remove_body(pair.body);
    scene.remove(pair.node);
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::physics::{Body, PhysicsConfig, Shape};
    use crate::scene::{Geometry, SurfaceMaterial, VisualProxy};
    use bevy::math::Vec3;
    use bevy::prelude::Transform;

    struct Fixture {
        world: PhysicsWorld,
        scene: SceneGraph,
        registry: EntityRegistry,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                world: PhysicsWorld::new(PhysicsConfig::default()),
                scene: SceneGraph::new(),
                registry: EntityRegistry::new(),
            }
        }

        fn add(&mut self, y: f32) -> EntityPairId {
            let body = self.world.add_body(
                Body::new(Shape::Sphere { radius: 0.5 }, 1.0).with_position(Vec3::Y * y),
            );
            self.world.set_collision_listener(body, true);
            let node = self.scene.add(VisualProxy::new(
                Arc::new(Geometry::Sphere {
                    radius: 1.0,
                    width_segments: 8,
                    height_segments: 8,
                }),
                Arc::new(SurfaceMaterial::default()),
                Transform::from_translation(Vec3::Y * y),
            ));
            self.registry.insert(body, node)
        }
    }

    #[test]
    fn clear_is_idempotent() {
        let mut f = Fixture::new();
        f.add(1.0);
        f.add(2.0);
        assert_eq!(f.registry.clear(&mut f.world, &mut f.scene), 2);
        assert!(f.world.is_empty());
        assert!(f.scene.is_empty());
        assert_eq!(f.registry.clear(&mut f.world, &mut f.scene), 0);
        assert!(f.registry.is_empty());
    }

    #[test]
    fn remove_single_pair() {
        let mut f = Fixture::new();
        let a = f.add(1.0);
        let b = f.add(2.0);
        assert!(f.registry.remove(a, &mut f.world, &mut f.scene));
        assert!(!f.registry.remove(a, &mut f.world, &mut f.scene));
        assert_eq!(f.registry.len(), 1);
        assert_eq!(f.world.len(), 1);
        assert_eq!(f.scene.len(), 1);
        let left = f.registry.get(b).unwrap();
        assert!(f.world.contains(left.body));
        assert!(f.scene.contains(left.node));
    }

    #[test]
    fn ids_are_not_reused() {
        let mut f = Fixture::new();
        let a = f.add(1.0);
        f.registry.clear(&mut f.world, &mut f.scene);
        let b = f.add(1.0);
        assert_ne!(a, b);
    }

    #[test]
    fn sync_copies_pose_exactly() {
        let mut f = Fixture::new();
        let id = f.add(3.0);
        let pair = *f.registry.get(id).unwrap();
        {
            let body = f.world.body_mut(pair.body).unwrap();
            body.position = Vec3::new(0.1, 2.345_678, -0.3);
            body.orientation = bevy::math::Quat::from_euler(bevy::math::EulerRot::XYZ, 0.1, 0.2, 0.3);
        }
        f.registry.sync_visuals(&f.world, &mut f.scene);

        let body = f.world.body(pair.body).unwrap();
        let proxy = f.scene.get(pair.node).unwrap();
        assert_eq!(proxy.transform().translation, body.position);
        assert_eq!(proxy.transform().rotation, body.orientation);
    }
}

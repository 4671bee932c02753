//! Render-side scene graph.
//!
//! Holds one `VisualProxy` per drawable object. Geometry and materials are
//! immutable templates shared between proxies through `Arc`; per-instance
//! size goes through the proxy's scale.

use std::collections::HashMap;
use std::sync::Arc;

use bevy::color::Color;
use bevy::prelude::Transform;

use crate::physics::Body;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Geometry {
    Sphere {
        radius: f32,
        width_segments: u32,
        height_segments: u32,
    },
    Box {
        width: f32,
        height: f32,
        depth: f32,
    },
    /// Flat rectangle in the local XY plane, facing +Z.
    Plane { width: f32, height: f32 },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceMaterial {
    pub base_color: Color,
    pub metalness: f32,
    pub roughness: f32,
    pub env_map_intensity: f32,
}

impl Default for SurfaceMaterial {
    fn default() -> Self {
        Self {
            base_color: Color::WHITE,
            metalness: 0.3,
            roughness: 0.4,
            env_map_intensity: 0.5,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

#[derive(Clone, Debug)]
pub struct VisualProxy {
    geometry: Arc<Geometry>,
    material: Arc<SurfaceMaterial>,
    transform: Transform,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

impl VisualProxy {
    pub fn new(geometry: Arc<Geometry>, material: Arc<SurfaceMaterial>, transform: Transform) -> Self {
        Self {
            geometry,
            material,
            transform,
            cast_shadow: false,
            receive_shadow: false,
        }
    }

    pub fn geometry(&self) -> &Arc<Geometry> {
        &self.geometry
    }

    pub fn material(&self) -> &Arc<SurfaceMaterial> {
        &self.material
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Copies the body's pose verbatim. Scale is untouched.
    pub(crate) fn sync_from(&mut self, body: &Body) {
        self.transform.translation = body.position;
        self.transform.rotation = body.orientation;
    }
}

#[derive(Default)]
pub struct SceneGraph {
    nodes: Vec<VisualProxy>,
    ids: Vec<NodeId>,
    index: HashMap<NodeId, usize>,
    next_id: u32,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, proxy: VisualProxy) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.index.insert(id, self.nodes.len());
        self.nodes.push(proxy);
        self.ids.push(id);
        id
    }

    pub fn remove(&mut self, id: NodeId) -> Option<VisualProxy> {
        let i = self.index.remove(&id)?;
        let proxy = self.nodes.swap_remove(i);
        self.ids.swap_remove(i);
        if let Some(&moved) = self.ids.get(i) {
            self.index.insert(moved, i);
        }
        Some(proxy)
    }

    pub fn get(&self, id: NodeId) -> Option<&VisualProxy> {
        self.index.get(&id).map(|&i| &self.nodes[i])
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut VisualProxy> {
        self.index.get(&id).map(|&i| &mut self.nodes[i])
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &VisualProxy)> {
        self.ids.iter().copied().zip(self.nodes.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::math::{Quat, Vec3};

    fn proxy(geometry: &Arc<Geometry>, material: &Arc<SurfaceMaterial>) -> VisualProxy {
        VisualProxy::new(geometry.clone(), material.clone(), Transform::IDENTITY)
    }

    #[test]
    fn proxies_share_templates() {
        let geometry = Arc::new(Geometry::Box {
            width: 1.0,
            height: 1.0,
            depth: 1.0,
        });
        let material = Arc::new(SurfaceMaterial::default());
        let mut scene = SceneGraph::new();
        let a = scene.add(proxy(&geometry, &material));
        let b = scene.add(proxy(&geometry, &material));

        assert!(Arc::ptr_eq(
            scene.get(a).unwrap().geometry(),
            scene.get(b).unwrap().geometry()
        ));
        assert_eq!(Arc::strong_count(&geometry), 3);

        scene.remove(a);
        scene.remove(b);
        assert!(scene.is_empty());
        assert_eq!(Arc::strong_count(&geometry), 1);
    }

    #[test]
    fn sync_keeps_scale() {
        let geometry = Arc::new(Geometry::Sphere {
            radius: 1.0,
            width_segments: 32,
            height_segments: 32,
        });
        let mut proxy = VisualProxy::new(
            geometry,
            Arc::new(SurfaceMaterial::default()),
            Transform::from_scale(Vec3::splat(0.25)),
        );
        let body = crate::physics::Body::new(crate::physics::Shape::Sphere { radius: 0.25 }, 1.0)
            .with_position(Vec3::new(1.0, 2.0, 3.0))
            .with_orientation(Quat::from_rotation_y(0.3));
        proxy.sync_from(&body);

        assert_eq!(proxy.transform().translation, body.position);
        assert_eq!(proxy.transform().rotation, body.orientation);
        assert_eq!(proxy.transform().scale, Vec3::splat(0.25));
    }

    #[test]
    fn ids_survive_removal_of_others() {
        let geometry = Arc::new(Geometry::Plane {
            width: 10.0,
            height: 10.0,
        });
        let material = Arc::new(SurfaceMaterial::default());
        let mut scene = SceneGraph::new();
        let ids: Vec<NodeId> = (0..4).map(|_| scene.add(proxy(&geometry, &material))).collect();
        scene.remove(ids[1]);
        assert!(!scene.contains(ids[1]));
        assert!(ids.iter().filter(|&&id| id != ids[1]).all(|&id| scene.contains(id)));
        assert_eq!(scene.iter().count(), 3);
    }
}

//! Narrow-phase collision tests.
//!
//! Every test reports contacts with the normal pointing from the first body
//! toward the second.

use bevy::math::{Quat, Vec3};

use super::body::{Body, Shape};

#[derive(Clone, Copy, Debug)]
pub struct Contact {
    /// Index of the first body in the world's body list.
    pub a: usize,
    pub b: usize,
    /// World-space contact point.
    pub point: Vec3,
    /// Unit normal from `a` toward `b`.
    pub normal: Vec3,
    pub depth: f32,
}

/// Appends every contact between bodies `a` and `b` to `out`.
pub fn collide(a: usize, body_a: &Body, b: usize, body_b: &Body, out: &mut Vec<Contact>) {
    let start = out.len();
    match (body_a.shape, body_b.shape) {
        (Shape::Sphere { radius: ra }, Shape::Sphere { radius: rb }) => {
            out.extend(sphere_sphere(body_a.position, ra, body_b.position, rb));
        }
        (Shape::Sphere { radius }, Shape::Plane) => {
            let (n, d) = body_b.plane();
            out.extend(sphere_plane(body_a.position, radius, n, d));
        }
        (Shape::Plane, Shape::Sphere { radius }) => {
            let (n, d) = body_a.plane();
            flip_into(out, sphere_plane(body_b.position, radius, n, d));
        }
        (Shape::Box { half_extents }, Shape::Plane) => {
            let (n, d) = body_b.plane();
            box_plane(body_a.position, body_a.orientation, half_extents, n, d, out);
        }
        (Shape::Plane, Shape::Box { half_extents }) => {
            let (n, d) = body_a.plane();
            let mut tmp = Vec::new();
            box_plane(body_b.position, body_b.orientation, half_extents, n, d, &mut tmp);
            flip_all_into(out, tmp);
        }
        (Shape::Sphere { radius }, Shape::Box { half_extents }) => {
            out.extend(sphere_box(
                body_a.position,
                radius,
                body_b.position,
                body_b.orientation,
                half_extents,
            ));
        }
        (Shape::Box { half_extents }, Shape::Sphere { radius }) => {
            flip_into(
                out,
                sphere_box(
                    body_b.position,
                    radius,
                    body_a.position,
                    body_a.orientation,
                    half_extents,
                ),
            );
        }
        (Shape::Box { half_extents: ha }, Shape::Box { half_extents: hb }) => {
            box_box(
                body_a.position,
                body_a.orientation,
                ha,
                body_b.position,
                body_b.orientation,
                hb,
                out,
            );
        }
        (Shape::Plane, Shape::Plane) => {}
    }

    for contact in &mut out[start..] {
        contact.a = a;
        contact.b = b;
    }
}

/// Shape tests that ran with the operands swapped report normals from `b`
/// to `a`.
fn flip_into(out: &mut Vec<Contact>, contact: Option<Contact>) {
    flip_all_into(out, contact);
}

fn flip_all_into(out: &mut Vec<Contact>, contacts: impl IntoIterator<Item = Contact>) {
    out.extend(contacts.into_iter().map(|mut c| {
        c.normal = -c.normal;
        c
    }));
}

fn contact(point: Vec3, normal: Vec3, depth: f32) -> Contact {
    Contact {
        a: 0,
        b: 0,
        point,
        normal,
        depth,
    }
}

pub fn sphere_sphere(pa: Vec3, ra: f32, pb: Vec3, rb: f32) -> Option<Contact> {
    let d = pb - pa;
    let dist_sq = d.length_squared();
    let sum = ra + rb;
    if dist_sq >= sum * sum {
        return None;
    }
    let dist = dist_sq.sqrt();
    let normal = if dist > 0.0 { d / dist } else { Vec3::Y };
    Some(contact(pa + normal * ra, normal, sum - dist))
}

/// `plane_n` / `plane_d` describe the half-space `x·n >= d`.
pub fn sphere_plane(center: Vec3, radius: f32, plane_n: Vec3, plane_d: f32) -> Option<Contact> {
    let dist = center.dot(plane_n) - plane_d;
    if dist >= radius {
        return None;
    }
    Some(contact(center - plane_n * radius, -plane_n, radius - dist))
}

pub fn box_plane(
    center: Vec3,
    rot: Quat,
    half_extents: Vec3,
    plane_n: Vec3,
    plane_d: f32,
    out: &mut Vec<Contact>,
) {
    for vertex in box_vertices(center, rot, half_extents) {
        let dist = vertex.dot(plane_n) - plane_d;
        if dist < 0.0 {
            out.push(contact(vertex, -plane_n, -dist));
        }
    }
}

pub fn sphere_box(
    center: Vec3,
    radius: f32,
    box_center: Vec3,
    box_rot: Quat,
    half_extents: Vec3,
) -> Option<Contact> {
    let local = box_rot.inverse() * (center - box_center);
    let clamped = local.clamp(-half_extents, half_extents);
    let diff = local - clamped;
    let dist_sq = diff.length_squared();
    if dist_sq >= radius * radius {
        return None;
    }

    let dist = dist_sq.sqrt();
    let (outward, depth) = if dist > 0.0 {
        (diff / dist, radius - dist)
    } else {
        // center inside the box: leave through the nearest face
        let (axis, pen) = min_axis(half_extents - local.abs());
        (Vec3::AXES[axis] * local[axis].signum(), radius + pen)
    };
    let point = box_center + box_rot * clamped;
    Some(contact(point, -(box_rot * outward), depth))
}

/// Vertex-in-box test in both directions. Edge-edge contacts are not
/// detected.
pub fn box_box(
    pa: Vec3,
    qa: Quat,
    ha: Vec3,
    pb: Vec3,
    qb: Quat,
    hb: Vec3,
    out: &mut Vec<Contact>,
) {
    for vertex in box_vertices(pa, qa, ha) {
        if let Some((outward, depth)) = point_in_box(vertex, pb, qb, hb) {
            out.push(contact(vertex, -outward, depth));
        }
    }
    for vertex in box_vertices(pb, qb, hb) {
        if let Some((outward, depth)) = point_in_box(vertex, pa, qa, ha) {
            out.push(contact(vertex, outward, depth));
        }
    }
}

fn point_in_box(point: Vec3, center: Vec3, rot: Quat, half_extents: Vec3) -> Option<(Vec3, f32)> {
    let local = rot.inverse() * (point - center);
    let pen = half_extents - local.abs();
    if pen.min_element() <= 0.0 {
        return None;
    }
    let (axis, depth) = min_axis(pen);
    Some((rot * (Vec3::AXES[axis] * local[axis].signum()), depth))
}

/// Index and value of the smallest component.
fn min_axis(v: Vec3) -> (usize, f32) {
    if v.x <= v.y && v.x <= v.z {
        (0, v.x)
    } else if v.y <= v.z {
        (1, v.y)
    } else {
        (2, v.z)
    }
}

pub fn box_vertices(center: Vec3, rot: Quat, half_extents: Vec3) -> [Vec3; 8] {
    let mut vertices = [Vec3::ZERO; 8];
    let mut i = 0;
    for sx in [-1.0_f32, 1.0] {
        for sy in [-1.0_f32, 1.0] {
            for sz in [-1.0_f32, 1.0] {
                vertices[i] = center + rot * (half_extents * Vec3::new(sx, sy, sz));
                i += 1;
            }
        }
    }
    vertices
}

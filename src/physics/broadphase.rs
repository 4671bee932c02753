//! Broad-phase candidate pair search.

use bevy::math::{Mat3, Vec3};

use super::body::{Body, Shape};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Broadphase {
    /// Tests every pair of bodies.
    Naive,
    /// Sorts bounding boxes along the axis of greatest spread and sweeps.
    #[default]
    SweepAndPrune,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn of(body: &Body) -> Self {
        match body.shape {
            Shape::Sphere { radius } => Self {
                min: body.position - Vec3::splat(radius),
                max: body.position + Vec3::splat(radius),
            },
            Shape::Box { half_extents } => {
                let rot = Mat3::from_quat(body.orientation);
                let abs = Mat3::from_cols(rot.x_axis.abs(), rot.y_axis.abs(), rot.z_axis.abs());
                let extent = abs * half_extents;
                Self {
                    min: body.position - extent,
                    max: body.position + extent,
                }
            }
            Shape::Plane => Self {
                min: Vec3::splat(f32::NEG_INFINITY),
                max: Vec3::splat(f32::INFINITY),
            },
        }
    }

    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.cmple(other.max).all() && other.min.cmple(self.max).all()
    }
}

/// Whether the pair can produce a contact worth solving: at least one side
/// must be an awake dynamic body.
fn needs_test(a: &Body, b: &Body) -> bool {
    let active = |body: &Body| body.is_dynamic() && !body.is_sleeping();
    active(a) || active(b)
}

impl Broadphase {
    /// Candidate pairs `(i, j)` with `i < j`, sorted.
    pub fn pairs(&self, bodies: &[Body]) -> Vec<(usize, usize)> {
        let aabbs: Vec<Aabb> = bodies.iter().map(Aabb::of).collect();
        let mut pairs = match self {
            Broadphase::Naive => naive(bodies, &aabbs),
            Broadphase::SweepAndPrune => sweep_and_prune(bodies, &aabbs),
        };
        pairs.sort_unstable();
        pairs
    }
}

fn naive(bodies: &[Body], aabbs: &[Aabb]) -> Vec<(usize, usize)> {
    let mut pairs = Vec::new();
    for i in 0..bodies.len() {
        for j in (i + 1)..bodies.len() {
            if needs_test(&bodies[i], &bodies[j]) && aabbs[i].overlaps(&aabbs[j]) {
                pairs.push((i, j));
            }
        }
    }
    pairs
}

fn sweep_and_prune(bodies: &[Body], aabbs: &[Aabb]) -> Vec<(usize, usize)> {
    let axis = sweep_axis(aabbs);
    let mut order: Vec<usize> = (0..bodies.len()).collect();
    order.sort_by(|&i, &j| aabbs[i].min[axis].total_cmp(&aabbs[j].min[axis]));

    let mut pairs = Vec::new();
    for (k, &i) in order.iter().enumerate() {
        for &j in &order[k + 1..] {
            if aabbs[j].min[axis] > aabbs[i].max[axis] {
                break;
            }
            if needs_test(&bodies[i], &bodies[j]) && aabbs[i].overlaps(&aabbs[j]) {
                pairs.push((i.min(j), i.max(j)));
            }
        }
    }
    pairs
}

/// Axis with the largest variance of finite box centers.
fn sweep_axis(aabbs: &[Aabb]) -> usize {
    let mut sum = Vec3::ZERO;
    let mut sum_sq = Vec3::ZERO;
    let mut n = 0.0;
    for aabb in aabbs.iter().filter(|a| a.min.is_finite() && a.max.is_finite()) {
        let center = (aabb.min + aabb.max) * 0.5;
        sum += center;
        sum_sq += center * center;
        n += 1.0;
    }
    if n < 2.0 {
        return 0;
    }
    let mean = sum / n;
    let variance = sum_sq / n - mean * mean;
    if variance.x >= variance.y && variance.x >= variance.z {
        0
    } else if variance.y >= variance.z {
        1
    } else {
        2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::math::Quat;

    fn ball(x: f32, y: f32, z: f32) -> Body {
        Body::new(Shape::Sphere { radius: 0.5 }, 1.0).with_position(Vec3::new(x, y, z))
    }

    #[test]
    fn rotated_box_grows_its_bounds() {
        let body = Body::new(
            Shape::Box {
                half_extents: Vec3::new(1.0, 0.1, 0.1),
            },
            1.0,
        )
        .with_orientation(Quat::from_rotation_z(std::f32::consts::FRAC_PI_2));
        let aabb = Aabb::of(&body);
        assert!((aabb.max.y - 1.0).abs() < 1e-5);
        assert!((aabb.max.x - 0.1).abs() < 1e-5);
    }

    #[test]
    fn static_pairs_are_skipped() {
        let bodies = vec![
            Body::new(Shape::Plane, 0.0),
            Body::new(Shape::Sphere { radius: 1.0 }, 0.0),
        ];
        assert!(Broadphase::Naive.pairs(&bodies).is_empty());
        assert!(Broadphase::SweepAndPrune.pairs(&bodies).is_empty());
    }

    #[test]
    fn sweep_and_prune_agrees_with_naive() {
        let mut bodies = vec![Body::new(Shape::Plane, 0.0)];
        for i in 0..6 {
            for j in 0..4 {
                bodies.push(ball(i as f32 * 0.7, 0.4 + j as f32 * 0.9, (i * j) as f32 * 0.1));
            }
        }
        bodies.push(
            Body::new(
                Shape::Box {
                    half_extents: Vec3::splat(0.6),
                },
                1.0,
            )
            .with_position(Vec3::new(1.0, 1.0, 0.0)),
        );

        let naive = Broadphase::Naive.pairs(&bodies);
        let sap = Broadphase::SweepAndPrune.pairs(&bodies);
        assert!(!naive.is_empty());
        assert_eq!(naive, sap);
    }

    #[test]
    fn sweep_axis_follows_spread() {
        let bodies: Vec<Body> = (0..5).map(|i| ball(0.0, 0.0, i as f32 * 3.0)).collect();
        let aabbs: Vec<Aabb> = bodies.iter().map(Aabb::of).collect();
        assert_eq!(sweep_axis(&aabbs), 2);
    }
}

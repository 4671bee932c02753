//! Physics simulation world.
//!
//! Owns the bodies, integrates them with a fixed-size step, solves contacts
//! with sequential impulses, and queues a `CollisionEvent` whenever two
//! bodies start touching.

use std::collections::{HashMap, HashSet};

use bevy::log::{debug, warn};
use bevy::math::{Mat3, Vec3};

use super::body::{Body, BodyHandle, MaterialId, SleepState};
use super::broadphase::Broadphase;
use super::contact::{self, Contact};

/// Friction and restitution used when two materials meet.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContactMaterial {
    pub friction: f32,
    /// Bounciness, 0..=1.
    pub restitution: f32,
}

impl Default for ContactMaterial {
    fn default() -> Self {
        Self {
            friction: 0.1,
            restitution: 0.7,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PhysicsConfig {
    pub gravity: Vec3,
    pub broadphase: Broadphase,
    /// Used for every pair without a registered contact material.
    pub default_contact: ContactMaterial,
    pub solver_iterations: u32,
    pub allow_sleep: bool,
    pub sleep_speed_limit: f32,
    pub sleep_time_limit: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.82, 0.0),
            broadphase: Broadphase::default(),
            default_contact: ContactMaterial::default(),
            solver_iterations: 10,
            allow_sleep: true,
            sleep_speed_limit: 0.1,
            sleep_time_limit: 1.0,
        }
    }
}

/// Raised for a body with a collision listener when it starts touching
/// `other`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CollisionEvent {
    pub body: BodyHandle,
    pub other: BodyHandle,
    /// Approach speed along the contact normal; positive when closing.
    pub impact_speed: f32,
}

const PENETRATION_SLOP: f32 = 0.01;
const POSITION_CORRECTION: f32 = 0.8;

/// Contacts bouncing slower than this get no restitution, so resting bodies
/// settle instead of jittering.
const RESTITUTION_CUTOFF: f32 = 0.2;

type PairKey = (BodyHandle, BodyHandle);

fn pair_key(a: BodyHandle, b: BodyHandle) -> PairKey {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

pub struct PhysicsWorld {
    config: PhysicsConfig,
    bodies: Vec<Body>,
    handles: Vec<BodyHandle>,
    index: HashMap<BodyHandle, usize>,
    next_handle: u32,
    next_material: u32,
    contact_materials: HashMap<(MaterialId, MaterialId), ContactMaterial>,
    touching: HashSet<PairKey>,
    events: Vec<CollisionEvent>,
    accumulator: f32,
    time: f32,
    steps: u64,
}

impl PhysicsWorld {
    pub fn new(config: PhysicsConfig) -> Self {
        Self {
            config,
            bodies: Vec::new(),
            handles: Vec::new(),
            index: HashMap::new(),
            next_handle: 0,
            next_material: 0,
            contact_materials: HashMap::new(),
            touching: HashSet::new(),
            events: Vec::new(),
            accumulator: 0.0,
            time: 0.0,
            steps: 0,
        }
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut PhysicsConfig {
        &mut self.config
    }

    /// Registers `body` and returns a fresh handle. The world takes
    /// ownership, so a body can never be registered twice.
    pub fn add_body(&mut self, body: Body) -> BodyHandle {
        let handle = BodyHandle(self.next_handle);
        self.next_handle += 1;
        self.index.insert(handle, self.bodies.len());
        self.bodies.push(body);
        self.handles.push(handle);
        handle
    }

    /// Detaches `handle` from future steps, dropping its collision listener,
    /// contact history and undelivered events.
    pub fn remove_body(&mut self, handle: BodyHandle) -> Option<Body> {
        let i = self.index.remove(&handle)?;
        let mut body = self.bodies.swap_remove(i);
        self.handles.swap_remove(i);
        if let Some(&moved) = self.handles.get(i) {
            self.index.insert(moved, i);
        }
        body.collision_listener = false;
        self.touching.retain(|&(a, b)| a != handle && b != handle);
        self.events.retain(|e| e.body != handle);
        Some(body)
    }

    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.index.contains_key(&handle)
    }

    pub fn body(&self, handle: BodyHandle) -> Option<&Body> {
        self.index.get(&handle).map(|&i| &self.bodies[i])
    }

    pub fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut Body> {
        self.index.get(&handle).map(|&i| &mut self.bodies[i])
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn bodies(&self) -> impl Iterator<Item = (BodyHandle, &Body)> {
        self.handles.iter().copied().zip(self.bodies.iter())
    }

    /// Starts or stops delivering collision events for `handle`. Returns
    /// false if the body is not in this world.
    pub fn set_collision_listener(&mut self, handle: BodyHandle, listening: bool) -> bool {
        match self.body_mut(handle) {
            Some(body) => {
                body.collision_listener = listening;
                true
            }
            None => false,
        }
    }

    pub fn create_material(&mut self) -> MaterialId {
        let id = MaterialId(self.next_material);
        self.next_material += 1;
        id
    }

    pub fn add_contact_material(&mut self, a: MaterialId, b: MaterialId, material: ContactMaterial) {
        let key = if a <= b { (a, b) } else { (b, a) };
        self.contact_materials.insert(key, material);
    }

    /// Registered material for the pair, or the world default.
    pub fn contact_material(&self, a: Option<MaterialId>, b: Option<MaterialId>) -> ContactMaterial {
        match (a, b) {
            (Some(a), Some(b)) => {
                let key = if a <= b { (a, b) } else { (b, a) };
                self.contact_materials
                    .get(&key)
                    .copied()
                    .unwrap_or(self.config.default_contact)
            }
            _ => self.config.default_contact,
        }
    }

    /// Simulated seconds so far.
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Number of fixed substeps run so far.
    pub fn step_count(&self) -> u64 {
        self.steps
    }

    /// Events raised since the last drain, in the order they occurred.
    pub fn drain_events(&mut self) -> std::vec::Drain<'_, CollisionEvent> {
        self.events.drain(..)
    }

    pub fn pending_events(&self) -> &[CollisionEvent] {
        &self.events
    }

    /// Consumes `delta` seconds in substeps of `fixed_timestep`, running at
    /// most `max_substeps`. Leftover time below one substep carries over to
    /// the next call; backlog beyond the cap is dropped. Returns the number
    /// of substeps taken.
    pub fn step(&mut self, fixed_timestep: f32, delta: f32, max_substeps: u32) -> u32 {
        if fixed_timestep.is_nan() || fixed_timestep <= 0.0 {
            warn!("ignoring step with non-positive timestep {fixed_timestep}");
            return 0;
        }
        let delta = if delta >= 0.0 && delta.is_finite() {
            delta
        } else {
            warn!("clamping step delta {delta} to zero");
            0.0
        };

        self.accumulator += delta;
        let mut substeps = 0;
        while self.accumulator >= fixed_timestep && substeps < max_substeps {
            self.internal_step(fixed_timestep);
            self.accumulator -= fixed_timestep;
            substeps += 1;
        }
        if self.accumulator >= fixed_timestep {
            debug!(
                "substep cap {max_substeps} reached, dropping {:.4}s",
                self.accumulator - self.accumulator % fixed_timestep
            );
        }
        self.accumulator %= fixed_timestep;
        self.time += delta;
        substeps
    }

    /// Advances exactly one substep of `dt` seconds.
    pub fn internal_step(&mut self, dt: f32) {
        let gravity = self.config.gravity;
        for body in &mut self.bodies {
            if body.is_dynamic() && !body.is_sleeping() {
                body.velocity += gravity * dt;
            }
        }

        let contacts = self.detect_contacts();
        self.update_touching(&contacts);
        self.wake_touched_sleepers();
        self.solve(&contacts);
        self.correct_positions(&contacts);
        self.integrate(dt);
        if self.config.allow_sleep {
            self.update_sleep(dt);
        }
        self.steps += 1;
    }

    fn detect_contacts(&mut self) -> Vec<Contact> {
        let pairs = self.config.broadphase.pairs(&self.bodies);
        let mut contacts = Vec::new();
        for (i, j) in pairs {
            let start = contacts.len();
            contact::collide(i, &self.bodies[i], j, &self.bodies[j], &mut contacts);
            if contacts.len() > start {
                self.flag_wake(i, j);
            }
        }
        contacts
    }

    /// A sleeping body is woken by an awake dynamic body moving fast enough.
    fn flag_wake(&mut self, i: usize, j: usize) {
        let limit_sq = self.config.sleep_speed_limit * self.config.sleep_speed_limit;
        for (sleeper, other) in [(i, j), (j, i)] {
            let o = &self.bodies[other];
            let wakes = o.is_dynamic()
                && o.sleep_state == SleepState::Awake
                && o.speed_squared() >= limit_sq * 2.0;
            if wakes && self.bodies[sleeper].is_sleeping() {
                self.bodies[sleeper].wake_after_narrowphase = true;
            }
        }
    }

    fn wake_touched_sleepers(&mut self) {
        for body in &mut self.bodies {
            if body.wake_after_narrowphase {
                body.wake_up();
            }
        }
    }

    /// Rebuilds the set of touching pairs and raises events for pairs that
    /// were not touching on the previous substep.
    fn update_touching(&mut self, contacts: &[Contact]) {
        let mut current = HashSet::with_capacity(self.touching.len());
        for c in contacts {
            let (ha, hb) = (self.handles[c.a], self.handles[c.b]);
            let key = pair_key(ha, hb);
            if !current.insert(key) || self.touching.contains(&key) {
                continue;
            }
            let (a, b) = (&self.bodies[c.a], &self.bodies[c.b]);
            let ra = c.point - a.position;
            let rb = c.point - b.position;
            let impact_speed = (a.velocity_at(ra) - b.velocity_at(rb)).dot(c.normal);
            for (body, listening, other) in [
                (ha, a.collision_listener, hb),
                (hb, b.collision_listener, ha),
            ] {
                if listening {
                    self.events.push(CollisionEvent {
                        body,
                        other,
                        impact_speed,
                    });
                }
            }
        }
        self.touching = current;
    }

    fn solve(&mut self, contacts: &[Contact]) {
        if contacts.is_empty() {
            return;
        }
        let mut rows: Vec<SolverRow> = contacts.iter().map(|c| self.prepare_row(c)).collect();
        for _ in 0..self.config.solver_iterations {
            for row in &mut rows {
                let (a, b) = pair_mut(&mut self.bodies, row.a, row.b);
                row.apply(a, b);
            }
        }
    }

    fn prepare_row(&self, c: &Contact) -> SolverRow {
        let (a, b) = (&self.bodies[c.a], &self.bodies[c.b]);
        let material = self.contact_material(a.material, b.material);
        let ra = c.point - a.position;
        let rb = c.point - b.position;
        let inv_ia = a.solver_inv_inertia();
        let inv_ib = b.solver_inv_inertia();
        let (inv_ma, inv_mb) = (a.solver_inv_mass(), b.solver_inv_mass());

        let effective = |dir: Vec3| {
            let k = inv_ma
                + inv_mb
                + dir.dot((inv_ia * ra.cross(dir)).cross(ra))
                + dir.dot((inv_ib * rb.cross(dir)).cross(rb));
            if k > 0.0 {
                1.0 / k
            } else {
                0.0
            }
        };

        let (t1, t2) = c.normal.any_orthonormal_pair();
        let closing = (a.velocity_at(ra) - b.velocity_at(rb)).dot(c.normal);
        let bounce = if closing > RESTITUTION_CUTOFF {
            material.restitution * closing
        } else {
            0.0
        };

        SolverRow {
            a: c.a,
            b: c.b,
            ra,
            rb,
            normal: c.normal,
            tangents: [t1, t2],
            inv_ia,
            inv_ib,
            normal_mass: effective(c.normal),
            tangent_mass: [effective(t1), effective(t2)],
            friction: material.friction,
            bounce,
            normal_impulse: 0.0,
            tangent_impulse: [0.0, 0.0],
        }
    }

    fn correct_positions(&mut self, contacts: &[Contact]) {
        for c in contacts {
            let (a, b) = pair_mut(&mut self.bodies, c.a, c.b);
            let (inv_ma, inv_mb) = (a.solver_inv_mass(), b.solver_inv_mass());
            let total = inv_ma + inv_mb;
            if total <= 0.0 {
                continue;
            }
            let push = c.normal * ((c.depth - PENETRATION_SLOP).max(0.0) * POSITION_CORRECTION / total);
            a.position -= push * inv_ma;
            b.position += push * inv_mb;
        }
    }

    fn integrate(&mut self, dt: f32) {
        for body in &mut self.bodies {
            if !body.is_dynamic() || body.is_sleeping() {
                continue;
            }
            body.velocity *= (1.0 - body.linear_damping).powf(dt);
            body.angular_velocity *= (1.0 - body.angular_damping).powf(dt);

            body.position += body.velocity * dt;
            let w = body.angular_velocity;
            if w != Vec3::ZERO {
                let q = body.orientation;
                let dq = bevy::math::Quat::from_xyzw(w.x, w.y, w.z, 0.0) * q * (0.5 * dt);
                body.orientation = (q + dq).normalize();
            }
        }
    }

    fn update_sleep(&mut self, dt: f32) {
        let limit_sq = self.config.sleep_speed_limit * self.config.sleep_speed_limit;
        let time_limit = self.config.sleep_time_limit;
        let now = self.time_after_substep(dt);
        for body in &mut self.bodies {
            if !body.is_dynamic() {
                continue;
            }
            let slow = body.speed_squared() < limit_sq;
            match body.sleep_state {
                SleepState::Awake if slow => {
                    body.sleep_state = SleepState::Sleepy;
                    body.sleepy_since = now;
                }
                SleepState::Sleepy if !slow => body.wake_up(),
                SleepState::Sleepy if now - body.sleepy_since > time_limit => {
                    body.sleep_state = SleepState::Sleeping;
                    body.velocity = Vec3::ZERO;
                    body.angular_velocity = Vec3::ZERO;
                }
                _ => {}
            }
        }
    }

    /// Sleep timing runs on substep count so it does not depend on how
    /// frame deltas were split.
    fn time_after_substep(&self, dt: f32) -> f32 {
        (self.steps + 1) as f32 * dt
    }
}

struct SolverRow {
    a: usize,
    b: usize,
    ra: Vec3,
    rb: Vec3,
    normal: Vec3,
    tangents: [Vec3; 2],
    inv_ia: Mat3,
    inv_ib: Mat3,
    normal_mass: f32,
    tangent_mass: [f32; 2],
    friction: f32,
    bounce: f32,
    normal_impulse: f32,
    tangent_impulse: [f32; 2],
}

impl SolverRow {
    fn apply(&mut self, a: &mut Body, b: &mut Body) {
        // closing speed: positive while the bodies approach
        let closing = (a.velocity_at(self.ra) - b.velocity_at(self.rb)).dot(self.normal);
        let lambda = self.normal_mass * (closing + self.bounce);
        let accumulated = (self.normal_impulse + lambda).max(0.0);
        let delta = accumulated - self.normal_impulse;
        self.normal_impulse = accumulated;
        self.push(a, b, self.normal * delta);

        let max_friction = self.friction * self.normal_impulse;
        for k in 0..2 {
            let t = self.tangents[k];
            let slip = (a.velocity_at(self.ra) - b.velocity_at(self.rb)).dot(t);
            let lambda = self.tangent_mass[k] * slip;
            let accumulated = (self.tangent_impulse[k] + lambda).clamp(-max_friction, max_friction);
            let delta = accumulated - self.tangent_impulse[k];
            self.tangent_impulse[k] = accumulated;
            self.push(a, b, t * delta);
        }
    }

    /// Pushes `b` along `impulse` and `a` against it. Static and sleeping
    /// bodies do not move.
    fn push(&self, a: &mut Body, b: &mut Body, impulse: Vec3) {
        if a.is_dynamic() && !a.is_sleeping() {
            a.velocity -= impulse * a.inv_mass;
            a.angular_velocity -= self.inv_ia * self.ra.cross(impulse);
        }
        if b.is_dynamic() && !b.is_sleeping() {
            b.velocity += impulse * b.inv_mass;
            b.angular_velocity += self.inv_ib * self.rb.cross(impulse);
        }
    }
}

fn pair_mut(bodies: &mut [Body], i: usize, j: usize) -> (&mut Body, &mut Body) {
    debug_assert_ne!(i, j);
    if i < j {
        let (left, right) = bodies.split_at_mut(j);
        (&mut left[i], &mut right[0])
    } else {
        let (left, right) = bodies.split_at_mut(i);
        (&mut right[0], &mut left[j])
    }
}

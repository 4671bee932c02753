use bevy::math::Vec3;
use tumble::{
    AudioSink, CollisionGate, DebugSurface, FixedFrames, Headless, LoopState, ManualTime,
    SimSettings, SimulationContext, SimulationLoop, SpawnError,
};

#[derive(Default)]
struct RecordingAudio(Vec<f32>);

impl AudioSink for RecordingAudio {
    fn play(&mut self, intensity: f32) {
        self.0.push(intensity);
    }
}

fn context_with(settings: SimSettings) -> (SimulationContext, ManualTime) {
    let time = ManualTime::new();
    let ctx = SimulationContext::with_time_source(
        SimSettings {
            seed: Some(9),
            ..settings
        },
        Box::new(time.clone()),
    );
    (ctx, time)
}

fn context() -> (SimulationContext, ManualTime) {
    context_with(SimSettings::default())
}

#[test]
fn spawn_then_clear_restores_counts() {
    let (mut ctx, _) = context();
    let bodies = ctx.world().len();
    let nodes = ctx.scene().len();

    for i in 0..7 {
        let p = Vec3::new(i as f32, 2.0, 0.0);
        if i % 2 == 0 {
            ctx.spawn_sphere(0.2 + i as f32 * 0.05, p).unwrap();
        } else {
            ctx.spawn_box(0.3, 0.4, 0.5, p).unwrap();
        }
    }
    assert_eq!(ctx.registry().len(), 7);
    assert_eq!(ctx.world().len(), bodies + 7);

    ctx.clear();
    assert_eq!(ctx.registry().len(), 0);
    assert_eq!(ctx.world().len(), bodies);
    assert_eq!(ctx.scene().len(), nodes);
}

#[test]
fn no_drift_without_gravity() {
    let (mut ctx, time) = context_with(SimSettings {
        gravity: Vec3::ZERO,
        ..SimSettings::default()
    });
    let id = ctx.spawn_sphere(0.5, Vec3::new(0.3, 2.0, -0.7)).unwrap();
    let handle = ctx.registry().get(id).unwrap().body;
    let start = ctx.world().body(handle).unwrap().position;

    let mut sim = SimulationLoop::for_context(&ctx);
    for _ in 0..120 {
        time.advance(1.0 / 60.0);
        sim.tick(&mut ctx, &mut Headless, &mut RecordingAudio::default());
    }
    assert_eq!(ctx.world().body(handle).unwrap().position, start);
}

#[test]
fn visuals_match_bodies_after_every_cycle() {
    let (mut ctx, time) = context();
    for i in 0..5 {
        ctx.spawn_box(0.5, 0.5, 0.5, Vec3::new(i as f32 * 0.3, 1.0 + i as f32, 0.0))
            .unwrap();
    }
    let mut sim = SimulationLoop::for_context(&ctx);
    for _ in 0..90 {
        time.advance(0.016);
        sim.tick(&mut ctx, &mut Headless, &mut RecordingAudio::default());
        for pair in ctx.registry().iter() {
            let body = ctx.world().body(pair.body).unwrap();
            let proxy = ctx.scene().get(pair.node).unwrap();
            assert_eq!(proxy.transform().translation, body.position);
            assert_eq!(proxy.transform().rotation, body.orientation);
        }
    }
}

#[test]
fn gate_reference_policy() {
    let gate = CollisionGate::default();
    assert!(!gate.should_trigger(0.0));
    assert!(gate.should_trigger(10.0));
}

#[test]
fn sphere_falls_after_one_step() {
    let (mut ctx, _) = context();
    let id = ctx.spawn_sphere(0.5, Vec3::new(0.0, 3.0, 0.0)).unwrap();
    let handle = ctx.registry().get(id).unwrap().body;

    let substeps = ctx.world_mut().step(1.0 / 60.0, 1.0 / 60.0, 3);
    assert_eq!(substeps, 1);

    let body = ctx.world().body(handle).unwrap();
    assert!(body.position.y < 3.0);
    assert!(body.position.x.abs() < 1e-6);
    assert!(body.position.z.abs() < 1e-6);
}

#[test]
fn hundred_spawns_then_clear_leaves_only_the_floor() {
    let (mut ctx, _) = context();
    let baseline = ctx.scene().len();
    for i in 0..100 {
        ctx.spawn_sphere(0.1, Vec3::new((i % 10) as f32, 1.0 + (i / 10) as f32, 0.0))
            .unwrap();
    }
    assert_eq!(ctx.clear(), 100);
    assert_eq!(ctx.world().len(), 1);
    assert!(ctx.world().contains(ctx.floor_body()));
    assert_eq!(ctx.scene().len(), baseline);
}

#[test]
fn clear_on_empty_registry_changes_nothing() {
    let (mut ctx, _) = context();
    let bodies = ctx.world().len();
    let nodes = ctx.scene().len();
    assert_eq!(ctx.clear(), 0);
    assert_eq!(ctx.clear(), 0);
    assert_eq!(ctx.world().len(), bodies);
    assert_eq!(ctx.scene().len(), nodes);
}

#[test]
fn rejected_spawn_registers_nothing() {
    let (mut ctx, _) = context();
    let before = (ctx.world().len(), ctx.scene().len(), ctx.registry().len());
    assert!(matches!(
        ctx.spawn_box(1.0, -1.0, 1.0, Vec3::ZERO),
        Err(SpawnError::InvalidDimension { name: "height", .. })
    ));
    assert_eq!(
        ctx.spawn_sphere(0.5, Vec3::new(0.0, f32::NAN, 0.0)),
        Err(SpawnError::NonFinitePosition)
    );
    assert_eq!(
        before,
        (ctx.world().len(), ctx.scene().len(), ctx.registry().len())
    );
}

#[test]
fn dropped_ball_is_heard_on_impact() {
    let (mut ctx, time) = context();
    ctx.spawn_sphere(0.5, Vec3::new(0.0, 3.0, 0.0)).unwrap();
    let mut sim = SimulationLoop::for_context(&ctx);
    let mut audio = RecordingAudio::default();

    // 2.5 m of free fall: lands after ~0.7 s at ~7 m/s.
    for _ in 0..45 {
        time.advance(0.02);
        sim.tick(&mut ctx, &mut Headless, &mut audio);
    }
    assert!(!audio.0.is_empty());
    assert!(audio.0.iter().all(|i| (0.0..=1.0).contains(i)));
    // One listener, one begin-contact; the rebound has not landed yet.
    assert_eq!(audio.0.len(), 1);
}

#[test]
fn fixed_frames_bound_the_run() {
    let (mut ctx, time) = context();
    let mut sim = SimulationLoop::for_context(&ctx);
    time.advance(1.0);
    let ran = sim.run(
        &mut ctx,
        &mut FixedFrames(4),
        &mut Headless,
        &mut RecordingAudio::default(),
    );
    assert_eq!(ran, 4);
    assert_eq!(sim.frames(), 4);
    assert_eq!(sim.state(), LoopState::Running);
}

#[test]
fn cancellation_ends_the_run() {
    let (mut ctx, _) = context();
    let mut sim = SimulationLoop::for_context(&ctx);
    let token = sim.cancel_token();
    token.cancel();
    let ran = sim.run(
        &mut ctx,
        &mut FixedFrames(100),
        &mut Headless,
        &mut RecordingAudio::default(),
    );
    assert_eq!(ran, 0);
    assert_eq!(sim.state(), LoopState::Stopped);
}

#[test]
fn debug_requests_apply_at_next_cycle() {
    let (mut ctx, time) = context();
    let mut sim = SimulationLoop::for_context(&ctx);

    DebugSurface::on_add_box_requested(&mut ctx);
    DebugSurface::on_add_box_requested(&mut ctx);
    assert!(ctx.registry().is_empty());

    time.advance(0.02);
    sim.tick(&mut ctx, &mut Headless, &mut RecordingAudio::default());
    // Random sizes can be zero; such requests are dropped.
    assert!(ctx.registry().len() <= 2);
    assert!(ctx.pending().is_empty());

    DebugSurface::on_reset_requested(&mut ctx);
    sim.tick(&mut ctx, &mut Headless, &mut RecordingAudio::default());
    assert!(ctx.registry().is_empty());
    assert_eq!(ctx.world().len(), 1);
}

#[test]
fn capacity_limit_rejects_extra_spawns() {
    let (mut ctx, _) = context_with(SimSettings {
        spawn_limit: Some(3),
        ..SimSettings::default()
    });
    for _ in 0..3 {
        ctx.spawn_sphere(0.2, Vec3::Y).unwrap();
    }
    assert_eq!(
        ctx.spawn_sphere(0.2, Vec3::Y),
        Err(SpawnError::CapacityReached { limit: 3 })
    );
    ctx.clear();
    assert!(ctx.spawn_sphere(0.2, Vec3::Y).is_ok());
}

#[test]
fn removing_one_entity_keeps_the_rest() {
    let (mut ctx, _) = context();
    let a = ctx.spawn_sphere(0.2, Vec3::Y).unwrap();
    let b = ctx.spawn_sphere(0.2, Vec3::Y * 2.0).unwrap();
    assert!(ctx.remove(a));
    assert!(!ctx.remove(a));
    assert_eq!(ctx.registry().len(), 1);
    assert!(ctx.registry().get(b).is_some());
    assert_eq!(ctx.world().len(), 2);
}

//! The per-frame simulation cycle and the schedulers that drive it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use bevy::log::info;

use crate::audio::AudioSink;
use crate::context::SimulationContext;
use crate::scene::SceneGraph;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LoopState {
    #[default]
    Idle,
    Running,
    /// Terminal. Reached only through a `CancelToken`.
    Stopped,
}

/// Shared stop flag, checked at the top of every cycle.
#[derive(Clone, Default, Debug)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Camera controller and renderer, seen from the loop.
pub trait Presenter {
    fn update_controls(&mut self, _delta: f32) {}
    fn render(&mut self, _scene: &SceneGraph) {}
}

/// Presenter that draws nothing.
pub struct Headless;

impl Presenter for Headless {}

/// Host-side pacing between cycles.
pub trait FrameScheduler {
    /// Waits (or not) until the next cycle is due. `false` ends the run.
    fn next_frame(&mut self) -> bool;
}

/// Exactly `n` cycles, back to back.
pub struct FixedFrames(pub u64);

impl FrameScheduler for FixedFrames {
    fn next_frame(&mut self) -> bool {
        if self.0 == 0 {
            return false;
        }
        self.0 -= 1;
        true
    }
}

/// Sleeps so cycles start at most once per `interval`. Runs until the loop
/// is cancelled.
pub struct PacedFrames {
    interval: Duration,
    last: Option<Instant>,
}

impl PacedFrames {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    pub fn hz(rate: f64) -> Self {
        Self::new(Duration::from_secs_f64(1.0 / rate))
    }
}

impl FrameScheduler for PacedFrames {
    fn next_frame(&mut self) -> bool {
        if let Some(last) = self.last {
            let due = last + self.interval;
            let now = Instant::now();
            if due > now {
                thread::sleep(due - now);
            }
        }
        self.last = Some(Instant::now());
        true
    }
}

/// What one cycle did.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CycleReport {
    pub delta: f32,
    pub substeps: u32,
    pub hits: usize,
}

pub struct SimulationLoop {
    pub fixed_timestep: f32,
    pub max_substeps: u32,
    state: LoopState,
    cancel: CancelToken,
    frames: u64,
}

impl SimulationLoop {
    pub fn new(fixed_timestep: f32, max_substeps: u32) -> Self {
        Self {
            fixed_timestep,
            max_substeps,
            state: LoopState::Idle,
            cancel: CancelToken::new(),
            frames: 0,
        }
    }

    /// Loop using the context's timestep and substep cap.
    pub fn for_context(ctx: &SimulationContext) -> Self {
        Self::new(ctx.settings().fixed_timestep, ctx.settings().max_substeps)
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// One cycle: queued commands, clock, physics, pose sync, hits,
    /// controls, render. Returns `None` once stopped.
    pub fn tick(
        &mut self,
        ctx: &mut SimulationContext,
        presenter: &mut dyn Presenter,
        audio: &mut dyn AudioSink,
    ) -> Option<CycleReport> {
        if self.state == LoopState::Stopped {
            return None;
        }
        if self.cancel.is_cancelled() {
            info!("simulation stopped after {} frames", self.frames);
            self.state = LoopState::Stopped;
            return None;
        }
        self.state = LoopState::Running;

        ctx.apply_pending();

        let delta = ctx.clock.tick();
        let substeps = ctx
            .world
            .step(self.fixed_timestep, delta, self.max_substeps);
        ctx.registry.sync_visuals(&ctx.world, &mut ctx.scene);
        let hits = ctx.dispatch_hits(audio);

        presenter.update_controls(delta);
        presenter.render(&ctx.scene);

        self.frames += 1;
        Some(CycleReport {
            delta,
            substeps,
            hits,
        })
    }

    /// Ticks until the scheduler runs out of frames or the loop is
    /// cancelled. Returns the number of cycles run.
    pub fn run(
        &mut self,
        ctx: &mut SimulationContext,
        scheduler: &mut dyn FrameScheduler,
        presenter: &mut dyn Presenter,
        audio: &mut dyn AudioSink,
    ) -> u64 {
        let mut cycles = 0;
        while scheduler.next_frame() {
            if self.tick(ctx, presenter, audio).is_none() {
                break;
            }
            cycles += 1;
        }
        cycles
    }
}

impl Default for SimulationLoop {
    fn default() -> Self {
        Self::new(1.0 / 60.0, 3)
    }
}

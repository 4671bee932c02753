//! Rigid-body playground core: a physics world whose bodies are mirrored
//! into a render scene graph once per frame, with collision sounds gated by
//! impact speed.
//!
//! Everything here runs headless. The `tumble-rs` binary drives it from a
//! bevy app.

pub mod audio;
pub mod clock;
pub mod context;
pub mod debug;
pub mod error;
pub mod gate;
pub mod physics;
pub mod registry;
pub mod scene;
pub mod settings;
pub mod sim_loop;
pub mod spawn;

pub use audio::{AudioSink, SilentAudio};
pub use clock::{ManualTime, SimulationClock, TimeSource, WallClock};
pub use context::{Command, SimulationContext};
pub use debug::DebugSurface;
pub use error::SpawnError;
pub use gate::CollisionGate;
pub use registry::{EntityPair, EntityPairId, EntityRegistry};
pub use scene::{Geometry, NodeId, SceneGraph, SurfaceMaterial, VisualProxy};
pub use settings::SimSettings;
pub use sim_loop::{
    CancelToken, CycleReport, FixedFrames, FrameScheduler, Headless, LoopState, PacedFrames,
    Presenter, SimulationLoop,
};
pub use spawn::{ShapeSpec, SharedAssets, SpawnFactory};

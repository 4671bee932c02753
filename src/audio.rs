//! Output side for collision sounds.

use bevy::log::debug;

/// Receives one call per audible collision. Implementations must return
/// immediately; playback happens elsewhere.
pub trait AudioSink {
    fn play(&mut self, intensity: f32);
}

/// Drops every hit, logging it.
#[derive(Default)]
pub struct SilentAudio;

impl AudioSink for SilentAudio {
    fn play(&mut self, intensity: f32) {
        debug!("hit at intensity {intensity:.2}");
    }
}

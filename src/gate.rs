//! Decides which collisions make a sound, and how loud.

use rand::Rng;

/// Impact speed (m/s) a contact needs before it is heard.
pub const DEFAULT_HIT_THRESHOLD: f32 = 1.5;

/// Threshold gate over collision impact speed.
///
/// Bodies resting under gravity keep grazing each other at near-zero speed;
/// without the threshold every one of those grazes would fire a sound.
///
/// The intensity of a triggered hit is uniformly random and ignores the
/// impact speed. This is deliberate: it varies the output, it is not meant
/// to be physically loud-when-fast.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CollisionGate {
    pub threshold: f32,
}

impl Default for CollisionGate {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_HIT_THRESHOLD,
        }
    }
}

impl CollisionGate {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn should_trigger(&self, impact_speed: f32) -> bool {
        impact_speed > self.threshold
    }

    /// Intensity in `[0, 1]`; zero when the gate does not trigger.
    pub fn intensity<R: Rng>(&self, impact_speed: f32, rng: &mut R) -> f32 {
        if self.should_trigger(impact_speed) {
            rng.gen::<f32>()
        } else {
            0.0
        }
    }

    /// `Some(intensity)` for a triggering impact.
    pub fn evaluate<R: Rng>(&self, impact_speed: f32, rng: &mut R) -> Option<f32> {
        self.should_trigger(impact_speed).then(|| rng.gen::<f32>())
    }
}

//! Frame timing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use bevy::log::warn;

/// Monotonic-ish source of elapsed seconds.
pub trait TimeSource: Send + Sync {
    fn elapsed(&self) -> f64;
}

/// Seconds since construction, from `Instant`.
pub struct WallClock {
    start: Instant,
}

impl WallClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for WallClock {
    fn elapsed(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

/// Hand-driven time. Clones share the same reading, so a test can keep one
/// clone and advance the clock owned by a context.
#[derive(Clone, Default)]
pub struct ManualTime(Arc<AtomicU64>);

impl ManualTime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, seconds: f64) {
        self.0.store(seconds.to_bits(), Ordering::Relaxed);
    }

    pub fn advance(&self, seconds: f64) {
        self.set(self.elapsed() + seconds);
    }
}

impl TimeSource for ManualTime {
    fn elapsed(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }
}

/// Turns a `TimeSource` into per-frame deltas that are never negative.
pub struct SimulationClock {
    source: Box<dyn TimeSource>,
    previous: f64,
}

impl SimulationClock {
    /// The first `tick` measures from the source's current reading.
    pub fn new(source: Box<dyn TimeSource>) -> Self {
        let previous = source.elapsed();
        Self { source, previous }
    }

    /// Seconds since the previous tick. A rewinding source yields 0 and the
    /// clock keeps waiting for it to pass the highest reading seen.
    pub fn tick(&mut self) -> f32 {
        let now = self.source.elapsed();
        if now < self.previous || now.is_nan() {
            warn!("time source went backwards ({now} < {})", self.previous);
            return 0.0;
        }
        let delta = now - self.previous;
        self.previous = now;
        delta as f32
    }

    /// Highest reading seen so far.
    pub fn elapsed(&self) -> f64 {
        self.previous
    }
}

impl Default for SimulationClock {
    fn default() -> Self {
        Self::new(Box::new(WallClock::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_is_difference_of_samples() {
        let time = ManualTime::new();
        time.set(1.0);
        let mut clock = SimulationClock::new(Box::new(time.clone()));
        assert_eq!(clock.tick(), 0.0);
        time.advance(0.25);
        assert_eq!(clock.tick(), 0.25);
        time.advance(0.5);
        assert_eq!(clock.tick(), 0.5);
        assert_eq!(clock.elapsed(), 1.75);
    }

    #[test]
    fn rewind_clamps_to_zero() {
        let time = ManualTime::new();
        time.set(5.0);
        let mut clock = SimulationClock::new(Box::new(time.clone()));
        time.set(4.0);
        assert_eq!(clock.tick(), 0.0);
        time.set(4.5);
        assert_eq!(clock.tick(), 0.0);
        time.set(5.5);
        assert_eq!(clock.tick(), 0.5);
    }

    #[test]
    fn wall_clock_moves_forward() {
        let wall = WallClock::new();
        let a = wall.elapsed();
        let b = wall.elapsed();
        assert!(b >= a);
    }
}

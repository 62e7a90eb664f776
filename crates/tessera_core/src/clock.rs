//! # Time Source
//!
//! The container never reads the system clock directly. It asks a [`Clock`]
//! for the current time in milliseconds and derives each tick's elapsed time
//! from the difference with the previous tick.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

/// Monotonic time capability.
pub trait Clock {
    /// Milliseconds since an arbitrary epoch. Must never decrease.
    fn now(&self) -> f64;
}

/// Default clock, counting milliseconds since its creation.
#[derive(Clone, Copy, Debug)]
pub struct MonotonicClock {
    start: Instant,
}

impl MonotonicClock {
    /// Creates a clock whose epoch is the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

/// Clock driven by the host.
///
/// Clones share the same time value, so a host can keep one handle and give
/// another to the container.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    now: Arc<Mutex<f64>>,
}

impl ManualClock {
    /// Creates a clock reading `start` milliseconds.
    #[must_use]
    pub fn new(start: f64) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Moves the clock forward. Negative steps are ignored.
    pub fn advance(&self, millis: f64) {
        if millis > 0.0 {
            *self.now.lock() += millis;
        }
    }
}

impl Clock for ManualClock {
    #[inline]
    fn now(&self) -> f64 {
        *self.now.lock()
    }
}

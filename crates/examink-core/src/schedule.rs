//! Explicit tick scheduling.
//!
//! All timing in the engine is driven by advancing simulated durations
//! through these timers rather than by reading platform clocks, so save
//! cadence and countdown behavior are testable by advancing time directly.

use std::time::Duration;

/// Fires every `period` of accumulated time.
#[derive(Debug, Clone)]
pub struct IntervalTimer {
    period: Duration,
    elapsed: Duration,
}

impl IntervalTimer {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            elapsed: Duration::ZERO,
        }
    }

    /// Advance by `dt`, reporting how many whole periods elapsed.
    pub fn advance(&mut self, dt: Duration) -> u32 {
        if self.period.is_zero() {
            return 0;
        }
        self.elapsed += dt;
        let mut fired = 0;
        while self.elapsed >= self.period {
            self.elapsed -= self.period;
            fired += 1;
        }
        fired
    }

    /// Discard accumulated time.
    pub fn reset(&mut self) {
        self.elapsed = Duration::ZERO;
    }
}

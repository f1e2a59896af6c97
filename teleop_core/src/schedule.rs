//! Fixed-period pacing for the control loop.
//!
//! Ticks are scheduled on an absolute timeline (`next += period`) so small
//! per-cycle jitter does not accumulate into drift. A cycle that finishes
//! after its deadline is counted as an overrun and the timeline is re-based
//! on "now"; missed ticks are skipped, never replayed in a burst, so the loop
//! can run slower than its target but never faster.

use std::time::{Duration, Instant};

use teleop_traits::Clock;

/// What happened while waiting for the next tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Slept until the scheduled instant.
    OnTime,
    /// The deadline had already passed by `behind`.
    Overrun { behind: Duration },
    /// The stop predicate fired during the wait.
    Interrupted,
}

#[derive(Debug, Clone)]
pub struct Pacer {
    period: Duration,
    next: Instant,
    overruns: u64,
}

impl Pacer {
    /// First tick is one period after `start`.
    pub fn new(period: Duration, start: Instant) -> Self {
        Self {
            period,
            next: start + period,
            overruns: 0,
        }
    }

    /// Deadlines missed so far.
    pub fn overruns(&self) -> u64 {
        self.overruns
    }

    /// Block until the next tick or until `interrupted` reports true.
    pub fn wait(&mut self, clock: &dyn Clock, interrupted: &dyn Fn() -> bool) -> Tick {
        let now = clock.now();
        if now > self.next {
            let behind = now - self.next;
            self.overruns += 1;
            self.next = now + self.period;
            return Tick::Overrun { behind };
        }
        if clock.sleep_interruptible(self.next - now, interrupted) {
            return Tick::Interrupted;
        }
        self.next += self.period;
        Tick::OnTime
    }
}

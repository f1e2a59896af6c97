//! Per-cycle latency and fault counters for `--stats`.
//!
//! Accumulated online (Welford) so long sessions stay constant-memory.

use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleStats {
    cycles: u64,
    min_us: u64,
    max_us: u64,
    mean_us: f64,
    m2: f64,
    /// Cycles whose work alone exceeded the period.
    pub missed_deadlines: u64,
    /// Pacer ticks that arrived late.
    pub overruns: u64,
    /// Samples replaced by neutral because they were NaN or infinite.
    pub invalid_samples: u64,
    /// Status lines dropped because the reporter was behind.
    pub dropped_status: u64,
}

impl CycleStats {
    pub fn record(&mut self, latency: Duration, period: Duration) {
        let us = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
        if self.cycles == 0 {
            self.min_us = us;
            self.max_us = us;
        } else {
            self.min_us = self.min_us.min(us);
            self.max_us = self.max_us.max(us);
        }
        self.cycles += 1;
        let x = us as f64;
        let delta = x - self.mean_us;
        self.mean_us += delta / self.cycles as f64;
        self.m2 += delta * (x - self.mean_us);
        if latency > period {
            self.missed_deadlines = self.missed_deadlines.saturating_add(1);
        }
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn min_us(&self) -> u64 {
        self.min_us
    }

    pub fn max_us(&self) -> u64 {
        self.max_us
    }

    pub fn mean_us(&self) -> f64 {
        self.mean_us
    }

    /// Sample standard deviation; 0 with fewer than two cycles.
    pub fn stdev_us(&self) -> f64 {
        if self.cycles > 1 {
            (self.m2 / (self.cycles - 1) as f64).sqrt()
        } else {
            0.0
        }
    }

    /// Human-readable block for stderr.
    pub fn render(&self, period: Duration) -> String {
        format!(
            "\n--- Teleop Stats ---\n\
             Cycles: {}\n\
             Period (us): {}\n\
             Latency min/avg/max/stdev (us): {} / {:.1} / {} / {:.1}\n\
             Missed deadlines (> period): {}\n\
             Pacer overruns: {}\n\
             Invalid samples: {}\n\
             Dropped status lines: {}\n\
             --------------------\n",
            self.cycles,
            period.as_micros(),
            self.min_us,
            self.mean_us,
            self.max_us,
            self.stdev_us(),
            self.missed_deadlines,
            self.overruns,
            self.invalid_samples,
            self.dropped_status,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERIOD: Duration = Duration::from_millis(20);

    #[test]
    fn empty_stats_are_zero() {
        let s = CycleStats::default();
        assert_eq!(s.cycles(), 0);
        assert_eq!(s.stdev_us(), 0.0);
    }

    #[test]
    fn min_mean_max_and_stdev() {
        let mut s = CycleStats::default();
        for us in [100u64, 200, 300] {
            s.record(Duration::from_micros(us), PERIOD);
        }
        assert_eq!(s.min_us(), 100);
        assert_eq!(s.max_us(), 300);
        assert!((s.mean_us() - 200.0).abs() < 1e-9);
        assert!((s.stdev_us() - 100.0).abs() < 1e-9);
        assert_eq!(s.missed_deadlines, 0);
    }

    #[test]
    fn slow_cycles_count_as_missed_deadlines() {
        let mut s = CycleStats::default();
        s.record(Duration::from_millis(25), PERIOD);
        s.record(Duration::from_millis(5), PERIOD);
        assert_eq!(s.missed_deadlines, 1);
        assert!(s.render(PERIOD).contains("Missed deadlines (> period): 1"));
    }
}

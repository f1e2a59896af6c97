//! The fixed-rate control loop: poll → condition → encode → apply.

use std::time::Instant;

use teleop_traits::{Clock, InputSource};
use tracing::{debug, error, info, trace, warn};

use crate::actuator::Actuator;
use crate::config::LoopCfg;
use crate::encoder::{PulsePair, to_pulse_width};
use crate::error::{Report, Result, TeleopError};
use crate::hw_error::map_input_error;
use crate::reporter::StatusReporter;
use crate::schedule::{Pacer, Tick};
use crate::signal::{Channel, CommandValue};
use crate::stats::CycleStats;
use crate::status::{LoopState, StatusLine, StopReason};
use crate::stop::StopSignal;

/// Only the first and then every Nth repeat of a per-cycle warning is logged.
const WARN_EVERY: u64 = 100;

fn should_warn(count: u64) -> bool {
    count == 1 || count % WARN_EVERY == 0
}

/// A command that has been encoded but not yet applied.
struct Pending {
    cmd: PulsePair,
    values: (CommandValue, CommandValue),
}

/// A running teleoperation session.
///
/// Owns the input device and the actuation backend for its whole life.
/// Built with [`TeleopLoop::builder`].
pub struct TeleopLoop {
    input: Box<dyn InputSource>,
    actuator: Box<dyn Actuator>,
    cfg: LoopCfg,
    clock: Box<dyn Clock>,
    state: LoopState,
    cycles: u64,
    last_command: PulsePair,
    last_values: (CommandValue, CommandValue),
    stats: CycleStats,
}

impl core::fmt::Debug for TeleopLoop {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TeleopLoop")
            .field("backend", &self.actuator.kind())
            .field("state", &self.state)
            .field("cycles", &self.cycles)
            .field("last_command", &self.last_command)
            .finish_non_exhaustive()
    }
}

impl TeleopLoop {
    pub(crate) fn from_parts(
        input: Box<dyn InputSource>,
        actuator: Box<dyn Actuator>,
        cfg: LoopCfg,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            input,
            actuator,
            cfg,
            clock,
            state: LoopState::Initializing,
            cycles: 0,
            last_command: PulsePair::NEUTRAL,
            last_values: (CommandValue::NEUTRAL, CommandValue::NEUTRAL),
            stats: CycleStats::default(),
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Cycles whose command reached the backend.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn last_command(&self) -> PulsePair {
        self.last_command
    }

    pub fn stats(&self) -> &CycleStats {
        &self.stats
    }

    pub fn config(&self) -> &LoopCfg {
        &self.cfg
    }

    fn set_state(&mut self, next: LoopState) {
        if self.state != next {
            info!(from = %self.state, to = %next, "loop state");
            self.state = next;
        }
    }

    /// One control cycle.
    ///
    /// A NaN or infinite axis reading commands neutral on that channel for
    /// this cycle only; it is counted but never ends the session. Input and
    /// transport failures are returned as `TeleopError` reports.
    pub fn step(&mut self) -> Result<PulsePair> {
        let next = self.sample()?;
        self.commit(next)
    }

    /// Poll the input and encode this cycle's command without touching the
    /// backend.
    fn sample(&mut self) -> Result<Pending> {
        let sample = self
            .input
            .poll()
            .map_err(|e| Report::new(map_input_error(&*e)))?;

        let steering = self.condition(Channel::Steering, sample.steering, self.cfg.invert_steering);
        let throttle = self.condition(Channel::Throttle, sample.throttle, self.cfg.invert_throttle);
        Ok(Pending {
            cmd: PulsePair::new(to_pulse_width(steering), to_pulse_width(throttle)),
            values: (steering, throttle),
        })
    }

    fn commit(&mut self, next: Pending) -> Result<PulsePair> {
        let cmd = next.cmd;
        self.actuator.apply(cmd)?;
        self.cycles += 1;
        self.last_command = cmd;
        self.last_values = next.values;
        trace!(
            cycle = self.cycles,
            steering_us = cmd.steering.as_us(),
            throttle_us = cmd.throttle.as_us(),
            "applied"
        );
        Ok(cmd)
    }

    fn condition(&mut self, channel: Channel, raw: f32, invert: bool) -> CommandValue {
        match channel.condition(raw, self.cfg.deadzone, invert) {
            Ok(v) => v,
            Err(e) => {
                self.stats.invalid_samples += 1;
                if should_warn(self.stats.invalid_samples) {
                    warn!(
                        %channel,
                        error = %e,
                        count = self.stats.invalid_samples,
                        "invalid axis sample; commanding neutral for this cycle"
                    );
                }
                CommandValue::NEUTRAL
            }
        }
    }

    /// Status for the most recent applied command.
    pub fn status_line(&self) -> StatusLine {
        StatusLine::new(
            self.cycles,
            self.last_command,
            self.last_values.0,
            self.last_values.1,
        )
    }

    /// Run cycles at `loop_hz` until stopped, a fault occurs, or
    /// `max_cycles` commands have been applied.
    ///
    /// The stop flag is checked before every cycle, again between polling
    /// and applying, and throughout the idle wait. A stop that lands while
    /// the input is being read discards that cycle's command, so the next
    /// thing the backend sees is neutral from [`shutdown`](Self::shutdown).
    pub fn run_until_stopped(
        &mut self,
        stop: &StopSignal,
        reporter: Option<&StatusReporter>,
        max_cycles: Option<u64>,
    ) -> StopReason {
        self.set_state(LoopState::Running);
        let period = self.cfg.period();
        let status_period = self.cfg.status_period();
        let mut pacer = Pacer::new(period, self.clock.now());
        let mut last_status: Option<Instant> = None;
        let interrupted = || stop.is_triggered();

        loop {
            if stop.is_triggered() {
                info!(cycles = self.cycles, "stop requested");
                return StopReason::Operator;
            }
            if max_cycles.is_some_and(|m| self.cycles >= m) {
                info!(cycles = self.cycles, "cycle limit reached");
                return StopReason::CycleLimit;
            }

            let started = self.clock.now();
            let next = match self.sample() {
                Ok(next) => next,
                Err(e) => return self.fault(&e),
            };
            if stop.is_triggered() {
                info!(cycles = self.cycles, "stop requested; discarding this cycle's command");
                return StopReason::Operator;
            }
            if let Err(e) = self.commit(next) {
                return self.fault(&e);
            }

            let now = self.clock.now();
            if let Some(r) = reporter
                && last_status.is_none_or(|t| now.saturating_duration_since(t) >= status_period)
            {
                if !r.offer(self.status_line()) {
                    self.stats.dropped_status += 1;
                }
                last_status = Some(now);
            }
            self.stats.record(now.saturating_duration_since(started), period);

            match pacer.wait(self.clock.as_ref(), &interrupted) {
                Tick::OnTime => {}
                Tick::Interrupted => {
                    info!(cycles = self.cycles, "stop requested");
                    return StopReason::Operator;
                }
                Tick::Overrun { behind } => {
                    self.stats.overruns = pacer.overruns();
                    if should_warn(self.stats.overruns) {
                        warn!(
                            behind_us = u64::try_from(behind.as_micros()).unwrap_or(u64::MAX),
                            overruns = self.stats.overruns,
                            "control cycle overran its period; running below target rate"
                        );
                    }
                }
            }
        }
    }

    fn fault(&self, e: &Report) -> StopReason {
        let err = classify(e);
        error!(error = %err, cycle = self.cycles, "control cycle failed");
        StopReason::Fault(err)
    }

    /// Command neutral and release the backend.
    ///
    /// Runs whatever ended Running; a failure here is logged and reported
    /// as `false`, never raised.
    pub fn shutdown(&mut self) -> bool {
        self.set_state(LoopState::Stopping);
        let ok = match self.actuator.neutral_and_stop() {
            Ok(()) => {
                info!(backend = %self.actuator.kind(), "neutral commanded; backend released");
                true
            }
            Err(e) => {
                error!(backend = %self.actuator.kind(), error = %e, "fail-safe neutral could not be confirmed");
                false
            }
        };
        debug!(released = self.actuator.is_released(), "shutdown sequence finished");
        self.set_state(LoopState::Stopped);
        ok
    }
}

fn classify(e: &Report) -> TeleopError {
    e.downcast_ref::<TeleopError>()
        .cloned()
        .unwrap_or_else(|| TeleopError::TransportFailure(format!("{e:#}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{ActuatorCall, RecordingActuator, ScriptedInput};
    use teleop_traits::AxisSample;
    use teleop_traits::clock::TestClock;

    fn build(input: ScriptedInput, act: RecordingActuator, cfg: LoopCfg) -> TeleopLoop {
        TeleopLoop::builder()
            .with_input(input)
            .with_actuator(act)
            .with_config(cfg)
            .with_clock(TestClock::new())
            .build()
            .expect("build")
    }

    #[test]
    fn step_encodes_conditioned_sample() {
        let act = RecordingActuator::default();
        let cfg = LoopCfg::default();
        let mut lp = build(ScriptedInput::constant(0.05, 0.8), act.clone(), cfg);
        let cmd = lp.step().expect("step");
        // Steering inside the deadzone; throttle inverted by default.
        assert_eq!(cmd.steering.as_us(), 1500);
        assert_eq!(cmd.throttle.as_us(), 1100);
        assert_eq!(act.applied(), vec![cmd]);
    }

    #[test]
    fn nan_sample_is_neutral_for_one_cycle() {
        let act = RecordingActuator::default();
        let input = ScriptedInput::new(vec![
            AxisSample::new(f32::NAN, 0.0),
            AxisSample::new(0.5, f32::INFINITY),
            AxisSample::new(0.5, 0.0),
        ]);
        let mut lp = build(input, act.clone(), LoopCfg::default());
        for _ in 0..3 {
            lp.step().expect("invalid samples never fail a cycle");
        }
        let applied = act.applied();
        assert_eq!(applied[0].steering.as_us(), 1500);
        assert_eq!(applied[1].steering.as_us(), 1750);
        assert_eq!(applied[1].throttle.as_us(), 1500);
        assert_eq!(applied[2].steering.as_us(), 1750);
        assert_eq!(lp.stats().invalid_samples, 2);
    }

    #[test]
    fn transport_failure_ends_running_and_shutdown_still_runs() {
        let act = RecordingActuator::default().fail_apply_at(3);
        let mut lp = build(ScriptedInput::constant(0.0, 0.0), act.clone(), LoopCfg::default());
        let reason = lp.run_until_stopped(&StopSignal::new(), None, None);
        assert!(matches!(reason, StopReason::Fault(TeleopError::TransportFailure(_))));
        assert_eq!(lp.cycles(), 3);
        assert!(lp.shutdown());
        assert_eq!(lp.state(), LoopState::Stopped);
        assert_eq!(act.calls().last(), Some(&ActuatorCall::NeutralAndStop));
    }

    #[test]
    fn input_failure_is_a_fault() {
        let act = RecordingActuator::default();
        let input = ScriptedInput::constant(0.0, 0.0).fail_at(2);
        let mut lp = build(input, act, LoopCfg::default());
        let reason = lp.run_until_stopped(&StopSignal::new(), None, None);
        assert!(matches!(reason, StopReason::Fault(TeleopError::Input(_))));
    }

    #[test]
    fn pre_triggered_stop_applies_nothing() {
        let act = RecordingActuator::default();
        let mut lp = build(ScriptedInput::constant(0.3, 0.3), act.clone(), LoopCfg::default());
        let stop = StopSignal::new();
        stop.trigger();
        assert_eq!(lp.run_until_stopped(&stop, None, Some(10)), StopReason::Operator);
        assert!(act.applied().is_empty());
    }

    #[test]
    fn cycle_limit_is_exact() {
        let act = RecordingActuator::default();
        let mut lp = build(ScriptedInput::constant(0.3, 0.3), act.clone(), LoopCfg::default());
        assert_eq!(
            lp.run_until_stopped(&StopSignal::new(), None, Some(7)),
            StopReason::CycleLimit
        );
        assert_eq!(act.applied().len(), 7);
        assert_eq!(lp.stats().cycles(), 7);
    }

    #[test]
    fn stop_raised_during_poll_discards_the_polled_command() {
        let act = RecordingActuator::default();
        let stop = StopSignal::new();
        let input = ScriptedInput::constant(1.0, -1.0).stop_after(3, stop.clone());
        let mut lp = build(input, act.clone(), LoopCfg::default());
        assert_eq!(lp.run_until_stopped(&stop, None, None), StopReason::Operator);
        assert_eq!(lp.cycles(), 2);
        assert!(lp.shutdown());
        let calls = act.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[2], ActuatorCall::NeutralAndStop);
    }
}

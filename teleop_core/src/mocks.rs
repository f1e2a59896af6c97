//! Test and helper mocks for teleop_core.
//!
//! Every spy shares its recorded state through an `Arc`, so a clone kept by
//! a test still observes what the loop did after the original was moved in.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use teleop_traits::{AxisSample, BoxError, InputSource, PwmOutput, SerialLink};

use crate::actuator::{Actuator, BackendKind};
use crate::encoder::PulsePair;
use crate::error::{Report, Result, TeleopError};
use crate::stop::StopSignal;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One call observed on a [`SpyPwm`].
#[derive(Debug, Clone, PartialEq)]
pub enum PinEvent {
    Start { duty_pct: f64 },
    Duty { duty_pct: f64 },
    Stop,
}

/// PWM output that records every call.
#[derive(Debug, Clone, Default)]
pub struct SpyPwm {
    events: Arc<Mutex<Vec<PinEvent>>>,
    fail_start: bool,
}

impl SpyPwm {
    /// A pin whose `start` fails, as if another process had claimed it.
    pub fn failing_start() -> Self {
        Self {
            fail_start: true,
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<PinEvent> {
        lock(&self.events).clone()
    }

    /// Duty values written after start, oldest first.
    pub fn duty_history(&self) -> Vec<f64> {
        lock(&self.events)
            .iter()
            .filter_map(|e| match e {
                PinEvent::Duty { duty_pct } => Some(*duty_pct),
                _ => None,
            })
            .collect()
    }
}

impl PwmOutput for SpyPwm {
    fn start(&mut self, _frequency_hz: f64, duty_percent: f64) -> std::result::Result<(), BoxError> {
        if self.fail_start {
            return Err(Box::new(std::io::Error::other("pin busy")));
        }
        lock(&self.events).push(PinEvent::Start {
            duty_pct: duty_percent,
        });
        Ok(())
    }

    fn set_duty_cycle(&mut self, duty_percent: f64) -> std::result::Result<(), BoxError> {
        lock(&self.events).push(PinEvent::Duty {
            duty_pct: duty_percent,
        });
        Ok(())
    }

    fn stop(&mut self) -> std::result::Result<(), BoxError> {
        lock(&self.events).push(PinEvent::Stop);
        Ok(())
    }
}

#[derive(Debug, Default)]
struct SerialState {
    frames: Vec<String>,
    closed: bool,
    dead: bool,
    die_after: Option<usize>,
}

/// Serial link that records frames and can be made to fail on write.
#[derive(Debug, Clone, Default)]
pub struct SpySerial {
    state: Arc<Mutex<SerialState>>,
}

impl SpySerial {
    /// Accept `n` frames, then fail every later write as if unplugged.
    pub fn die_after(n: usize) -> Self {
        let spy = Self::default();
        lock(&spy.state).die_after = Some(n);
        spy
    }

    pub fn frames(&self) -> Vec<String> {
        lock(&self.state).frames.clone()
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.state).closed
    }

    pub fn set_dead(&self, dead: bool) {
        lock(&self.state).dead = dead;
    }
}

impl SerialLink for SpySerial {
    fn write_all(&mut self, bytes: &[u8]) -> std::result::Result<(), BoxError> {
        let mut st = lock(&self.state);
        if st.die_after.is_some_and(|n| st.frames.len() >= n) {
            st.dead = true;
        }
        if st.dead || st.closed {
            return Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "device disconnected",
            )));
        }
        st.frames.push(String::from_utf8_lossy(bytes).into_owned());
        Ok(())
    }

    fn close(&mut self) -> std::result::Result<(), BoxError> {
        lock(&self.state).closed = true;
        Ok(())
    }
}

/// Input that replays a fixed list of samples, repeating the last one.
pub struct ScriptedInput {
    samples: Vec<AxisSample>,
    available: bool,
    polls: Arc<AtomicUsize>,
    fail_at: Option<usize>,
    stop_after: Option<(usize, StopSignal)>,
}

impl ScriptedInput {
    pub fn new(samples: Vec<AxisSample>) -> Self {
        Self {
            samples,
            available: true,
            polls: Arc::new(AtomicUsize::new(0)),
            fail_at: None,
            stop_after: None,
        }
    }

    /// Same sample on every poll.
    pub fn constant(steering: f32, throttle: f32) -> Self {
        Self::new(vec![AxisSample::new(steering, throttle)])
    }

    /// No device attached.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new(Vec::new())
        }
    }

    /// The poll with this zero-based index fails.
    pub fn fail_at(mut self, poll: usize) -> Self {
        self.fail_at = Some(poll);
        self
    }

    /// Trigger `stop` from inside the `n`th poll (1-based), like an operator
    /// pressing Ctrl+C while the gamepad is being read.
    pub fn stop_after(mut self, n: usize, stop: StopSignal) -> Self {
        self.stop_after = Some((n, stop));
        self
    }

    /// Shared poll counter; stays readable after the input is moved.
    pub fn polls(&self) -> Arc<AtomicUsize> {
        self.polls.clone()
    }
}

impl InputSource for ScriptedInput {
    fn is_available(&mut self) -> bool {
        self.available
    }

    fn poll(&mut self) -> std::result::Result<AxisSample, BoxError> {
        let idx = self.polls.fetch_add(1, Ordering::SeqCst);
        if self.fail_at == Some(idx) {
            return Err(Box::new(std::io::Error::other("gamepad read failed")));
        }
        if let Some((n, stop)) = &self.stop_after
            && idx + 1 >= *n
        {
            stop.trigger();
        }
        let sample = self
            .samples
            .get(idx)
            .or_else(|| self.samples.last())
            .copied()
            .unwrap_or_else(|| AxisSample::new(0.0, 0.0));
        Ok(sample)
    }

    fn describe(&self) -> String {
        "scripted input".to_string()
    }
}

/// What a [`RecordingActuator`] was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActuatorCall {
    Apply(PulsePair),
    NeutralAndStop,
}

/// Backend-agnostic actuator that records calls in order.
#[derive(Debug, Clone)]
pub struct RecordingActuator {
    kind: BackendKind,
    calls: Arc<Mutex<Vec<ActuatorCall>>>,
    fail_apply_at: Option<usize>,
    released: bool,
}

impl Default for RecordingActuator {
    fn default() -> Self {
        Self::new(BackendKind::SerialBridge)
    }
}

impl RecordingActuator {
    pub fn new(kind: BackendKind) -> Self {
        Self {
            kind,
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_apply_at: None,
            released: false,
        }
    }

    /// The apply with this zero-based index fails with a transport error.
    pub fn fail_apply_at(mut self, n: usize) -> Self {
        self.fail_apply_at = Some(n);
        self
    }

    pub fn calls(&self) -> Vec<ActuatorCall> {
        lock(&self.calls).clone()
    }

    /// Only the applied pulse pairs.
    pub fn applied(&self) -> Vec<PulsePair> {
        lock(&self.calls)
            .iter()
            .filter_map(|c| match c {
                ActuatorCall::Apply(p) => Some(*p),
                ActuatorCall::NeutralAndStop => None,
            })
            .collect()
    }
}

impl Actuator for RecordingActuator {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn apply(&mut self, cmd: PulsePair) -> Result<()> {
        let mut calls = lock(&self.calls);
        let applied = calls
            .iter()
            .filter(|c| matches!(c, ActuatorCall::Apply(_)))
            .count();
        if self.fail_apply_at == Some(applied) {
            return Err(Report::new(TeleopError::TransportFailure(
                "write failed".to_string(),
            )));
        }
        calls.push(ActuatorCall::Apply(cmd));
        Ok(())
    }

    fn neutral_and_stop(&mut self) -> Result<()> {
        if !self.released {
            self.released = true;
            lock(&self.calls).push(ActuatorCall::NeutralAndStop);
        }
        Ok(())
    }

    fn is_released(&self) -> bool {
        self.released
    }
}

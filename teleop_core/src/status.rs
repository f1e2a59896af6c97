//! Loop lifecycle, stop reasons and the operator status line.

use crate::encoder::{PulsePair, PulseWidth};
use crate::error::TeleopError;
use crate::signal::CommandValue;
use crate::stats::CycleStats;

/// Lifecycle of a control session.
///
/// Idle → Initializing → Running → Stopping → Stopped. An initialization
/// failure skips Running; Stopping is entered from Running on every exit
/// path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Initializing,
    Running,
    Stopping,
    Stopped,
}

impl LoopState {
    pub const fn name(self) -> &'static str {
        match self {
            LoopState::Idle => "idle",
            LoopState::Initializing => "initializing",
            LoopState::Running => "running",
            LoopState::Stopping => "stopping",
            LoopState::Stopped => "stopped",
        }
    }
}

impl core::fmt::Display for LoopState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Why Running ended.
#[derive(Debug, Clone, PartialEq)]
pub enum StopReason {
    /// Interrupt from the operator.
    Operator,
    /// The configured cycle budget ran out.
    CycleLimit,
    /// Input or transport failed mid-run.
    Fault(TeleopError),
}

impl StopReason {
    /// Operator stops and cycle limits are clean; faults are not.
    pub fn is_clean(&self) -> bool {
        !matches!(self, StopReason::Fault(_))
    }
}

/// One status sample for the operator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusLine {
    pub cycle: u64,
    pub steering: PulseWidth,
    pub steering_value: CommandValue,
    pub throttle: PulseWidth,
    pub throttle_value: CommandValue,
}

impl StatusLine {
    pub fn new(cycle: u64, pulses: PulsePair, steering: CommandValue, throttle: CommandValue) -> Self {
        Self {
            cycle,
            steering: pulses.steering,
            steering_value: steering,
            throttle: pulses.throttle,
            throttle_value: throttle,
        }
    }
}

impl core::fmt::Display for StatusLine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "Steer: {}µs ({:+.2})  |  Throttle: {}µs ({:+.2})",
            self.steering.as_us(),
            self.steering_value.get(),
            self.throttle.as_us(),
            self.throttle_value.get()
        )
    }
}

/// Outcome of a completed session.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub reason: StopReason,
    pub cycles: u64,
    /// Last pair handed to the backend before shutdown began.
    pub last_command: PulsePair,
    /// Whether the neutral-and-release sequence reported success.
    pub fail_safe_ok: bool,
    pub stats: CycleStats,
}

impl RunSummary {
    pub fn is_clean(&self) -> bool {
        self.reason.is_clean()
    }
}

use teleop_traits::{Clock, InputSource};
use tracing::{error, info};

use crate::actuator::Actuator;
use crate::config::LoopCfg;
use crate::control::TeleopLoop;
use crate::error::{Report, Result, TeleopError};
use crate::reporter::StatusReporter;
use crate::status::{LoopState, RunSummary};
use crate::stop::StopSignal;

/// Session options that are not part of the loop config itself.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub cfg: LoopCfg,
    /// Stop cleanly after this many applied cycles.
    pub max_cycles: Option<u64>,
}

fn transition(from: LoopState, to: LoopState) {
    info!(from = %from, to = %to, "loop state");
}

/// Run one complete session.
///
/// Initialization checks the input device first and only then calls
/// `open_backend`, so a missing gamepad never touches the hardware. Any
/// initialization error is returned as-is and the loop never reaches
/// Running. Once Running has been entered, the backend is always driven to
/// neutral and released before this returns, whatever ended the loop; a
/// mid-run fault comes back as [`StopReason::Fault`](crate::StopReason)
/// inside the summary.
pub fn run<I, A, F, C>(
    mut input: I,
    open_backend: F,
    opts: RunOptions,
    clock: C,
    stop: &StopSignal,
    reporter: Option<&StatusReporter>,
) -> Result<RunSummary>
where
    I: InputSource + 'static,
    A: Actuator + 'static,
    F: FnOnce() -> Result<A>,
    C: Clock + 'static,
{
    transition(LoopState::Idle, LoopState::Initializing);

    if let Err(e) = opts.cfg.validate() {
        transition(LoopState::Initializing, LoopState::Stopped);
        return Err(Report::new(TeleopError::Config(e.to_string())));
    }

    if !input.is_available() {
        error!("no input device detected");
        transition(LoopState::Initializing, LoopState::Stopped);
        return Err(Report::new(TeleopError::NoInputDevice));
    }
    info!(device = %input.describe(), "input device ready");

    let actuator = match open_backend() {
        Ok(a) => a,
        Err(e) => {
            error!(error = %e, "actuation backend failed to initialize");
            transition(LoopState::Initializing, LoopState::Stopped);
            return Err(e);
        }
    };
    info!(backend = %actuator.kind(), "actuation backend ready");

    let mut teleop = TeleopLoop::builder()
        .with_input(input)
        .with_actuator(actuator)
        .with_config(opts.cfg)
        .with_clock(clock)
        .build()?;

    let reason = teleop.run_until_stopped(stop, reporter, opts.max_cycles);
    let fail_safe_ok = teleop.shutdown();

    let summary = RunSummary {
        reason,
        cycles: teleop.cycles(),
        last_command: teleop.last_command(),
        fail_safe_ok,
        stats: teleop.stats().clone(),
    };
    info!(
        cycles = summary.cycles,
        clean = summary.is_clean(),
        fail_safe_ok,
        "session finished"
    );
    Ok(summary)
}

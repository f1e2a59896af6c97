//! Drive session: config overrides, device assembly, and operator output.

use std::time::Duration;

use eyre::WrapErr;
use serde_json::json;
use teleop_config::{AxisName, Config};
use teleop_core::hw_error::map_open_error;
use teleop_core::{
    Actuator, BackendCfg, BackendKind, LoopCfg, PwmBackendCfg, PwmGpioBackend, RunOptions,
    RunSummary, SerialBackendCfg, SerialBridgeBackend, StatusLine, StatusReporter, StopReason,
    StopSignal, TeleopError,
};
use teleop_hardware::HwError;
use teleop_traits::{AxisSample, InputSource, MonotonicClock};
use tracing::{info, warn};

use crate::cli::DriveArgs;
use crate::rt::setup_rt_once;

/// Status lines buffered between the loop and the terminal.
const STATUS_QUEUE: usize = 4;

pub fn apply_overrides(cfg: &mut Config, args: &DriveArgs) {
    if let Some(b) = args.backend {
        cfg.backend.kind = b.into();
    }
    if let Some(p) = args.steer_pin {
        cfg.pwm.steer_pin = p;
    }
    if let Some(p) = args.throttle_pin {
        cfg.pwm.throttle_pin = p;
    }
    if let Some(port) = &args.port {
        cfg.serial.port.clone_from(port);
    }
    if let Some(baud) = args.baud {
        cfg.serial.baud = baud;
    }
    if let Some(dz) = args.deadzone {
        cfg.control.deadzone = dz;
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name).is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

fn env_axis(name: &str) -> eyre::Result<Option<f32>> {
    match std::env::var(name) {
        Ok(v) => v
            .trim()
            .parse::<f32>()
            .map(Some)
            .wrap_err_with(|| format!("{name} must be a number, got {v:?}")),
        Err(_) => Ok(None),
    }
}

/// `TELEOP_SIM_INPUT=1` alone selects a centered simulated stick.
fn simulation_requested() -> bool {
    [
        "TELEOP_SIM_INPUT",
        "TELEOP_SIM_STEER",
        "TELEOP_SIM_THROTTLE",
        "TELEOP_SIM_NO_DEVICE",
    ]
    .iter()
    .any(|k| std::env::var_os(k).is_some())
}

fn open_simulated_input() -> eyre::Result<Box<dyn InputSource>> {
    if env_flag("TELEOP_SIM_NO_DEVICE") {
        return Ok(Box::new(teleop_hardware::SimulatedInput::disconnected()));
    }
    let steering = env_axis("TELEOP_SIM_STEER")?.unwrap_or(0.0);
    let throttle = env_axis("TELEOP_SIM_THROTTLE")?.unwrap_or(0.0);
    Ok(Box::new(teleop_hardware::SimulatedInput::new(AxisSample::new(
        steering, throttle,
    ))))
}

#[cfg(feature = "gamepad")]
fn open_input(cfg: &Config) -> eyre::Result<Box<dyn InputSource>> {
    use teleop_hardware::gamepad::{GamepadInput, StickAxis};

    fn stick(a: AxisName) -> StickAxis {
        match a {
            AxisName::LeftStickX => StickAxis::LeftX,
            AxisName::LeftStickY => StickAxis::LeftY,
            AxisName::RightStickX => StickAxis::RightX,
            AxisName::RightStickY => StickAxis::RightY,
        }
    }

    if simulation_requested() {
        return open_simulated_input();
    }
    let pad = GamepadInput::new(stick(cfg.input.steer_axis), stick(cfg.input.throttle_axis))
        .map_err(|e| eyre::Report::new(TeleopError::Input(e.to_string())))
        .wrap_err("initialize gamepad subsystem")?;
    Ok(Box::new(pad))
}

/// Without gamepad support there is no real device to find; only an
/// explicitly requested simulation counts as an input.
#[cfg(not(feature = "gamepad"))]
fn open_input(cfg: &Config) -> eyre::Result<Box<dyn InputSource>> {
    if !simulation_requested() {
        warn!("built without gamepad support and no simulated input requested");
        return Ok(Box::new(teleop_hardware::SimulatedInput::disconnected()));
    }
    if cfg.input.steer_axis != AxisName::LeftStickX || cfg.input.throttle_axis != AxisName::LeftStickY {
        info!("[input] axis mapping only applies to real gamepads");
    }
    open_simulated_input()
}

/// A resource the backend could not claim becomes `BackendUnavailable`.
fn claim_error(backend: BackendKind, e: HwError) -> eyre::Report {
    if e.is_claim_failure() {
        warn!(%backend, error = %e, "backend resource is held elsewhere or not accessible");
    }
    eyre::Report::new(map_open_error(backend, &e))
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
fn open_pwm(
    steer_pin: u8,
    throttle_pin: u8,
    pwm: PwmBackendCfg,
    clock: MonotonicClock,
) -> eyre::Result<Box<dyn Actuator>> {
    use teleop_hardware::gpio_pwm::GpioPwm;
    let steering = GpioPwm::open(steer_pin).map_err(|e| claim_error(BackendKind::PwmGpio, e))?;
    let throttle = GpioPwm::open(throttle_pin).map_err(|e| claim_error(BackendKind::PwmGpio, e))?;
    Ok(Box::new(PwmGpioBackend::start(steering, throttle, pwm, clock)?))
}

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
fn open_pwm(
    steer_pin: u8,
    throttle_pin: u8,
    pwm: PwmBackendCfg,
    clock: MonotonicClock,
) -> eyre::Result<Box<dyn Actuator>> {
    use teleop_hardware::SimulatedPwm;
    if env_flag("TELEOP_SIM_BACKEND_BUSY") {
        return Err(claim_error(
            BackendKind::PwmGpio,
            HwError::Busy(format!("GPIO{steer_pin} is already in use")),
        ));
    }
    let steering = SimulatedPwm::new(steer_pin);
    let throttle = SimulatedPwm::new(throttle_pin);
    Ok(Box::new(PwmGpioBackend::start(steering, throttle, pwm, clock)?))
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
fn open_serial(
    port: &str,
    baud: u32,
    read_timeout_ms: u64,
    serial: SerialBackendCfg,
    clock: MonotonicClock,
) -> eyre::Result<Box<dyn Actuator>> {
    use teleop_hardware::uart::UartLink;
    let link = UartLink::open(port, baud, Duration::from_millis(read_timeout_ms))
        .map_err(|e| claim_error(BackendKind::SerialBridge, e))?;
    Ok(Box::new(SerialBridgeBackend::connect(link, serial, clock)))
}

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
fn open_serial(
    port: &str,
    baud: u32,
    read_timeout_ms: u64,
    serial: SerialBackendCfg,
    clock: MonotonicClock,
) -> eyre::Result<Box<dyn Actuator>> {
    use teleop_hardware::SimulatedSerial;
    if env_flag("TELEOP_SIM_BACKEND_BUSY") {
        return Err(claim_error(
            BackendKind::SerialBridge,
            HwError::Busy(format!("{port} is held by another process")),
        ));
    }
    tracing::debug!(
        port,
        baud,
        read_timeout = ?Duration::from_millis(read_timeout_ms),
        "opening simulated serial link"
    );
    Ok(Box::new(SerialBridgeBackend::connect(
        SimulatedSerial::new(port),
        serial,
        clock,
    )))
}

fn open_backend(cfg: &BackendCfg, clock: MonotonicClock) -> eyre::Result<Box<dyn Actuator>> {
    match cfg {
        BackendCfg::PwmGpio {
            steer_pin,
            throttle_pin,
            pwm,
        } => {
            info!(steer_pin, throttle_pin, frequency_hz = pwm.frequency_hz, "opening pwm-gpio backend");
            open_pwm(*steer_pin, *throttle_pin, pwm.clone(), clock)
        }
        BackendCfg::SerialBridge {
            port,
            baud,
            read_timeout_ms,
            serial,
        } => {
            info!(port = %port, baud, "opening serial-bridge backend");
            open_serial(port, *baud, *read_timeout_ms, serial.clone(), clock)
        }
    }
}

pub fn status_json(line: &StatusLine) -> serde_json::Value {
    json!({
        "type": "status",
        "cycle": line.cycle,
        "steer_us": line.steering.as_us(),
        "steer": line.steering_value.get(),
        "throttle_us": line.throttle.as_us(),
        "throttle": line.throttle_value.get(),
    })
}

fn reason_name(r: &StopReason) -> &'static str {
    match r {
        StopReason::Operator => "operator",
        StopReason::CycleLimit => "cycle_limit",
        StopReason::Fault(_) => "fault",
    }
}

fn summary_json(s: &RunSummary) -> serde_json::Value {
    json!({
        "type": "summary",
        "reason": reason_name(&s.reason),
        "cycles": s.cycles,
        "fail_safe_ok": s.fail_safe_ok,
        "last_steer_us": s.last_command.steering.as_us(),
        "last_throttle_us": s.last_command.throttle.as_us(),
    })
}

fn stats_json(s: &RunSummary, loop_cfg: &LoopCfg) -> serde_json::Value {
    let st = &s.stats;
    json!({
        "type": "stats",
        "cycles": st.cycles(),
        "period_us": u64::try_from(loop_cfg.period().as_micros()).unwrap_or(u64::MAX),
        "latency_us": {
            "min": st.min_us(),
            "avg": st.mean_us(),
            "max": st.max_us(),
            "stdev": st.stdev_us(),
        },
        "missed_deadlines": st.missed_deadlines,
        "overruns": st.overruns,
        "invalid_samples": st.invalid_samples,
        "dropped_status": st.dropped_status,
    })
}

/// Run a full drive session. A mid-run fault is returned as an error after
/// the fail-safe shutdown has completed.
pub fn run_drive(cfg: &Config, args: &DriveArgs, json: bool, stop: &StopSignal) -> eyre::Result<RunSummary> {
    if args.rt {
        setup_rt_once(args.rt_prio);
    }

    let loop_cfg = LoopCfg::from(cfg);
    let backend_cfg = BackendCfg::from(cfg);
    let input = open_input(cfg)?;
    let clock = MonotonicClock::new();

    let reporter = StatusReporter::spawn(STATUS_QUEUE, move |line| {
        if json {
            println!("{}", status_json(line));
        } else {
            println!("{line}");
        }
    });

    let result = teleop_core::run(
        input,
        || open_backend(&backend_cfg, clock),
        RunOptions {
            cfg: loop_cfg.clone(),
            max_cycles: args.max_cycles,
        },
        clock,
        stop,
        Some(&reporter),
    );
    // Join the reporter so every queued line is out before the summary.
    drop(reporter);
    let summary = result?;

    if args.stats {
        if json {
            println!("{}", stats_json(&summary, &loop_cfg));
        } else {
            eprint!("{}", summary.stats.render(loop_cfg.period()));
        }
    }
    if json {
        println!("{}", summary_json(&summary));
    } else {
        println!(
            "Stopped ({}) after {} cycles; outputs at neutral{}",
            reason_name(&summary.reason),
            summary.cycles,
            if summary.fail_safe_ok { "" } else { " (unconfirmed)" }
        );
    }
    if !summary.fail_safe_ok {
        warn!("neutral could not be confirmed on the backend; check the vehicle before approaching");
    }

    if let StopReason::Fault(e) = &summary.reason {
        return Err(eyre::Report::new(e.clone()).wrap_err("control loop stopped on a fault"));
    }
    Ok(summary)
}

/// Validate config and probe the input device without opening a backend.
pub fn self_check(cfg: &Config, json: bool) -> eyre::Result<()> {
    let mut input = open_input(cfg)?;
    if !input.is_available() {
        return Err(eyre::Report::new(TeleopError::NoInputDevice));
    }
    let device = input.describe();
    let backend = BackendCfg::from(cfg).kind();
    let loop_cfg = LoopCfg::from(cfg);
    if json {
        println!(
            "{}",
            json!({
                "type": "self_check",
                "ok": true,
                "input": device,
                "backend": backend.name(),
                "loop_hz": loop_cfg.loop_hz,
                "status_hz": loop_cfg.status_hz,
            })
        );
    } else {
        println!("Self-check OK");
        println!("  input:   {device}");
        println!("  backend: {backend}");
        println!("  loop:    {} Hz (status {} Hz)", loop_cfg.loop_hz, loop_cfg.status_hz);
    }
    Ok(())
}

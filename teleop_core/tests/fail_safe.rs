//! Every exit from Running must leave the actuators at neutral before the
//! physical resource is released.
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use rstest::rstest;
use teleop_core::mocks::{PinEvent, ScriptedInput, SpyPwm, SpySerial};
use teleop_core::{
    PulsePair, PwmBackendCfg, PwmGpioBackend, RunOptions, SerialBackendCfg, SerialBridgeBackend,
    StopReason, StopSignal, TeleopError, run,
};
use teleop_traits::Clock;
use teleop_traits::clock::TestClock;

const NEUTRAL_FRAME: &str = "S1500 T1500\n";

fn opts(max_cycles: Option<u64>) -> RunOptions {
    RunOptions {
        max_cycles,
        ..RunOptions::default()
    }
}

#[rstest]
fn interrupt_mid_run_sends_neutral_frame_before_close() {
    let clock = TestClock::new();
    let stop = StopSignal::new();
    let link = SpySerial::default();
    let probe = link.clone();
    let input = ScriptedInput::constant(0.5, -0.5).stop_after(5, stop.clone());

    let summary = run(
        input,
        || Ok(SerialBridgeBackend::connect(link, SerialBackendCfg::default(), clock.clone())),
        opts(None),
        clock.clone(),
        &stop,
        None,
    )
    .expect("session");

    assert_eq!(summary.reason, StopReason::Operator);
    assert!(summary.fail_safe_ok);
    // The fifth poll raised the stop; its command never reached the link.
    assert_eq!(summary.cycles, 4);
    let frames = probe.frames();
    assert_eq!(frames.len(), 5, "{frames:?}");
    assert!(frames[..4].iter().all(|f| f == "S1750 T1750\n"));
    assert_eq!(frames.last().map(String::as_str), Some(NEUTRAL_FRAME));
    assert!(probe.is_closed());
}

#[rstest]
fn interrupt_mid_run_drives_both_pwm_pins_to_neutral_then_stops() {
    let clock = TestClock::new();
    let stop = StopSignal::new();
    let (steer, throttle) = (SpyPwm::default(), SpyPwm::default());
    let (steer_probe, throttle_probe) = (steer.clone(), throttle.clone());
    let input = ScriptedInput::constant(1.0, -1.0).stop_after(3, stop.clone());

    let summary = run(
        input,
        || PwmGpioBackend::start(steer, throttle, PwmBackendCfg::default(), clock.clone()),
        opts(None),
        clock.clone(),
        &stop,
        None,
    )
    .expect("session");

    assert_eq!(summary.reason, StopReason::Operator);
    assert_eq!(summary.cycles, 2);
    for probe in [&steer_probe, &throttle_probe] {
        let events = probe.events();
        assert_eq!(events.first(), Some(&PinEvent::Start { duty_pct: 7.5 }));
        assert_eq!(events.last(), Some(&PinEvent::Stop));
        // The event right before Stop is the neutral duty.
        assert_eq!(events[events.len() - 2], PinEvent::Duty { duty_pct: 7.5 });
        assert_eq!(probe.duty_history(), vec![10.0, 10.0, 7.5]);
    }
}

#[rstest]
fn busy_backend_fails_initialization_with_zero_cycles() {
    let clock = TestClock::new();
    let input = ScriptedInput::constant(0.3, 0.3);
    let polls = input.polls();
    let steer = SpyPwm::default();
    let steer_probe = steer.clone();

    let err = run(
        input,
        || {
            PwmGpioBackend::start(
                steer,
                SpyPwm::failing_start(),
                PwmBackendCfg::default(),
                clock.clone(),
            )
        },
        opts(None),
        clock.clone(),
        &StopSignal::new(),
        None,
    )
    .expect_err("backend busy");

    assert!(matches!(
        err.downcast_ref::<TeleopError>(),
        Some(TeleopError::BackendUnavailable { .. })
    ));
    assert_eq!(polls.load(Ordering::SeqCst), 0);
    // The pin that did start is stopped again and never saw a command.
    assert_eq!(
        steer_probe.events(),
        vec![PinEvent::Start { duty_pct: 7.5 }, PinEvent::Stop]
    );
}

#[rstest]
fn transport_failure_still_attempts_neutral_and_closes() {
    let clock = TestClock::new();
    let link = SpySerial::die_after(3);
    let probe = link.clone();

    let summary = run(
        ScriptedInput::constant(0.0, 0.0),
        || Ok(SerialBridgeBackend::connect(link, SerialBackendCfg::default(), clock.clone())),
        opts(None),
        clock.clone(),
        &StopSignal::new(),
        None,
    )
    .expect("session ran");

    assert!(matches!(
        summary.reason,
        StopReason::Fault(TeleopError::TransportFailure(_))
    ));
    assert!(!summary.is_clean());
    assert_eq!(summary.cycles, 3);
    // The link is dead, so the neutral frame cannot be confirmed, but the
    // port is still released.
    assert!(!summary.fail_safe_ok);
    assert!(probe.is_closed());
}

fn instant_serial(link: SpySerial, clock: TestClock) -> SerialBridgeBackend<SpySerial, TestClock> {
    SerialBridgeBackend::connect(
        link,
        SerialBackendCfg {
            reset_settle_ms: 0,
            neutral_settle_ms: 0,
        },
        clock,
    )
}

#[rstest]
fn stop_while_reading_full_stick_sends_only_neutral() {
    let clock = TestClock::new();
    let stop = StopSignal::new();
    let link = SpySerial::default();
    let probe = link.clone();
    let input = ScriptedInput::constant(1.0, -1.0).stop_after(1, stop.clone());

    let summary = run(
        input,
        || Ok(instant_serial(link, clock.clone())),
        opts(None),
        clock.clone(),
        &stop,
        None,
    )
    .expect("session");

    assert_eq!(summary.reason, StopReason::Operator);
    assert_eq!(summary.cycles, 0);
    assert_eq!(summary.last_command, PulsePair::NEUTRAL);
    assert_eq!(probe.frames(), vec![NEUTRAL_FRAME.to_string()]);
    assert!(probe.is_closed());
}

/// Test clock that raises a stop once a given amount of time has passed.
struct StopAt {
    inner: TestClock,
    stop: StopSignal,
    at: Duration,
}

impl Clock for StopAt {
    fn now(&self) -> Instant {
        self.inner.now()
    }

    fn sleep(&self, d: Duration) {
        self.inner.sleep(d);
        if self.inner.elapsed() >= self.at {
            self.stop.trigger();
        }
    }
}

#[rstest]
fn stop_during_idle_wait_skips_the_rest_of_the_period() {
    let clock = TestClock::new();
    let stop = StopSignal::new();
    let link = SpySerial::default();
    let probe = link.clone();
    let mut cfg = teleop_core::LoopCfg::default();
    // 1 Hz: almost the whole cycle is idle wait.
    cfg.loop_hz = 1;
    cfg.status_hz = 1;
    let loop_clock = StopAt {
        inner: clock.clone(),
        stop: stop.clone(),
        at: Duration::from_millis(10),
    };

    let summary = run(
        ScriptedInput::constant(0.5, 0.0),
        || Ok(instant_serial(link, clock.clone())),
        RunOptions { cfg, max_cycles: None },
        loop_clock,
        &stop,
        None,
    )
    .expect("session");

    assert_eq!(summary.reason, StopReason::Operator);
    assert_eq!(summary.cycles, 1);
    assert!(clock.elapsed() < Duration::from_millis(15));
    assert_eq!(
        probe.frames(),
        vec!["S1750 T1500\n".to_string(), NEUTRAL_FRAME.to_string()]
    );
}

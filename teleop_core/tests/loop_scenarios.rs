use std::sync::{Arc, Mutex};

use rstest::rstest;
use teleop_core::mocks::{RecordingActuator, ScriptedInput};
use teleop_core::{LoopCfg, RunOptions, StatusReporter, StopReason, StopSignal, run};
use teleop_traits::AxisSample;
use teleop_traits::clock::TestClock;

#[rstest]
#[case::centered(0.0, 0.0, 1500, 1500)]
#[case::inside_deadzone(0.05, 0.05, 1500, 1500)]
#[case::full_right_full_reverse(1.0, 1.0, 2000, 1000)]
#[case::forward_stick_reads_negative(-0.4, -0.8, 1300, 1900)]
fn constant_input_yields_identical_commands(
    #[case] steer: f32,
    #[case] throttle: f32,
    #[case] steer_us: u16,
    #[case] throttle_us: u16,
) {
    let act = RecordingActuator::default();
    let probe = act.clone();
    let summary = run(
        ScriptedInput::constant(steer, throttle),
        move || Ok(act),
        RunOptions {
            cfg: LoopCfg::default(),
            max_cycles: Some(12),
        },
        TestClock::new(),
        &StopSignal::new(),
        None,
    )
    .expect("run");

    assert_eq!(summary.reason, StopReason::CycleLimit);
    let applied = probe.applied();
    assert_eq!(applied.len(), 12);
    assert!(applied.iter().all(|p| *p == applied[0]));
    assert_eq!(applied[0].steering.as_us(), steer_us);
    assert_eq!(applied[0].throttle.as_us(), throttle_us);
}

#[rstest]
fn invalid_samples_never_stop_the_loop() {
    let act = RecordingActuator::default();
    let probe = act.clone();
    let input = ScriptedInput::new(vec![
        AxisSample::new(0.5, 0.0),
        AxisSample::new(f32::NAN, f32::NEG_INFINITY),
        AxisSample::new(0.5, 0.0),
    ]);
    let summary = run(
        input,
        move || Ok(act),
        RunOptions {
            cfg: LoopCfg::default(),
            max_cycles: Some(3),
        },
        TestClock::new(),
        &StopSignal::new(),
        None,
    )
    .expect("run");

    assert_eq!(summary.cycles, 3);
    assert_eq!(summary.stats.invalid_samples, 2);
    let applied = probe.applied();
    assert!(applied[1].is_neutral());
    assert_eq!(applied[2].steering.as_us(), 1750);
}

#[rstest]
fn status_is_reported_at_its_own_rate() {
    let lines = Arc::new(Mutex::new(Vec::new()));
    let sink = lines.clone();
    let reporter = StatusReporter::spawn(64, move |l| {
        sink.lock().expect("lock").push(l.to_string());
    });

    let summary = run(
        ScriptedInput::constant(0.0, 0.0),
        || Ok(RecordingActuator::default()),
        RunOptions {
            // 50 Hz loop, 5 Hz status: one line per 10 cycles.
            cfg: LoopCfg::default(),
            max_cycles: Some(50),
        },
        TestClock::new(),
        &StopSignal::new(),
        Some(&reporter),
    )
    .expect("run");
    drop(reporter);

    assert_eq!(summary.cycles, 50);
    let lines = lines.lock().expect("lock");
    assert_eq!(lines.len(), 5, "{lines:?}");
    assert!(lines.iter().all(|l| l == "Steer: 1500µs (+0.00)  |  Throttle: 1500µs (+0.00)"));
}

// Focused tests for period helpers.
use teleop_core::LoopCfg;
use teleop_core::util::period_us;

#[test]
fn period_us_clamps_and_floors() {
    // 50 Hz control loop → 20ms
    assert_eq!(period_us(50), 20_000);
    assert_eq!(period_us(1), 1_000_000);
    // Very high hz floors to 1µs minimum
    assert_eq!(period_us(1_000_000), 1);
    assert_eq!(period_us(u32::MAX), 1);
}

#[test]
fn loop_cfg_periods_follow_rates() {
    let cfg = LoopCfg::default();
    assert_eq!(cfg.period().as_millis(), 20);
    assert_eq!(cfg.status_period().as_millis(), 200);
}

// In debug builds we assert on hz=0 to catch misconfiguration early.
#[cfg(debug_assertions)]
#[test]
#[should_panic(expected = "rate_hz must be > 0")]
fn period_us_panics_on_zero_hz_in_debug() {
    let _ = period_us(0);
}

//! Command encoding: `CommandValue` -> pulse width -> backend wire form.

use crate::actuator::BackendKind;
use crate::signal::CommandValue;
use crate::util::MICROS_PER_SEC;

/// Servo/ESC pulse width in microseconds, always within [1000, 2000].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PulseWidth(u16);

impl PulseWidth {
    pub const MIN: PulseWidth = PulseWidth(1000);
    pub const NEUTRAL: PulseWidth = PulseWidth(1500);
    pub const MAX: PulseWidth = PulseWidth(2000);
    /// Microseconds of travel from neutral to either end.
    pub const SPAN_US: f32 = 500.0;

    /// `None` if `us` falls outside [1000, 2000].
    pub fn from_us(us: u16) -> Option<Self> {
        (Self::MIN.0..=Self::MAX.0).contains(&us).then_some(Self(us))
    }

    #[inline]
    pub fn as_us(self) -> u16 {
        self.0
    }
}

impl Default for PulseWidth {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

impl core::fmt::Display for PulseWidth {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}us", self.0)
    }
}

/// Steering and throttle pulse widths issued together in one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PulsePair {
    pub steering: PulseWidth,
    pub throttle: PulseWidth,
}

impl PulsePair {
    pub const NEUTRAL: PulsePair = PulsePair {
        steering: PulseWidth::NEUTRAL,
        throttle: PulseWidth::NEUTRAL,
    };

    pub const fn new(steering: PulseWidth, throttle: PulseWidth) -> Self {
        Self { steering, throttle }
    }

    pub fn is_neutral(&self) -> bool {
        *self == Self::NEUTRAL
    }
}

/// `round(1500 + 500 * value)`; the clamp only guards float rounding.
pub fn to_pulse_width(value: CommandValue) -> PulseWidth {
    let us = (f32::from(PulseWidth::NEUTRAL.0) + PulseWidth::SPAN_US * value.get()).round();
    let us = us.clamp(f32::from(PulseWidth::MIN.0), f32::from(PulseWidth::MAX.0));
    PulseWidth(us as u16)
}

/// PWM period for a carrier frequency, e.g. 50 Hz -> 20000 µs.
#[inline]
pub fn pwm_period_us(frequency_hz: u32) -> f64 {
    MICROS_PER_SEC as f64 / f64::from(frequency_hz.max(1))
}

/// Share of the PWM period spent high, as a percentage.
#[inline]
pub fn duty_cycle_percent(pw: PulseWidth, frequency_hz: u32) -> f64 {
    f64::from(pw.0) / pwm_period_us(frequency_hz) * 100.0
}

/// Joint text frame for the serial bridge: `S<steer_us> T<throttle_us>\n`.
pub fn serial_frame(pair: PulsePair) -> String {
    format!("S{} T{}\n", pair.steering.0, pair.throttle.0)
}

/// Backend-specific representation of one cycle's command.
#[derive(Debug, Clone, PartialEq)]
pub enum WireCommand {
    DutyCycle { steering_pct: f64, throttle_pct: f64 },
    Frame(String),
}

/// Pure mapping from a pulse pair to what the backend puts on the wire.
/// `pwm_frequency_hz` is only consulted for the PWM backend.
pub fn to_backend_frame(pair: PulsePair, kind: BackendKind, pwm_frequency_hz: u32) -> WireCommand {
    match kind {
        BackendKind::PwmGpio => WireCommand::DutyCycle {
            steering_pct: duty_cycle_percent(pair.steering, pwm_frequency_hz),
            throttle_pct: duty_cycle_percent(pair.throttle, pwm_frequency_hz),
        },
        BackendKind::SerialBridge => WireCommand::Frame(serial_frame(pair)),
    }
}

//! Runtime configuration for the control loop and backends.
//!
//! These are separate from the TOML-deserialized config in `teleop_config`;
//! see `conversions` for the mapping.

use std::time::Duration;

use crate::error::BuildError;

/// Control loop configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopCfg {
    /// Control cadence (Hz).
    pub loop_hz: u32,
    /// Status line cadence (Hz), independent of `loop_hz`.
    pub status_hz: u32,
    /// |raw| below this is forced to neutral.
    pub deadzone: f32,
    pub invert_steering: bool,
    pub invert_throttle: bool,
}

impl Default for LoopCfg {
    fn default() -> Self {
        Self {
            loop_hz: 50,
            status_hz: 5,
            deadzone: 0.1,
            invert_steering: false,
            invert_throttle: true,
        }
    }
}

impl LoopCfg {
    pub fn validate(&self) -> Result<(), BuildError> {
        if self.loop_hz == 0 {
            return Err(BuildError::InvalidConfig("loop_hz must be > 0"));
        }
        if self.status_hz == 0 {
            return Err(BuildError::InvalidConfig("status_hz must be > 0"));
        }
        if !self.deadzone.is_finite() || !(0.0..1.0).contains(&self.deadzone) {
            return Err(BuildError::InvalidConfig("deadzone must be in [0.0, 1.0)"));
        }
        Ok(())
    }

    pub fn period(&self) -> Duration {
        Duration::from_micros(crate::util::period_us(self.loop_hz))
    }

    pub fn status_period(&self) -> Duration {
        Duration::from_micros(crate::util::period_us(self.status_hz))
    }
}

/// PWM-GPIO backend timing.
#[derive(Debug, Clone, PartialEq)]
pub struct PwmBackendCfg {
    pub frequency_hz: u32,
    /// Neutral held after PWM start so the ESC completes its arming sequence.
    pub arming_ms: u64,
    /// Neutral held before PWM stops.
    pub neutral_settle_ms: u64,
}

impl Default for PwmBackendCfg {
    fn default() -> Self {
        Self {
            frequency_hz: 50,
            arming_ms: 500,
            neutral_settle_ms: 100,
        }
    }
}

/// Serial-Bridge backend timing.
#[derive(Debug, Clone, PartialEq)]
pub struct SerialBackendCfg {
    /// Wait after open for the microcontroller's reset-on-connect.
    pub reset_settle_ms: u64,
    /// Wait after the final neutral frame before closing.
    pub neutral_settle_ms: u64,
}

impl Default for SerialBackendCfg {
    fn default() -> Self {
        Self {
            reset_settle_ms: 2000,
            neutral_settle_ms: 100,
        }
    }
}

/// Backend selection plus its addressing.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCfg {
    PwmGpio {
        steer_pin: u8,
        throttle_pin: u8,
        pwm: PwmBackendCfg,
    },
    SerialBridge {
        port: String,
        baud: u32,
        read_timeout_ms: u64,
        serial: SerialBackendCfg,
    },
}

impl BackendCfg {
    pub fn kind(&self) -> crate::actuator::BackendKind {
        match self {
            BackendCfg::PwmGpio { .. } => crate::actuator::BackendKind::PwmGpio,
            BackendCfg::SerialBridge { .. } => crate::actuator::BackendKind::SerialBridge,
        }
    }
}

//! `From` implementations bridging `teleop_config` types to `teleop_core` types.

use teleop_config::BackendKind as ConfigBackendKind;

use crate::config::{BackendCfg, LoopCfg, PwmBackendCfg, SerialBackendCfg};

// ── LoopCfg ──────────────────────────────────────────────────────────────────

impl From<&teleop_config::Config> for LoopCfg {
    fn from(c: &teleop_config::Config) -> Self {
        Self {
            loop_hz: c.control.loop_hz,
            status_hz: c.control.status_hz,
            deadzone: c.control.deadzone,
            invert_steering: c.input.invert_steering,
            invert_throttle: c.input.invert_throttle,
        }
    }
}

// ── Backends ─────────────────────────────────────────────────────────────────

impl From<&teleop_config::PwmCfg> for PwmBackendCfg {
    fn from(c: &teleop_config::PwmCfg) -> Self {
        Self {
            frequency_hz: c.frequency_hz,
            arming_ms: c.arming_ms,
            neutral_settle_ms: c.neutral_settle_ms,
        }
    }
}

impl From<&teleop_config::SerialCfg> for SerialBackendCfg {
    fn from(c: &teleop_config::SerialCfg) -> Self {
        Self {
            reset_settle_ms: c.reset_settle_ms,
            neutral_settle_ms: c.neutral_settle_ms,
        }
    }
}

impl From<&teleop_config::Config> for BackendCfg {
    fn from(c: &teleop_config::Config) -> Self {
        match c.backend.kind {
            ConfigBackendKind::Pwm => BackendCfg::PwmGpio {
                steer_pin: c.pwm.steer_pin,
                throttle_pin: c.pwm.throttle_pin,
                pwm: (&c.pwm).into(),
            },
            ConfigBackendKind::Serial => BackendCfg::SerialBridge {
                port: c.serial.port.clone(),
                baud: c.serial.baud,
                read_timeout_ms: c.serial.read_timeout_ms,
                serial: (&c.serial).into(),
            },
        }
    }
}

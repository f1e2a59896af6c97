#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the teleoperation loop.
//!
//! - `Config` and its sections are deserialized from TOML and validated.
//! - Every section is optional; omitted keys fall back to the defaults an
//!   RC car with a hobby servo and ESC expects (50 Hz, 1000..2000 µs).
use serde::Deserialize;

/// Longest pulse the encoder can emit, in microseconds; the PWM period must
/// exceed it.
const MAX_PULSE_US: f64 = 2000.0;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ControlCfg {
    /// Control loop rate (Hz).
    pub loop_hz: u32,
    /// Status line rate (Hz); independent of the loop rate.
    pub status_hz: u32,
    /// |axis| below this is forced to exactly zero.
    pub deadzone: f32,
}

impl Default for ControlCfg {
    fn default() -> Self {
        Self {
            loop_hz: 50,
            status_hz: 5,
            deadzone: 0.1,
        }
    }
}

/// Gamepad axis names accepted in `[input]`.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AxisName {
    LeftStickX,
    LeftStickY,
    RightStickX,
    RightStickY,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct InputCfg {
    pub steer_axis: AxisName,
    pub throttle_axis: AxisName,
    pub invert_steering: bool,
    /// Stick forward reads negative on most pads, hence inverted by default.
    pub invert_throttle: bool,
}

impl Default for InputCfg {
    fn default() -> Self {
        Self {
            steer_axis: AxisName::LeftStickX,
            throttle_axis: AxisName::LeftStickY,
            invert_steering: false,
            invert_throttle: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Software PWM generated directly on two GPIO pins.
    #[default]
    Pwm,
    /// Text frames to a microcontroller over a serial port.
    Serial,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct BackendCfg {
    pub kind: BackendKind,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PwmCfg {
    /// Steering servo signal pin (BCM numbering).
    pub steer_pin: u8,
    /// ESC throttle signal pin (BCM numbering).
    pub throttle_pin: u8,
    pub frequency_hz: u32,
    /// Neutral is held this long after PWM starts so the ESC can arm.
    pub arming_ms: u64,
    /// Neutral is held this long before PWM stops on shutdown.
    pub neutral_settle_ms: u64,
}

impl Default for PwmCfg {
    fn default() -> Self {
        Self {
            steer_pin: 12,
            throttle_pin: 13,
            frequency_hz: 50,
            arming_ms: 500,
            neutral_settle_ms: 100,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SerialCfg {
    pub port: String,
    pub baud: u32,
    /// Bounds any blocking call on the port; nothing is read.
    pub read_timeout_ms: u64,
    /// Most Arduino-class boards reset when the port opens.
    pub reset_settle_ms: u64,
    pub neutral_settle_ms: u64,
}

impl Default for SerialCfg {
    fn default() -> Self {
        Self {
            port: "/dev/ttyACM0".to_string(),
            baud: 115_200,
            read_timeout_ms: 100,
            reset_settle_ms: 2000,
            neutral_settle_ms: 100,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub control: ControlCfg,
    pub input: InputCfg,
    pub backend: BackendCfg,
    pub pwm: PwmCfg,
    pub serial: SerialCfg,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read and parse a config file.
pub fn load_file(path: &std::path::Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {}: {}", path.display(), e))?;
    load_toml(&text).map_err(|e| eyre::eyre!("parse config {}: {}", path.display(), e))
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Control
        if self.control.loop_hz == 0 {
            eyre::bail!("control.loop_hz must be > 0");
        }
        if self.control.loop_hz > 1000 {
            eyre::bail!("control.loop_hz must be <= 1000");
        }
        if self.control.status_hz == 0 {
            eyre::bail!("control.status_hz must be > 0");
        }
        if self.control.status_hz > self.control.loop_hz {
            eyre::bail!("control.status_hz must be <= control.loop_hz");
        }
        if !self.control.deadzone.is_finite() || !(0.0..1.0).contains(&self.control.deadzone) {
            eyre::bail!("control.deadzone must be in [0.0, 1.0)");
        }

        // Backends are validated regardless of which one is selected so a
        // config stays valid when the operator flips --backend.
        if self.pwm.frequency_hz == 0 {
            eyre::bail!("pwm.frequency_hz must be > 0");
        }
        let period_us = 1_000_000.0 / f64::from(self.pwm.frequency_hz);
        if period_us <= MAX_PULSE_US {
            eyre::bail!("pwm.frequency_hz too high: period must exceed a 2000us pulse (max 499 Hz)");
        }
        if self.pwm.steer_pin == self.pwm.throttle_pin {
            eyre::bail!("pwm.steer_pin and pwm.throttle_pin must differ");
        }
        if self.pwm.arming_ms > 10_000 {
            eyre::bail!("pwm.arming_ms is unreasonably large (>10s)");
        }
        if self.pwm.neutral_settle_ms > 5_000 {
            eyre::bail!("pwm.neutral_settle_ms is unreasonably large (>5s)");
        }

        if self.serial.port.trim().is_empty() {
            eyre::bail!("serial.port must not be empty");
        }
        if self.serial.baud == 0 {
            eyre::bail!("serial.baud must be > 0");
        }
        if self.serial.read_timeout_ms == 0 {
            eyre::bail!("serial.read_timeout_ms must be >= 1");
        }
        if self.serial.reset_settle_ms > 30_000 {
            eyre::bail!("serial.reset_settle_ms is unreasonably large (>30s)");
        }
        if self.serial.neutral_settle_ms > 5_000 {
            eyre::bail!("serial.neutral_settle_ms is unreasonably large (>5s)");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        Ok(())
    }
}

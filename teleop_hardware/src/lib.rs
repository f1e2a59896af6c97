//! Device drivers for the teleoperation loop.
//!
//! Simulated devices are always compiled so the CLI and tests run anywhere.
//! Real drivers are opt-in:
//! - `hardware`: rppal software PWM on GPIO pins and rppal UART links.
//! - `gamepad`: gilrs-backed gamepad input.
pub mod error;
#[cfg(feature = "gamepad")]
pub mod gamepad;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod gpio_pwm;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod uart;

use teleop_traits::{AxisSample, BoxError, InputSource, PwmOutput, SerialLink};
use tracing::{debug, trace};

pub use error::HwError;

/// Simulated input device holding fixed axis values.
#[derive(Debug, Clone)]
pub struct SimulatedInput {
    sample: AxisSample,
    connected: bool,
}

impl SimulatedInput {
    pub fn new(sample: AxisSample) -> Self {
        Self {
            sample,
            connected: true,
        }
    }

    /// A device that never shows up.
    pub fn disconnected() -> Self {
        Self {
            sample: AxisSample::default(),
            connected: false,
        }
    }

    pub fn set_sample(&mut self, sample: AxisSample) {
        self.sample = sample;
    }
}

impl InputSource for SimulatedInput {
    fn is_available(&mut self) -> bool {
        self.connected
    }

    fn poll(&mut self) -> Result<AxisSample, BoxError> {
        if !self.connected {
            return Err(Box::new(HwError::NoDevice));
        }
        Ok(self.sample)
    }

    fn describe(&self) -> String {
        "simulated gamepad".to_string()
    }
}

/// Simulated PWM pin that tracks its state and logs duty changes.
#[derive(Debug)]
pub struct SimulatedPwm {
    pin: u8,
    frequency_hz: f64,
    duty_percent: f64,
    running: bool,
}

impl SimulatedPwm {
    pub fn new(pin: u8) -> Self {
        Self {
            pin,
            frequency_hz: 0.0,
            duty_percent: 0.0,
            running: false,
        }
    }

    pub fn duty_percent(&self) -> f64 {
        self.duty_percent
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}

impl PwmOutput for SimulatedPwm {
    fn start(&mut self, frequency_hz: f64, duty_percent: f64) -> Result<(), BoxError> {
        self.frequency_hz = frequency_hz;
        self.duty_percent = duty_percent;
        self.running = true;
        debug!(pin = self.pin, frequency_hz, duty_percent, "pwm started (simulated)");
        Ok(())
    }

    fn set_duty_cycle(&mut self, duty_percent: f64) -> Result<(), BoxError> {
        if !self.running {
            return Err(Box::new(HwError::Gpio(format!(
                "pin {} is not generating pwm",
                self.pin
            ))));
        }
        self.duty_percent = duty_percent;
        trace!(pin = self.pin, duty_percent, "pwm duty (simulated)");
        Ok(())
    }

    fn stop(&mut self) -> Result<(), BoxError> {
        self.running = false;
        debug!(pin = self.pin, frequency_hz = self.frequency_hz, "pwm stopped (simulated)");
        Ok(())
    }
}

/// Simulated serial link that keeps the last frame it was given.
#[derive(Debug)]
pub struct SimulatedSerial {
    port: String,
    last: Vec<u8>,
    frames: u64,
    open: bool,
}

impl SimulatedSerial {
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            last: Vec::new(),
            frames: 0,
            open: true,
        }
    }

    pub fn last_frame(&self) -> &[u8] {
        &self.last
    }

    pub fn frames_written(&self) -> u64 {
        self.frames
    }

    pub fn is_open(&self) -> bool {
        self.open
    }
}

impl SerialLink for SimulatedSerial {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), BoxError> {
        if !self.open {
            return Err(Box::new(HwError::Disconnected));
        }
        self.last.clear();
        self.last.extend_from_slice(bytes);
        self.frames = self.frames.saturating_add(1);
        trace!(port = %self.port, frame = %String::from_utf8_lossy(bytes).trim_end(), "serial write (simulated)");
        Ok(())
    }

    fn close(&mut self) -> Result<(), BoxError> {
        self.open = false;
        debug!(port = %self.port, frames = self.frames, "serial closed (simulated)");
        Ok(())
    }
}

//! Capability traits shared across the teleoperation stack.
//!
//! The control loop only ever talks to hardware through these traits, so the
//! same loop drives a gamepad + GPIO PWM rig, a gamepad + serial bridge rig,
//! or the simulated devices used in tests.
pub mod clock;

pub use clock::{Clock, MonotonicClock};

/// Boxed error type used at every trait boundary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Raw axis values from the operator's input device, one per channel.
///
/// Values are nominally in [-1.0, 1.0] but devices may report slightly
/// outside that range (or garbage); conditioning is the core's job.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AxisSample {
    pub steering: f32,
    pub throttle: f32,
}

impl AxisSample {
    pub const fn new(steering: f32, throttle: f32) -> Self {
        Self { steering, throttle }
    }
}

/// Human-operated analog input device.
pub trait InputSource {
    /// Whether a device is connected and readable.
    fn is_available(&mut self) -> bool;

    /// Latest axis values. Must not block; returns zeros if nothing changed.
    fn poll(&mut self) -> Result<AxisSample, BoxError>;

    /// Short human-readable device description for logs.
    fn describe(&self) -> String {
        "input device".to_string()
    }
}

impl<T: InputSource + ?Sized> InputSource for Box<T> {
    fn is_available(&mut self) -> bool {
        (**self).is_available()
    }

    fn poll(&mut self) -> Result<AxisSample, BoxError> {
        (**self).poll()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// A GPIO pin capable of continuous PWM generation.
pub trait PwmOutput {
    /// Begin PWM at `frequency_hz` with the given duty cycle (0..=100 %).
    fn start(&mut self, frequency_hz: f64, duty_percent: f64) -> Result<(), BoxError>;
    /// Change the duty cycle (0..=100 %) of a running output.
    fn set_duty_cycle(&mut self, duty_percent: f64) -> Result<(), BoxError>;
    /// Stop PWM generation and release the pin.
    fn stop(&mut self) -> Result<(), BoxError>;
}

/// Byte-stream connection to an external microcontroller.
pub trait SerialLink {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), BoxError>;
    /// Flush pending output and close the connection.
    fn close(&mut self) -> Result<(), BoxError>;
}

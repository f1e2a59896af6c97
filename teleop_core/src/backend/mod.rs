//! The two interchangeable actuation backends.
pub mod pwm;
pub mod serial;

pub use pwm::PwmGpioBackend;
pub use serial::SerialBridgeBackend;

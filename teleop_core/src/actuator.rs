//! The actuation capability shared by every physical backend.

use crate::encoder::PulsePair;
use crate::error::Result;

/// Which physical delivery path a backend uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    PwmGpio,
    SerialBridge,
}

impl BackendKind {
    pub const fn name(self) -> &'static str {
        match self {
            BackendKind::PwmGpio => "pwm-gpio",
            BackendKind::SerialBridge => "serial-bridge",
        }
    }
}

impl core::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// A live actuation backend, exclusively owned by the control loop.
///
/// Implementations must make `neutral_and_stop` idempotent and must run it
/// from `Drop` if it was never called, so neutral is commanded on every exit
/// path that unwinds.
pub trait Actuator {
    fn kind(&self) -> BackendKind;

    /// Push both channels for this cycle.
    fn apply(&mut self, cmd: PulsePair) -> Result<()>;

    /// Command neutral, wait for it to register, then release the resource.
    fn neutral_and_stop(&mut self) -> Result<()>;

    /// Whether the physical resource has already been released.
    fn is_released(&self) -> bool;
}

impl<A: Actuator + ?Sized> Actuator for Box<A> {
    fn kind(&self) -> BackendKind {
        (**self).kind()
    }

    fn apply(&mut self, cmd: PulsePair) -> Result<()> {
        (**self).apply(cmd)
    }

    fn neutral_and_stop(&mut self) -> Result<()> {
        (**self).neutral_and_stop()
    }

    fn is_released(&self) -> bool {
        (**self).is_released()
    }
}

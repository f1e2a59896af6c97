//! Signal conditioning: raw axis value -> deadzone -> clamp -> `CommandValue`.

use crate::error::TeleopError;

/// Normalized actuator command. Always finite and within [-1.0, 1.0].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct CommandValue(f32);

impl CommandValue {
    pub const NEUTRAL: CommandValue = CommandValue(0.0);
    pub const MIN: CommandValue = CommandValue(-1.0);
    pub const MAX: CommandValue = CommandValue(1.0);

    /// Clamp a finite value into range; `None` for NaN/±Inf.
    pub fn new(v: f32) -> Option<Self> {
        v.is_finite().then(|| Self(v.clamp(-1.0, 1.0)))
    }

    #[inline]
    pub fn get(self) -> f32 {
        self.0
    }
}

/// Control channels driven every cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Steering,
    Throttle,
}

impl Channel {
    pub const fn name(self) -> &'static str {
        match self {
            Channel::Steering => "steering",
            Channel::Throttle => "throttle",
        }
    }

    /// Apply this channel's polarity, then condition.
    pub fn condition(
        self,
        raw: f32,
        deadzone: f32,
        invert: bool,
    ) -> Result<CommandValue, TeleopError> {
        let oriented = if invert { -raw } else { raw };
        condition(oriented, deadzone)
    }
}

impl core::fmt::Display for Channel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Condition a raw axis reading.
///
/// Non-finite input is rejected with `InvalidSample`. Anything strictly
/// inside the deadzone becomes exactly 0.0; the rest is clamped to [-1, 1].
pub fn condition(raw: f32, deadzone: f32) -> Result<CommandValue, TeleopError> {
    if !raw.is_finite() {
        return Err(TeleopError::InvalidSample { value: raw });
    }
    if raw.abs() < deadzone {
        return Ok(CommandValue::NEUTRAL);
    }
    Ok(CommandValue(raw.clamp(-1.0, 1.0)))
}

//! Gamepad input through gilrs.
use gilrs::{Axis, Event, EventType, GamepadId, Gilrs};
use teleop_traits::{AxisSample, BoxError, InputSource};
use tracing::{info, warn};

use crate::error::{HwError, Result};

/// Analog stick axes that can drive a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StickAxis {
    LeftX,
    LeftY,
    RightX,
    RightY,
}

impl StickAxis {
    fn gilrs(self) -> Axis {
        match self {
            StickAxis::LeftX => Axis::LeftStickX,
            StickAxis::LeftY => Axis::LeftStickY,
            StickAxis::RightX => Axis::RightStickX,
            StickAxis::RightY => Axis::RightStickY,
        }
    }

    fn is_vertical(self) -> bool {
        matches!(self, StickAxis::LeftY | StickAxis::RightY)
    }
}

/// First connected gamepad; follows hot-plug events.
///
/// gilrs reports vertical axes with "up" positive. They are flipped here so
/// samples arrive in raw HID orientation (stick forward is negative), which
/// is what the loop's default throttle inversion expects.
pub struct GamepadInput {
    gilrs: Gilrs,
    active: Option<GamepadId>,
    steer: StickAxis,
    throttle: StickAxis,
}

impl GamepadInput {
    pub fn new(steer: StickAxis, throttle: StickAxis) -> Result<Self> {
        let gilrs = Gilrs::new().map_err(|e| HwError::Input(e.to_string()))?;
        let active = gilrs.gamepads().next().map(|(id, _)| id);
        Ok(Self {
            gilrs,
            active,
            steer,
            throttle,
        })
    }

    /// Drain pending events so `value()` reflects the newest state.
    fn pump(&mut self) {
        while let Some(Event { id, event, .. }) = self.gilrs.next_event() {
            match event {
                EventType::Connected if self.active.is_none() => {
                    info!(name = self.gilrs.gamepad(id).name(), "gamepad connected");
                    self.active = Some(id);
                }
                EventType::Disconnected if self.active == Some(id) => {
                    warn!("active gamepad disconnected");
                    self.active = None;
                }
                _ => {}
            }
        }
    }

    fn read(&self, id: GamepadId, axis: StickAxis) -> f32 {
        let v = self.gilrs.gamepad(id).value(axis.gilrs());
        if axis.is_vertical() { -v } else { v }
    }
}

impl InputSource for GamepadInput {
    fn is_available(&mut self) -> bool {
        self.pump();
        self.active.is_some()
    }

    fn poll(&mut self) -> std::result::Result<AxisSample, BoxError> {
        self.pump();
        let id = self.active.ok_or(HwError::NoDevice)?;
        Ok(AxisSample::new(
            self.read(id, self.steer),
            self.read(id, self.throttle),
        ))
    }

    fn describe(&self) -> String {
        match self.active {
            Some(id) => self.gilrs.gamepad(id).name().to_string(),
            None => "gamepad (none connected)".to_string(),
        }
    }
}

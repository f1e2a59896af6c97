//! Software PWM on Raspberry Pi GPIO pins via rppal.
use rppal::gpio::{Gpio, OutputPin};
use teleop_traits::{BoxError, PwmOutput};
use tracing::debug;

use crate::error::{HwError, Result};

impl From<rppal::gpio::Error> for HwError {
    fn from(e: rppal::gpio::Error) -> Self {
        use rppal::gpio::Error as G;
        match e {
            G::PermissionDenied(path) => HwError::PermissionDenied(path),
            G::PinUsed(pin) => HwError::Busy(format!("gpio pin {pin} is already in use")),
            G::PinNotAvailable(pin) => HwError::NotFound(format!("gpio pin {pin}")),
            other => HwError::Gpio(other.to_string()),
        }
    }
}

pub struct GpioPwm {
    bcm: u8,
    pin: OutputPin,
    frequency_hz: f64,
}

impl GpioPwm {
    /// Claim `bcm` as an output, driven low until PWM starts.
    pub fn open(bcm: u8) -> Result<Self> {
        let gpio = Gpio::new()?;
        let mut pin = gpio.get(bcm)?.into_output_low();
        // Release the line as an input on drop rather than leaving it driven.
        pin.set_reset_on_drop(true);
        debug!(pin = bcm, "gpio pin claimed");
        Ok(Self {
            bcm,
            pin,
            frequency_hz: 0.0,
        })
    }
}

impl PwmOutput for GpioPwm {
    fn start(&mut self, frequency_hz: f64, duty_percent: f64) -> std::result::Result<(), BoxError> {
        self.frequency_hz = frequency_hz;
        self.pin
            .set_pwm_frequency(frequency_hz, duty_percent / 100.0)
            .map_err(|e| Box::new(HwError::from(e)) as BoxError)
    }

    fn set_duty_cycle(&mut self, duty_percent: f64) -> std::result::Result<(), BoxError> {
        self.pin
            .set_pwm_frequency(self.frequency_hz, duty_percent / 100.0)
            .map_err(|e| Box::new(HwError::from(e)) as BoxError)
    }

    fn stop(&mut self) -> std::result::Result<(), BoxError> {
        self.pin
            .clear_pwm()
            .map_err(|e| Box::new(HwError::from(e)) as BoxError)?;
        self.pin.set_low();
        debug!(pin = self.bcm, "pwm stopped");
        Ok(())
    }
}

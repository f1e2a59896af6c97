//! Serial link to the bridge microcontroller via rppal's UART driver.
use std::time::Duration;

use rppal::uart::{Parity, Uart};
use teleop_traits::{BoxError, SerialLink};
use tracing::debug;

use crate::error::{HwError, Result};

impl From<rppal::uart::Error> for HwError {
    fn from(e: rppal::uart::Error) -> Self {
        match e {
            rppal::uart::Error::Io(io) => match io.kind() {
                std::io::ErrorKind::NotFound => HwError::NotFound(io.to_string()),
                std::io::ErrorKind::PermissionDenied => HwError::PermissionDenied(io.to_string()),
                std::io::ErrorKind::ResourceBusy => HwError::Busy(io.to_string()),
                _ => HwError::Io(io),
            },
            other => HwError::Uart(other.to_string()),
        }
    }
}

pub struct UartLink {
    port: String,
    uart: Option<Uart>,
}

impl UartLink {
    /// Open `port` at 8N1. Reads are never issued; the read timeout only
    /// bounds any call that might otherwise block forever.
    pub fn open(port: &str, baud: u32, read_timeout: Duration) -> Result<Self> {
        let mut uart = Uart::with_path(port, baud, Parity::None, 8, 1)?;
        uart.set_read_mode(0, read_timeout)?;
        uart.set_write_mode(true)?;
        debug!(port, baud, "uart opened");
        Ok(Self {
            port: port.to_string(),
            uart: Some(uart),
        })
    }
}

impl SerialLink for UartLink {
    fn write_all(&mut self, bytes: &[u8]) -> std::result::Result<(), BoxError> {
        let uart = self.uart.as_mut().ok_or(HwError::Disconnected)?;
        let mut off = 0;
        while off < bytes.len() {
            let n = uart.write(&bytes[off..]).map_err(HwError::from)?;
            if n == 0 {
                return Err(Box::new(HwError::Disconnected));
            }
            off += n;
        }
        Ok(())
    }

    fn close(&mut self) -> std::result::Result<(), BoxError> {
        if let Some(uart) = self.uart.take() {
            uart.drain().map_err(HwError::from)?;
            debug!(port = %self.port, "uart closed");
        }
        Ok(())
    }
}

//! Serial-Bridge backend: one text frame per cycle to a microcontroller that
//! generates the pulses itself.

use std::time::Duration;

use teleop_traits::{Clock, SerialLink};

use crate::actuator::{Actuator, BackendKind};
use crate::config::SerialBackendCfg;
use crate::encoder::{PulsePair, WireCommand, to_backend_frame};
use crate::error::{Report, Result, TeleopError};
use crate::hw_error::map_transport_error;

pub struct SerialBridgeBackend<L: SerialLink, C: Clock> {
    link: L,
    cfg: SerialBackendCfg,
    clock: C,
    frames: u64,
    released: bool,
}

impl<L: SerialLink, C: Clock> core::fmt::Debug for SerialBridgeBackend<L, C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SerialBridgeBackend")
            .field("frames", &self.frames)
            .field("released", &self.released)
            .finish()
    }
}

impl<L: SerialLink, C: Clock> SerialBridgeBackend<L, C> {
    /// Take ownership of an open link and wait out the bridge's reset.
    pub fn connect(link: L, cfg: SerialBackendCfg, clock: C) -> Self {
        tracing::info!(
            reset_settle_ms = cfg.reset_settle_ms,
            "serial link open; waiting for bridge reset"
        );
        clock.sleep(Duration::from_millis(cfg.reset_settle_ms));
        Self {
            link,
            cfg,
            clock,
            frames: 0,
            released: false,
        }
    }

    /// Frames written so far, including the final neutral frame.
    pub fn frames_written(&self) -> u64 {
        self.frames
    }

    fn send(&mut self, cmd: PulsePair) -> Result<()> {
        let WireCommand::Frame(frame) = to_backend_frame(cmd, BackendKind::SerialBridge, 0) else {
            return Err(Report::new(TeleopError::TransportFailure(
                "serial backend received a non-frame command".to_string(),
            )));
        };
        self.link
            .write_all(frame.as_bytes())
            .map_err(|e| Report::new(map_transport_error(&*e)))?;
        self.frames = self.frames.saturating_add(1);
        Ok(())
    }
}

impl<L: SerialLink, C: Clock> Actuator for SerialBridgeBackend<L, C> {
    fn kind(&self) -> BackendKind {
        BackendKind::SerialBridge
    }

    fn apply(&mut self, cmd: PulsePair) -> Result<()> {
        if self.released {
            return Err(Report::new(TeleopError::TransportFailure(
                "serial link already closed".to_string(),
            )));
        }
        self.send(cmd)
    }

    fn neutral_and_stop(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        let neutral = self.send(PulsePair::NEUTRAL);
        if let Err(e) = &neutral {
            tracing::error!(error = %e, "failed to send neutral frame");
        }
        self.clock
            .sleep(Duration::from_millis(self.cfg.neutral_settle_ms));

        let closed = self
            .link
            .close()
            .map_err(|e| Report::new(map_transport_error(&*e)));
        match &closed {
            Ok(()) => tracing::info!(frames = self.frames, "serial link closed"),
            Err(e) => tracing::error!(error = %e, "failed to close serial link"),
        }
        neutral.and(closed)
    }

    fn is_released(&self) -> bool {
        self.released
    }
}

impl<L: SerialLink, C: Clock> Drop for SerialBridgeBackend<L, C> {
    fn drop(&mut self) {
        if !self.released {
            tracing::warn!("serial backend dropped while active; forcing neutral");
            let _ = self.neutral_and_stop();
        }
    }
}

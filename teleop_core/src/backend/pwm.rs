//! PWM-GPIO backend: two pins generating servo/ESC pulses directly.

use std::time::Duration;

use teleop_traits::{Clock, PwmOutput};

use crate::actuator::{Actuator, BackendKind};
use crate::config::PwmBackendCfg;
use crate::encoder::{PulsePair, PulseWidth, WireCommand, duty_cycle_percent, to_backend_frame};
use crate::error::{Report, Result, TeleopError};
use crate::hw_error::{map_open_error, map_transport_error};

pub struct PwmGpioBackend<P: PwmOutput, C: Clock> {
    steering: P,
    throttle: P,
    cfg: PwmBackendCfg,
    clock: C,
    released: bool,
}

impl<P: PwmOutput, C: Clock> core::fmt::Debug for PwmGpioBackend<P, C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PwmGpioBackend")
            .field("frequency_hz", &self.cfg.frequency_hz)
            .field("released", &self.released)
            .finish()
    }
}

impl<P: PwmOutput, C: Clock> PwmGpioBackend<P, C> {
    /// Start both outputs at neutral and hold it for the ESC arming delay.
    ///
    /// A failure to start either output is `BackendUnavailable`; an output
    /// that did start is stopped again before returning the error.
    pub fn start(mut steering: P, mut throttle: P, cfg: PwmBackendCfg, clock: C) -> Result<Self> {
        let freq = f64::from(cfg.frequency_hz);
        let neutral = duty_cycle_percent(PulseWidth::NEUTRAL, cfg.frequency_hz);

        steering
            .start(freq, neutral)
            .map_err(|e| Report::new(map_open_error(BackendKind::PwmGpio, &*e)))?;
        if let Err(e) = throttle.start(freq, neutral) {
            if let Err(stop_err) = steering.stop() {
                tracing::warn!(error = %stop_err, "failed to stop steering pwm after throttle start failure");
            }
            return Err(Report::new(map_open_error(BackendKind::PwmGpio, &*e)));
        }

        tracing::info!(
            frequency_hz = cfg.frequency_hz,
            duty_pct = neutral,
            arming_ms = cfg.arming_ms,
            "pwm started at neutral; waiting for ESC arming"
        );
        clock.sleep(Duration::from_millis(cfg.arming_ms));

        Ok(Self {
            steering,
            throttle,
            cfg,
            clock,
            released: false,
        })
    }

    fn push(&mut self, cmd: PulsePair) -> Result<()> {
        let WireCommand::DutyCycle {
            steering_pct,
            throttle_pct,
        } = to_backend_frame(cmd, BackendKind::PwmGpio, self.cfg.frequency_hz)
        else {
            return Err(Report::new(TeleopError::TransportFailure(
                "pwm backend received a non-duty-cycle command".to_string(),
            )));
        };
        // Both channels go out back to back; a steering failure still lets
        // throttle be written so the two never diverge for long.
        let s = self.steering.set_duty_cycle(steering_pct);
        let t = self.throttle.set_duty_cycle(throttle_pct);
        s.and(t)
            .map_err(|e| Report::new(map_transport_error(&*e)))
    }
}

impl<P: PwmOutput, C: Clock> Actuator for PwmGpioBackend<P, C> {
    fn kind(&self) -> BackendKind {
        BackendKind::PwmGpio
    }

    fn apply(&mut self, cmd: PulsePair) -> Result<()> {
        if self.released {
            return Err(Report::new(TeleopError::TransportFailure(
                "pwm outputs already released".to_string(),
            )));
        }
        self.push(cmd)
    }

    fn neutral_and_stop(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        let neutral = self.push(PulsePair::NEUTRAL);
        if let Err(e) = &neutral {
            tracing::error!(error = %e, "failed to command neutral duty cycle");
        }
        self.clock
            .sleep(Duration::from_millis(self.cfg.neutral_settle_ms));

        let s = self.steering.stop();
        let t = self.throttle.stop();
        let stopped = s
            .and(t)
            .map_err(|e| Report::new(map_transport_error(&*e)));
        if let Err(e) = &stopped {
            tracing::error!(error = %e, "failed to stop pwm outputs");
        } else {
            tracing::info!("pwm outputs stopped and released");
        }
        neutral.and(stopped)
    }

    fn is_released(&self) -> bool {
        self.released
    }
}

impl<P: PwmOutput, C: Clock> Drop for PwmGpioBackend<P, C> {
    fn drop(&mut self) {
        if !self.released {
            tracing::warn!("pwm backend dropped while active; forcing neutral");
            let _ = self.neutral_and_stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{PinEvent, SpyPwm};
    use teleop_traits::clock::TestClock;

    fn backend(clock: &TestClock) -> (PwmGpioBackend<SpyPwm, TestClock>, SpyPwm, SpyPwm) {
        let steer = SpyPwm::default();
        let throttle = SpyPwm::default();
        let b = PwmGpioBackend::start(
            steer.clone(),
            throttle.clone(),
            PwmBackendCfg::default(),
            clock.clone(),
        )
        .expect("start");
        (b, steer, throttle)
    }

    #[test]
    fn start_runs_at_neutral_and_waits_for_arming() {
        let clock = TestClock::new();
        let (_b, steer, throttle) = backend(&clock);
        assert_eq!(steer.events(), vec![PinEvent::Start { duty_pct: 7.5 }]);
        assert_eq!(throttle.events(), vec![PinEvent::Start { duty_pct: 7.5 }]);
        assert_eq!(clock.elapsed(), Duration::from_millis(500));
    }

    #[test]
    fn apply_pushes_both_channels_every_call() {
        let clock = TestClock::new();
        let (mut b, steer, throttle) = backend(&clock);
        let cmd = PulsePair::new(PulseWidth::MAX, PulseWidth::MIN);
        b.apply(cmd).unwrap();
        b.apply(cmd).unwrap();
        assert_eq!(steer.duty_history(), vec![10.0, 10.0]);
        assert_eq!(throttle.duty_history(), vec![5.0, 5.0]);
    }

    #[test]
    fn neutral_and_stop_orders_neutral_settle_release() {
        let clock = TestClock::new();
        let (mut b, steer, _throttle) = backend(&clock);
        b.apply(PulsePair::new(PulseWidth::MAX, PulseWidth::MAX)).unwrap();
        let before = clock.elapsed();
        b.neutral_and_stop().unwrap();
        assert_eq!(clock.elapsed() - before, Duration::from_millis(100));
        let ev = steer.events();
        assert_eq!(
            &ev[ev.len() - 2..],
            &[PinEvent::Duty { duty_pct: 7.5 }, PinEvent::Stop]
        );
        assert!(b.is_released());
        // Idempotent
        b.neutral_and_stop().unwrap();
        assert_eq!(steer.events().len(), ev.len());
    }

    #[test]
    fn throttle_start_failure_releases_steering() {
        let clock = TestClock::new();
        let steer = SpyPwm::default();
        let throttle = SpyPwm::failing_start();
        let err = PwmGpioBackend::start(
            steer.clone(),
            throttle,
            PwmBackendCfg::default(),
            clock.clone(),
        )
        .expect_err("should fail");
        assert!(matches!(
            err.downcast_ref::<crate::error::TeleopError>(),
            Some(crate::error::TeleopError::BackendUnavailable { .. })
        ));
        assert_eq!(steer.events().last(), Some(&PinEvent::Stop));
        // No arming wait when nothing was armed
        assert_eq!(clock.elapsed(), Duration::ZERO);
    }

    #[test]
    fn drop_forces_neutral() {
        let clock = TestClock::new();
        let (b, steer, _throttle) = backend(&clock);
        drop(b);
        let ev = steer.events();
        assert_eq!(
            &ev[ev.len() - 2..],
            &[PinEvent::Duty { duty_pct: 7.5 }, PinEvent::Stop]
        );
    }

    #[test]
    fn duty_written_matches_the_encoder_wire_form() {
        let clock = TestClock::new();
        let cfg = PwmBackendCfg {
            frequency_hz: 100,
            ..PwmBackendCfg::default()
        };
        let (steer, throttle) = (SpyPwm::default(), SpyPwm::default());
        let mut b = PwmGpioBackend::start(steer.clone(), throttle.clone(), cfg, clock).expect("start");
        let cmd = PulsePair::new(PulseWidth::from_us(1250).unwrap(), PulseWidth::MAX);
        b.apply(cmd).unwrap();
        assert_eq!(
            to_backend_frame(cmd, BackendKind::PwmGpio, 100),
            WireCommand::DutyCycle {
                steering_pct: steer.duty_history()[0],
                throttle_pct: throttle.duty_history()[0],
            }
        );
        assert_eq!(throttle.duty_history(), vec![20.0]);
    }
}

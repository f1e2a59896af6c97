use std::marker::PhantomData;

use teleop_traits::{Clock, InputSource, MonotonicClock};

use crate::actuator::Actuator;
use crate::config::LoopCfg;
use crate::control::TeleopLoop;
use crate::error::{BuildError, Result};

impl TeleopLoop {
    pub fn builder() -> TeleopLoopBuilder<Missing, Missing> {
        TeleopLoopBuilder::default()
    }
}

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for `TeleopLoop`. The config is validated on `build()`.
pub struct TeleopLoopBuilder<I, A> {
    input: Option<Box<dyn InputSource>>,
    actuator: Option<Box<dyn Actuator>>,
    cfg: Option<LoopCfg>,
    clock: Option<Box<dyn Clock>>,
    _i: PhantomData<I>,
    _a: PhantomData<A>,
}

impl Default for TeleopLoopBuilder<Missing, Missing> {
    fn default() -> Self {
        Self {
            input: None,
            actuator: None,
            cfg: None,
            clock: None,
            _i: PhantomData,
            _a: PhantomData,
        }
    }
}

impl<I, A> TeleopLoopBuilder<I, A> {
    /// Fallible build available in any type-state; returns detailed error for missing pieces.
    pub fn try_build(self) -> Result<TeleopLoop> {
        let input = self
            .input
            .ok_or_else(|| eyre::Report::new(BuildError::MissingInput))?;
        let actuator = self
            .actuator
            .ok_or_else(|| eyre::Report::new(BuildError::MissingActuator))?;
        let cfg = self.cfg.unwrap_or_default();
        cfg.validate().map_err(eyre::Report::new)?;
        let clock = self
            .clock
            .unwrap_or_else(|| Box::new(MonotonicClock::new()));
        Ok(TeleopLoop::from_parts(input, actuator, cfg, clock))
    }

    pub fn with_config(mut self, cfg: LoopCfg) -> Self {
        self.cfg = Some(cfg);
        self
    }

    /// Defaults to `MonotonicClock` when not provided.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }
}

impl<A> TeleopLoopBuilder<Missing, A> {
    pub fn with_input(self, input: impl InputSource + 'static) -> TeleopLoopBuilder<Set, A> {
        TeleopLoopBuilder {
            input: Some(Box::new(input)),
            actuator: self.actuator,
            cfg: self.cfg,
            clock: self.clock,
            _i: PhantomData,
            _a: PhantomData,
        }
    }
}

impl<I> TeleopLoopBuilder<I, Missing> {
    pub fn with_actuator(self, actuator: impl Actuator + 'static) -> TeleopLoopBuilder<I, Set> {
        TeleopLoopBuilder {
            input: self.input,
            actuator: Some(Box::new(actuator)),
            cfg: self.cfg,
            clock: self.clock,
            _i: PhantomData,
            _a: PhantomData,
        }
    }
}

impl TeleopLoopBuilder<Set, Set> {
    /// Validate and build. Only available once input and actuator are set.
    pub fn build(self) -> Result<TeleopLoop> {
        self.try_build()
    }
}

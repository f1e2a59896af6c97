#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core teleoperation logic (hardware-agnostic).
//!
//! This crate turns gamepad axis readings into servo/ESC pulse commands at a
//! fixed rate and guarantees the actuators are left at neutral when a session
//! ends. All hardware goes through the `teleop_traits` capabilities
//! (`InputSource`, `PwmOutput`, `SerialLink`).
//!
//! ## Architecture
//!
//! - **Conditioning**: deadzone and clamp to a `CommandValue` (`signal`)
//! - **Encoding**: `CommandValue` → `PulseWidth` and per-backend wire form (`encoder`)
//! - **Backends**: PWM-GPIO and Serial-Bridge behind `Actuator` (`backend`)
//! - **Loop**: paced poll → condition → encode → apply (`control`, `schedule`)
//! - **Session**: init checks, Running, and the fail-safe shutdown (`runner`)
//! - **Status**: lifecycle states and the non-blocking reporter (`status`, `reporter`)
//!
//! Pulse widths are integral microseconds in [1000, 2000]; 1500 is neutral on
//! both channels.

pub mod actuator;
pub mod backend;
pub mod builder;
pub mod config;
pub mod control;
pub mod conversions;
pub mod encoder;
pub mod error;
pub mod hw_error;
pub mod mocks;
pub mod reporter;
pub mod runner;
pub mod schedule;
pub mod signal;
pub mod stats;
pub mod status;
pub mod stop;
pub mod util;

pub use actuator::{Actuator, BackendKind};
pub use backend::{PwmGpioBackend, SerialBridgeBackend};
pub use builder::{Missing, Set, TeleopLoopBuilder};
pub use config::{BackendCfg, LoopCfg, PwmBackendCfg, SerialBackendCfg};
pub use control::TeleopLoop;
pub use encoder::{PulsePair, PulseWidth, WireCommand, to_backend_frame, to_pulse_width};
pub use error::{BuildError, Result, TeleopError};
pub use reporter::StatusReporter;
pub use runner::{RunOptions, run};
pub use signal::{Channel, CommandValue, condition};
pub use stats::CycleStats;
pub use status::{LoopState, RunSummary, StatusLine, StopReason};
pub use stop::StopSignal;

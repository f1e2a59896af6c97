//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::OnceLock;

/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "teleop", version, about = "RC car teleoperation from a gamepad")]
pub struct Cli {
    /// Path to config TOML; built-in defaults apply when omitted
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log and report as JSON lines instead of pretty text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Log level (error|warn|info|debug|trace); RUST_LOG takes precedence,
    /// then this flag, then [logging] level, then "info"
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

/// Physical delivery path for the pulse commands.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum BackendArg {
    /// Software PWM on two GPIO pins
    Pwm,
    /// Text frames to a microcontroller over a serial port
    Serial,
}

impl From<BackendArg> for teleop_config::BackendKind {
    fn from(b: BackendArg) -> Self {
        match b {
            BackendArg::Pwm => teleop_config::BackendKind::Pwm,
            BackendArg::Serial => teleop_config::BackendKind::Serial,
        }
    }
}

/// Overrides applied on top of the TOML config.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct DriveArgs {
    /// Actuation backend (overrides [backend] kind)
    #[arg(long, value_enum, value_name = "KIND")]
    pub backend: Option<BackendArg>,
    /// Steering servo pin, BCM numbering (PWM backend)
    #[arg(long, value_name = "BCM")]
    pub steer_pin: Option<u8>,
    /// ESC throttle pin, BCM numbering (PWM backend)
    #[arg(long, value_name = "BCM")]
    pub throttle_pin: Option<u8>,
    /// Serial device path (serial backend)
    #[arg(long, value_name = "PATH")]
    pub port: Option<String>,
    /// Serial baud rate (serial backend)
    #[arg(long, value_name = "BAUD")]
    pub baud: Option<u32>,
    /// Axis deadzone in [0, 1)
    #[arg(long, value_name = "FRACTION")]
    pub deadzone: Option<f32>,
    /// Stop cleanly after this many control cycles
    #[arg(long, value_name = "N")]
    pub max_cycles: Option<u64>,
    /// Print control loop latency stats on exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub stats: bool,
    /// Enable real-time mode (SCHED_FIFO, mlockall)
    #[arg(
        long,
        action = ArgAction::SetTrue,
        long_help = "Enable real-time mode on Linux.\n\nAttempts SCHED_FIFO priority and calls mlockall(MCL_CURRENT|MCL_FUTURE) to lock the process address space into RAM. This reduces control loop jitter but may require elevated privileges or ulimits (e.g., memlock). Failures are logged as warnings and the run continues."
    )]
    pub rt: bool,
    /// Real-time priority for SCHED_FIFO on Linux (1..=max)
    #[arg(long, value_name = "PRIO")]
    pub rt_prio: Option<i32>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Drive the car until Ctrl+C
    Drive(DriveArgs),
    /// Validate config and probe the input device without actuating
    SelfCheck,
}

mod cli;
mod drive;
mod error_fmt;
mod rt;

use std::path::Path;

use clap::Parser;
use eyre::WrapErr;
use teleop_config::Config;
use teleop_core::{StopSignal, TeleopError};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*};

use crate::cli::{Cli, Commands, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn load_config(cli: &Cli) -> eyre::Result<Config> {
    match &cli.config {
        Some(path) => teleop_config::load_file(path),
        None => Ok(Config::default()),
    }
}

/// Console logs go to stderr so stdout carries only status and results.
/// The returned guard must live until exit for the file writer to flush.
fn init_tracing(cli: &Cli, logging: Option<&teleop_config::Logging>) -> eyre::Result<Option<WorkerGuard>> {
    let level = cli
        .log_level
        .as_deref()
        .or_else(|| logging.and_then(|l| l.level.as_deref()))
        .unwrap_or("info");
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .wrap_err_with(|| format!("invalid log level {level:?}"))?;

    let console = if cli.json {
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer().compact().with_writer(std::io::stderr).boxed()
    };

    let mut guard = None;
    let file_layer = match logging.and_then(|l| l.file.as_deref()) {
        Some(file) => {
            let rotation = match logging.and_then(|l| l.rotation.as_deref()) {
                Some("daily") => Rotation::DAILY,
                Some("hourly") => Rotation::HOURLY,
                _ => Rotation::NEVER,
            };
            let path = Path::new(file);
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
            let name = path.file_name().unwrap_or(path.as_os_str());
            let (writer, g) = tracing_appender::non_blocking(RollingFileAppender::new(rotation, dir, name));
            guard = Some(g);
            Some(fmt::layer().json().with_ansi(false).with_writer(writer).boxed())
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .wrap_err("install tracing subscriber")?;
    Ok(guard)
}

fn validated(cfg: &Config) -> eyre::Result<()> {
    cfg.validate()
        .map_err(|e| eyre::Report::new(TeleopError::Config(e.to_string())))
}

fn dispatch(cli: &Cli, mut cfg: Config) -> eyre::Result<()> {
    match &cli.cmd {
        Commands::Drive(args) => {
            drive::apply_overrides(&mut cfg, args);
            validated(&cfg)?;

            let stop = StopSignal::new();
            let on_signal = stop.clone();
            ctrlc::set_handler(move || on_signal.trigger()).wrap_err("install Ctrl+C handler")?;

            info!(
                version = env!("CARGO_PKG_VERSION"),
                backend = ?cfg.backend.kind,
                loop_hz = cfg.control.loop_hz,
                "teleop starting; press Ctrl+C to stop"
            );
            drive::run_drive(&cfg, args, cli.json, &stop).map(|_| ())
        }
        Commands::SelfCheck => {
            validated(&cfg)?;
            drive::self_check(&cfg, cli.json)
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    if let Err(e) = color_eyre::install() {
        eprintln!("warning: color-eyre not installed: {e}");
    }

    let cfg = load_config(&cli);
    let guard = match init_tracing(&cli, cfg.as_ref().ok().map(|c| &c.logging)) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("warning: logging disabled: {e:#}");
            None
        }
    };

    let code = match cfg.and_then(|cfg| dispatch(&cli, cfg)) {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "teleop failed");
            if JSON_MODE.get().copied().unwrap_or(false) {
                println!("{}", format_error_json(&e));
            } else {
                eprintln!("{}", humanize(&e));
            }
            exit_code_for_error(&e)
        }
    };
    drop(guard);
    std::process::exit(code);
}

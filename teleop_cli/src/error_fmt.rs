//! Human-readable error descriptions and structured JSON error formatting.

use teleop_core::BackendKind;
use teleop_core::error::{BuildError, TeleopError};

fn backend_remedy(backend: BackendKind, detail: &str) -> String {
    let lower = detail.to_ascii_lowercase();
    let (causes, fix) = if lower.contains("permission") || lower.contains("denied") {
        (
            "The process is not allowed to access the device.",
            match backend {
                BackendKind::PwmGpio => "Run with sudo or add the user to the 'gpio' group.",
                BackendKind::SerialBridge => "Run with sudo or add the user to the 'dialout' group.",
            },
        )
    } else if lower.contains("in use") || lower.contains("busy") || lower.contains("held") {
        (
            "Another process (or a previous teleop run) still holds the resource.",
            "Stop the other process, or pick different pins/port with --steer-pin/--throttle-pin/--port.",
        )
    } else if lower.contains("not found") || lower.contains("no such") || lower.contains("not available") {
        (
            "The pin number or port path does not exist on this machine.",
            "Check the wiring and [pwm]/[serial] in the config; list serial ports with 'ls /dev/tty*'.",
        )
    } else {
        (
            "The hardware could not be initialized.",
            "Re-run with --log-level=debug for details.",
        )
    };
    format!(
        "What happened: The {backend} backend could not be opened ({detail}).\nLikely causes: {causes}\nHow to fix: {fix}"
    )
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(te) = err.downcast_ref::<TeleopError>() {
        return match te {
            TeleopError::NoInputDevice => {
                "What happened: No gamepad was detected.\nLikely causes: The controller is unplugged, not paired, or asleep.\nHow to fix: Connect the gamepad (press its home button to wake it), then start teleop again.".to_string()
            }
            TeleopError::BackendUnavailable { backend, detail } => backend_remedy(*backend, detail),
            TeleopError::TransportFailure(detail) => format!(
                "What happened: Lost the link to the actuators mid-run ({detail}).\nLikely causes: USB cable unplugged, microcontroller reset, or a GPIO fault.\nHow to fix: Check the vehicle is stopped, reconnect the hardware, then restart. Neutral was attempted before exit."
            ),
            TeleopError::Input(detail) => format!(
                "What happened: Reading the gamepad failed mid-run ({detail}).\nLikely causes: The controller disconnected or its battery died.\nHow to fix: Reconnect the gamepad and restart. Outputs were returned to neutral."
            ),
            TeleopError::Config(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in the TOML or on the command line.\nHow to fix: Edit the config file or flags, then rerun. See etc/teleop.toml for a sample."
            ),
            TeleopError::InvalidSample { value } => format!(
                "What happened: The input produced a non-numeric axis value ({value}).\nLikely causes: A faulty controller driver.\nHow to fix: Try another gamepad."
            ),
        };
    }

    if let Some(BuildError::InvalidConfig(msg)) = err.downcast_ref::<BuildError>() {
        return format!(
            "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun. See etc/teleop.toml for a sample."
        );
    }

    // String-based heuristics for errors coming from config loading
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.starts_with("read config") {
        return format!(
            "What happened: The config file could not be read ({msg}).\nLikely causes: Wrong path or missing permissions.\nHow to fix: Pass an existing file with --config, or omit it to use defaults."
        );
    }
    if lower.starts_with("parse config") {
        return format!(
            "What happened: The config file is not valid TOML for teleop ({msg}).\nLikely causes: A typo, an unknown key value, or a wrong type.\nHow to fix: Compare against etc/teleop.toml."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Every fatal error exits 1; clap handles usage errors with 2 on its own.
pub fn exit_code_for_error(_err: &eyre::Report) -> i32 {
    1
}

fn reason_name(err: &eyre::Report) -> &'static str {
    match err.downcast_ref::<TeleopError>() {
        Some(TeleopError::NoInputDevice) => "NoInputDevice",
        Some(TeleopError::BackendUnavailable { .. }) => "BackendUnavailable",
        Some(TeleopError::TransportFailure(_)) => "TransportFailure",
        Some(TeleopError::Input(_)) => "InputFailure",
        Some(TeleopError::Config(_)) => "Config",
        Some(TeleopError::InvalidSample { .. }) => "InvalidSample",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    let mut obj = json!({
        "type": "error",
        "reason": reason_name(err),
        "message": humanize(err),
    });
    if let Some(TeleopError::BackendUnavailable { backend, detail }) = err.downcast_ref::<TeleopError>() {
        obj["details"] = json!({ "backend": backend.name(), "detail": detail });
    }
    obj.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_denied_suggests_privileges() {
        let err = eyre::Report::new(TeleopError::BackendUnavailable {
            backend: BackendKind::PwmGpio,
            detail: "permission denied: /dev/gpiomem".into(),
        });
        let text = humanize(&err);
        assert!(text.starts_with("What happened: The pwm-gpio backend"));
        assert!(text.contains("gpio' group"));
    }

    #[test]
    fn wrapped_fault_is_still_recognized() {
        let err = eyre::Report::new(TeleopError::TransportFailure("broken pipe".into()))
            .wrap_err("control loop stopped on a fault");
        assert!(humanize(&err).contains("Lost the link"));
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&err)).expect("json");
        assert_eq!(v["reason"], "TransportFailure");
    }
}

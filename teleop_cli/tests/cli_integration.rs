use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

// Fast sim config: no arming or settle waits, quick loop.
fn write_valid_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[control]
loop_hz = 100
status_hz = 10
deadzone = 0.1

[pwm]
arming_ms = 0
neutral_settle_ms = 0

[serial]
port = "/dev/ttyACM0"
reset_settle_ms = 0
neutral_settle_ms = 0
"#;
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

#[rstest]
#[case(&["--help"], &[], 0, "Usage:", "stdout")]
#[case(&["drive", "--max-cycles", "5"], &[("TELEOP_SIM_INPUT", "1")], 0, "Stopped (cycle_limit) after 5 cycles", "stdout")]
#[case(&["drive", "--backend", "serial", "--max-cycles", "3"], &[("TELEOP_SIM_STEER", "1.0")], 0, "Steer: 2000µs (+1.00)", "stdout")]
#[case(&["drive", "--max-cycles", "3"], &[("TELEOP_SIM_THROTTLE", "-0.8")], 0, "Throttle: 1900µs (+0.80)", "stdout")]
#[case(&["drive", "--max-cycles", "5"], &[("TELEOP_SIM_NO_DEVICE", "1")], 1, "No gamepad was detected", "stderr")]
#[case(&["drive", "--max-cycles", "5"], &[("TELEOP_SIM_INPUT", "1"), ("TELEOP_SIM_BACKEND_BUSY", "1")], 1, "pwm-gpio backend could not be opened", "stderr")]
#[case(&["drive", "--backend", "serial", "--max-cycles", "5"], &[("TELEOP_SIM_INPUT", "1"), ("TELEOP_SIM_BACKEND_BUSY", "1")], 1, "serial-bridge backend could not be opened", "stderr")]
#[case(&["drive", "--deadzone", "1.5"], &[], 1, "control.deadzone must be in [0.0, 1.0)", "stderr")]
#[case(&["drive", "--steer-pin", "13"], &[], 1, "must differ", "stderr")]
#[case(&["drive", "--backend", "can"], &[], 2, "invalid value", "stderr")]
#[case(&["self-check"], &[("TELEOP_SIM_INPUT", "1")], 0, "Self-check OK", "stdout")]
#[case(&["self-check"], &[("TELEOP_SIM_NO_DEVICE", "1")], 1, "No gamepad was detected", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] env: &[(&str, &str)],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = Command::cargo_bin("teleop").unwrap();

    // Always include a fast config so runs finish quickly
    cmd.arg("--config").arg(&cfg);
    for (k, v) in env {
        cmd.env(k, v);
    }
    for a in args {
        cmd.arg(a);
    }

    let assert = cmd.assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[rstest]
fn busy_backend_never_emits_status() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    let mut cmd = Command::cargo_bin("teleop").unwrap();
    cmd.env("TELEOP_SIM_INPUT", "1")
        .env("TELEOP_SIM_BACKEND_BUSY", "1")
        .arg("--config")
        .arg(&cfg)
        .args(["drive", "--max-cycles", "5"]);
    cmd.assert()
        .code(1)
        .stdout(predicate::str::contains("Steer:").not());
}

#[rstest]
fn missing_config_file_is_reported() {
    let dir = tempdir().unwrap();
    let mut cmd = Command::cargo_bin("teleop").unwrap();
    cmd.arg("--config")
        .arg(dir.path().join("nope.toml"))
        .arg("self-check");
    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("config file could not be read"));
}

#[rstest]
fn stats_are_printed_on_request() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    let mut cmd = Command::cargo_bin("teleop").unwrap();
    cmd.env("TELEOP_SIM_INPUT", "1")
        .arg("--config")
        .arg(&cfg)
        .args(["drive", "--max-cycles", "10", "--stats"]);
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("--- Teleop Stats ---"))
        .stderr(predicate::str::contains("Cycles: 10"));
}

#[rstest]
fn log_file_is_written_when_configured() {
    let dir = tempdir().unwrap();
    let log = dir.path().join("teleop.log");
    let cfg = dir.path().join("cfg.toml");
    fs::write(
        &cfg,
        format!(
            "[pwm]\narming_ms = 0\nneutral_settle_ms = 0\n[logging]\nfile = {:?}\nlevel = \"info\"\n",
            log.display().to_string()
        ),
    )
    .unwrap();
    let mut cmd = Command::cargo_bin("teleop").unwrap();
    cmd.env("TELEOP_SIM_INPUT", "1")
        .arg("--config")
        .arg(&cfg)
        .args(["drive", "--max-cycles", "2"]);
    cmd.assert().success();
    let text = fs::read_to_string(&log).unwrap();
    assert!(text.contains("session finished"), "log was: {text}");
}

#[cfg(not(feature = "gamepad"))]
#[rstest]
#[case::pwm("pwm")]
#[case::serial("serial")]
fn no_input_device_fails_before_the_backend_is_claimed(#[case] backend: &str) {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    let mut cmd = Command::cargo_bin("teleop").unwrap();
    // Would report a busy backend if the backend were ever opened.
    cmd.env_remove("TELEOP_SIM_INPUT")
        .env_remove("TELEOP_SIM_STEER")
        .env_remove("TELEOP_SIM_THROTTLE")
        .env_remove("TELEOP_SIM_NO_DEVICE")
        .env("TELEOP_SIM_BACKEND_BUSY", "1")
        .arg("--config")
        .arg(&cfg)
        .args(["drive", "--backend", backend, "--max-cycles", "3"]);
    cmd.assert()
        .code(1)
        .stdout(predicate::str::contains("Steer:").not())
        .stderr(predicate::str::contains("No gamepad was detected"))
        .stderr(predicate::str::contains("could not be opened").not());
}

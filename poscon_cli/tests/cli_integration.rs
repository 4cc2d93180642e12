use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

// Simulation config with a fast reference clock so runs finish quickly.
fn write_fast_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[encoder]
pulses_per_revolution = 400

[controller]
output_limit = 15
anti_windup = true

[simulation]
reference_period_ms = 10
pulses_per_sec_per_unit = 40
step_ms = 1
"#;
    let path = dir.path().join("poscon.toml");
    fs::write(&path, toml).unwrap();
    path
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["faults"], 0, "OCP", "stdout")]
#[case(&["self-check"], 0, "no fault", "stdout")]
#[case(&["run", "--revolutions", "0,1", "--kp", "0.5", "--start", "--cycles", "3"], 0, "counter=3", "stdout")]
#[case(&["run", "--revolutions", "0,1", "--cycles", "1"], 0, "target=0.100", "stdout")]
#[case(&["run", "--kp", "abc"], 2, "invalid character", "stderr")]
#[case(&["spin"], 2, "unrecognized subcommand", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_fast_config(&dir);

    let mut cmd = Command::cargo_bin("poscon").unwrap();
    cmd.arg("--config").arg(&cfg);
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

#[test]
fn self_check_reports_driver_fault() {
    let mut cmd = Command::cargo_bin("poscon").unwrap();
    cmd.env("POSCON_SIM_FAULT", "2").arg("self-check");
    cmd.assert()
        .code(4)
        .stderr(predicate::str::contains("overcurrent"));
}

#[test]
fn invalid_config_is_explained() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[encoder]\npulses_per_revolution = 0\n").unwrap();

    let mut cmd = Command::cargo_bin("poscon").unwrap();
    cmd.arg("--config").arg(&path).arg("faults");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("pulses_per_revolution must be > 0"));
}

#[test]
fn missing_config_file_fails() {
    let dir = tempdir().unwrap();
    let mut cmd = Command::cargo_bin("poscon").unwrap();
    cmd.arg("--config")
        .arg(dir.path().join("nope.toml"))
        .arg("faults");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("nope.toml"));
}

#[test]
fn operator_console_keeps_running_after_bad_input() {
    let dir = tempdir().unwrap();
    let cfg = write_fast_config(&dir);

    let mut cmd = assert_cmd::Command::cargo_bin("poscon").unwrap();
    cmd.arg("--config")
        .arg(&cfg)
        .arg("run")
        .write_stdin("kp abc\ntarget 0,5\nhistory\nend\n");
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Invalid input"))
        .stdout(predicate::str::contains("target=0.500"))
        .stdout(predicate::str::contains("accumulator=0"));
}

#[test]
fn json_mode_prints_one_object_per_line() {
    let dir = tempdir().unwrap();
    let cfg = write_fast_config(&dir);

    let mut cmd = Command::cargo_bin("poscon").unwrap();
    cmd.arg("--config")
        .arg(&cfg)
        .arg("--json")
        .arg("run")
        .arg("--start")
        .arg("--cycles")
        .arg("2");
    let out = cmd.assert().success().get_output().stdout.clone();
    let text = String::from_utf8(out).unwrap();
    let kinds: Vec<String> = text
        .lines()
        .map(|l| {
            let v: serde_json::Value = serde_json::from_str(l).expect("json line");
            v["kind"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(kinds, vec!["snapshot", "snapshot"]);

    let first: serde_json::Value = serde_json::from_str(text.lines().next().unwrap()).unwrap();
    for key in ["counter", "phi", "rotation", "rpm", "cycle_time", "drive"] {
        assert!(first.get(key).is_some(), "missing {key}");
    }
    assert_eq!(first["counter"], "1");
}

//! Integration tests for the svf-player CLI, using the loopback backend.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use svf_protocol::report::FaultReport;

fn binary_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_svf-player"))
}

fn create_temp_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

fn read_report(path: &Path) -> FaultReport {
    FaultReport::from_reader(&mut fs::File::open(path).unwrap()).unwrap()
}

const PASSING: &str = r#"[
    {"kind": "set_frequency", "hz": 0},
    {"kind": "shift", "register": "IR", "pattern": {"length": 6, "tdi": "09"}},
    {"kind": "shift", "register": "DR", "pattern": {"length": 32, "tdi": "DEADBEEF", "tdo": "DEADBEEF"}, "label": "idcode"},
    {"kind": "run_test", "run_count": 10, "min_time": 0.0}
]"#;

const MISMATCH: &str = r#"[
    {"kind": "shift", "register": "DR", "pattern": {"length": 8, "tdi": "01", "tdo": "02"}, "label": "first"},
    {"kind": "shift", "register": "DR", "pattern": {"length": 8, "tdi": "03", "tdo": "04"}, "label": "second"}
]"#;

#[test]
fn passing_stream_writes_empty_report() {
    let temp_dir = tempfile::tempdir().unwrap();
    let input = create_temp_file(temp_dir.path(), "pass.json", PASSING);
    let output = temp_dir.path().join("report.json");

    let status = Command::new(binary_path())
        .args([
            input.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
            "loopback",
        ])
        .status()
        .expect("failed to run svf-player");

    assert!(status.success());
    assert!(read_report(&output).is_empty());
}

#[test]
fn mismatch_aborts_with_one_fault() {
    let temp_dir = tempfile::tempdir().unwrap();
    let input = create_temp_file(temp_dir.path(), "fail.json", MISMATCH);
    let output = temp_dir.path().join("report.json");

    let status = Command::new(binary_path())
        .args([
            input.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
            "loopback",
        ])
        .status()
        .expect("failed to run svf-player");

    assert!(!status.success());
    let report = read_report(&output);
    assert_eq!(report.len(), 1);
    let fault = &report.faults()[0];
    assert_eq!(fault.label(), "first");
    assert_eq!(fault.tdi(), "01");
    assert_eq!(fault.tdo(), "02");
    assert_eq!(fault.mask(), "00");
    assert_eq!(fault.data(), "01");
}

#[test]
fn continue_on_fault_collects_all_and_succeeds() {
    let temp_dir = tempfile::tempdir().unwrap();
    let input = create_temp_file(temp_dir.path(), "fail.json", MISMATCH);
    let output = temp_dir.path().join("report.json");

    let status = Command::new(binary_path())
        .args([
            input.to_str().unwrap(),
            "--continue-on-fault",
            "-o",
            output.to_str().unwrap(),
            "loopback",
        ])
        .status()
        .expect("failed to run svf-player");

    assert!(status.success());
    let report = read_report(&output);
    let labels: Vec<&str> = report.faults().iter().map(|f| f.label()).collect();
    assert_eq!(labels, vec!["first", "second"]);
}

#[test]
fn reads_stdin_and_reports_on_stdout() {
    let mut child = Command::new(binary_path())
        .arg("loopback")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to run svf-player");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(PASSING.as_bytes())
        .unwrap();
    let output = child.wait_with_output().unwrap();

    assert!(output.status.success());
    let report = FaultReport::from_reader(&mut output.stdout.as_slice()).unwrap();
    assert!(report.is_empty());
}

#[test]
fn unsupported_instruction_fails() {
    let temp_dir = tempfile::tempdir().unwrap();
    let input = create_temp_file(
        temp_dir.path(),
        "trst.json",
        r#"[{"kind": "unsupported", "command": "TRST"}]"#,
    );

    let output = Command::new(binary_path())
        .args([input.to_str().unwrap(), "loopback"])
        .stdout(Stdio::null())
        .output()
        .expect("failed to run svf-player");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("TRST is currently not implemented"));
}

#[test]
fn malformed_stream_fails() {
    let temp_dir = tempfile::tempdir().unwrap();
    let input = create_temp_file(temp_dir.path(), "bad.json", "{ not json");

    let status = Command::new(binary_path())
        .args([input.to_str().unwrap(), "loopback"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .expect("failed to run svf-player");

    assert!(!status.success());
}

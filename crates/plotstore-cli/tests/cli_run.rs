//! End-to-end tests spawning the plotstore binary

use std::io::Write;
use std::process::{Command, Output, Stdio};

fn plotstore(args: &[&str], stdin: Option<&str>) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_plotstore"))
        .args(args)
        .env("NO_COLOR", "1")
        .env("PLOTSTORE_LOG_LEVEL", "off")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn plotstore");
    if let Some(input) = stdin {
        child
            .stdin
            .take()
            .unwrap()
            .write_all(input.as_bytes())
            .unwrap();
    }
    child.wait_with_output().unwrap()
}

#[test]
fn test_run_value_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("values.log");
    std::fs::write(&path, "Time:0 Value:1\nTime:2 Value:4\n").unwrap();

    let output = plotstore(&["run", path.to_str().unwrap()], None);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Plot \"Value trace\" (value) completed after 2 rows"));
    assert!(stdout.contains("Graph \"Value graph\" 2 objects"));
}

#[test]
fn test_run_sequence_stdin_json() {
    let input = "lifeline 1\nlifeline 2\ntime:5 op:msg id:7 src:1 dest:2\n";
    let output = plotstore(&["run", "-", "--producer", "sequence", "--json"], Some(input));
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["producer"], "sequence");
    assert_eq!(report["sub_plots"][0]["graphs"][0]["objects"][0]["label"], "7");
}

#[test]
fn test_missing_input_exits_with_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nope.log");
    let output = plotstore(&["run", path.to_str().unwrap()], None);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Error:"));
}

#[test]
fn test_producers_listing() {
    let output = plotstore(&["producers"], None);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("value"));
    assert!(stdout.contains("sequence"));
}

//! CLI smoke tests, run against the dev data directory.

use std::process::Command;

/// Invoke the CLI and return (stdout, stderr, exit code).
fn run_cli(args: &[&str]) -> (String, String, i32) {
    let output = Command::new("cargo")
        .args(["run", "-p", "blackreaper-cli", "--quiet", "--"])
        .args(args)
        .env("BLACKREAPER_ENV", "dev")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

#[test]
fn basic_flow() {
    let (stdout, _, code) = run_cli(&["--help"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("timer"));
    assert!(stdout.contains("sync"));

    // Status commands print well-formed JSON without touching state.
    let (stdout, stderr, code) = run_cli(&["timer", "status"]);
    assert_eq!(code, 0, "timer status failed: {stderr}");
    let snapshot: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert!(snapshot.get("state").is_some());
    assert!(snapshot.get("remaining_ms").is_some());

    let (stdout, stderr, code) = run_cli(&["sync", "status"]);
    assert_eq!(code, 0, "sync status failed: {stderr}");
    let status: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert!(status.get("pending_count").is_some());
}

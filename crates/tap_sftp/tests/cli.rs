use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

fn tap_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_tap-sftp"))
}

fn run_cli(args: &[&str], home: &TempDir) -> Output {
    Command::new(tap_bin())
        .args(args)
        .env("TAP_SFTP_HOME", home.path())
        .env_remove("TAP_SFTP_CONFIG")
        .output()
        .expect("failed to execute tap-sftp CLI")
}

fn assert_failed(output: &Output) -> String {
    assert!(
        !output.status.success(),
        "command unexpectedly succeeded\nstdout:\n{}\nstderr:\n{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(output.stdout.is_empty(), "nothing should reach stdout on failure");
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn discover_with_missing_config_fails() {
    let home = TempDir::new().unwrap();
    let missing = home.path().join("nope.json");

    let output = run_cli(
        &["discover", "--no-log-file", "--config", missing.to_str().unwrap()],
        &home,
    );
    let stderr = assert_failed(&output);
    assert!(stderr.contains("Failed to load config"), "stderr:\n{}", stderr);
}

#[test]
fn discover_with_invalid_config_fails() {
    let home = TempDir::new().unwrap();
    let config = home.path().join("config.json");
    fs::write(
        &config,
        r#"{"host": "sftp.example.com", "username": "etl", "password": "x", "tables": []}"#,
    )
    .unwrap();

    let output = run_cli(
        &["discover", "--no-log-file", "--config", config.to_str().unwrap()],
        &home,
    );
    let stderr = assert_failed(&output);
    assert!(stderr.contains("tables must not be empty"), "stderr:\n{}", stderr);
}

#[test]
fn files_with_bad_pattern_fails() {
    let home = TempDir::new().unwrap();
    let config = home.path().join("config.json");
    fs::write(
        &config,
        r#"{
            "host": "sftp.example.com",
            "username": "etl",
            "password": "x",
            "tables": [{"table_name": "t", "search_prefix": "/", "search_pattern": "("}]
        }"#,
    )
    .unwrap();

    let output = run_cli(
        &["files", "--no-log-file", "--config", config.to_str().unwrap()],
        &home,
    );
    let stderr = assert_failed(&output);
    assert!(stderr.contains("Failed to load config"), "stderr:\n{}", stderr);
}

#[test]
fn discover_requires_config() {
    let home = TempDir::new().unwrap();
    let output = run_cli(&["discover", "--no-log-file"], &home);
    assert_failed(&output);
}

//! Command-line tests for the `br` binary

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const BURST: &str = r#"
emitter:
  id: boss
pattern:
  node: gcr
  props:
    wait: 2
    times: 3
  children:
    - node: emit
"#;

/// `br` with config and log directories pointed inside `home`
fn br(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("br").expect("binary should build");
    cmd.current_dir(home)
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("XDG_DATA_HOME", home.join("data"));
    cmd
}

fn write_script(dir: &TempDir, name: &str, text: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, text).expect("Failed to write script");
    path
}

#[test]
fn test_check_valid_script() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let script = write_script(&dir, "burst.yml", BURST);

    br(dir.path())
        .arg("check")
        .arg(&script)
        .assert()
        .success()
        .stdout(predicate::str::contains("OK").and(predicate::str::contains("2 nodes")));
}

#[test]
fn test_check_rejects_invalid_property() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let script = write_script(
        &dir,
        "bad.yml",
        "pattern:\n  node: gsr\n  props:\n    wait: 2\n  children:\n    - node: emit\n",
    );

    br(dir.path())
        .arg("check")
        .arg(&script)
        .assert()
        .failure()
        .stderr(predicate::str::contains("not allowed to have property"));
}

#[test]
fn test_check_missing_file() {
    let dir = TempDir::new().expect("Failed to create temp dir");

    br(dir.path())
        .args(["check", "missing.yml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read script"));
}

#[test]
fn test_run_text_output() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let script = write_script(&dir, "burst.yml", BURST);

    br(dir.path())
        .arg("run")
        .arg(&script)
        .assert()
        .success()
        .stdout(
            predicate::str::contains("frame 0")
                .and(predicate::str::contains("frame 2"))
                .and(predicate::str::contains("frame 4"))
                .and(predicate::str::contains("3 emissions, root completed")),
        );
}

#[test]
fn test_run_json_output() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let script = write_script(&dir, "burst.yml", BURST);

    let output = br(dir.path())
        .arg("run")
        .arg(&script)
        .args(["--format", "json"])
        .output()
        .expect("Failed to run br");
    assert!(output.status.success());

    let doc: serde_json::Value = serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    assert_eq!(doc["outcome"], "completed");
    assert_eq!(doc["idle"], true);
    let frames: Vec<u64> = doc["emissions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["frame"].as_u64().unwrap())
        .collect();
    assert_eq!(frames, vec![0, 2, 4]);
}

#[test]
fn test_run_tick_limit() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let script = write_script(&dir, "burst.yml", BURST);

    br(dir.path())
        .arg("run")
        .arg(&script)
        .args(["--ticks", "1", "--format", "table"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Emissions: 1").and(predicate::str::contains("Root:      running")));
}

#[test]
fn test_config_sets_default_format() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let script = write_script(&dir, "burst.yml", BURST);
    fs::write(dir.path().join(".barrage.yml"), "output:\n  format: json\n").expect("Failed to write config");

    br(dir.path())
        .arg("run")
        .arg(&script)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("{"));
}

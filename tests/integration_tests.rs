//! Command-line integration tests
//!
//! These never need a real ffmpeg: binaries are pointed at paths that do not
//! exist, or the command fails before any binary is used.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// `videocutter` run inside `dir` with no `VIDEOCUTTER_*` variables set
fn bare(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("videocutter").unwrap();
    for var in [
        "RUST_LOG",
        "VIDEOCUTTER_CONFIG",
        "VIDEOCUTTER_LOG_LEVEL",
        "VIDEOCUTTER_LOG_FORMAT",
        "VIDEOCUTTER_BUNDLED_DIR",
        "VIDEOCUTTER_PROBE_TIMEOUT_MS",
        "VIDEOCUTTER_GRACE_PERIOD_MS",
    ] {
        cmd.env_remove(var);
    }
    cmd.current_dir(dir.path());
    cmd
}

/// `videocutter` with a config whose binaries are missing
fn videocutter(dir: &TempDir) -> Command {
    let config = dir.path().join("videocutter.toml");
    let missing = dir.path().join("missing");
    std::fs::write(
        &config,
        format!(
            "[binaries]\nffmpeg = '{}'\nffprobe = '{}'\n\n[logging]\nlevel = \"error\"\n",
            missing.join("ffmpeg").display(),
            missing.join("ffprobe").display()
        ),
    )
    .unwrap();

    let mut cmd = bare(dir);
    cmd.arg("--config").arg(&config);
    cmd
}

fn touch(dir: &TempDir, name: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, b"not really a video").unwrap();
    path
}

#[test]
fn test_help_lists_commands() {
    let dir = TempDir::new().unwrap();
    videocutter(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("cut"))
        .stdout(predicate::str::contains("probe"))
        .stdout(predicate::str::contains("preview"));
}

#[test]
fn test_preview_prints_target_json() {
    let dir = TempDir::new().unwrap();
    let input = touch(&dir, "talk.mp4");

    let output = videocutter(&dir)
        .args(["preview", "-i"])
        .arg(&input)
        .args(["-s", "1:30"])
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["start"], "00:01:30.000");
    assert!(value["input"].as_str().unwrap().ends_with("talk.mp4"));
}

#[test]
fn test_preview_without_start() {
    let dir = TempDir::new().unwrap();
    let input = touch(&dir, "talk.mp4");

    let output = videocutter(&dir).args(["preview", "-i"]).arg(&input).output().unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(value["start"].is_null());
}

#[test]
fn test_preview_rejects_bad_timecode() {
    let dir = TempDir::new().unwrap();
    let input = touch(&dir, "talk.mp4");

    videocutter(&dir)
        .args(["preview", "-i"])
        .arg(&input)
        .args(["-s", "01:02:60"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid timecode"));
}

#[test]
fn test_preview_missing_input() {
    let dir = TempDir::new().unwrap();
    videocutter(&dir)
        .args(["preview", "-i", "nowhere.mp4"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_probe_reports_missing_ffprobe_with_hint() {
    let dir = TempDir::new().unwrap();
    let input = touch(&dir, "talk.mp4");

    videocutter(&dir)
        .args(["probe", "-i"])
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"))
        .stderr(predicate::str::contains("Hint:"));
}

#[test]
fn test_cut_rejects_malformed_scale_before_running_anything() {
    let dir = TempDir::new().unwrap();
    let input = touch(&dir, "talk.mp4");

    videocutter(&dir)
        .args(["cut", "-i"])
        .arg(&input)
        .args(["-s", "10", "-e", "20", "--scale", "big"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--scale"));
}

#[test]
fn test_unknown_profile_in_config_rejected() {
    let dir = TempDir::new().unwrap();
    let input = touch(&dir, "talk.mp4");
    let config = dir.path().join("profiles.toml");
    std::fs::write(&config, "[profiles.ultra]\ncrf = 10\n").unwrap();

    bare(&dir)
        .arg("--config")
        .arg(&config)
        .args(["cut", "-i"])
        .arg(&input)
        .args(["-s", "1", "-e", "2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported encoding profile 'ultra'"));
}

#[test]
fn test_bad_log_level_is_a_config_error() {
    let dir = TempDir::new().unwrap();
    videocutter(&dir)
        .args(["--log-level", "loud", "preview", "-i", "x.mp4"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration error"));
}

//! End-to-end CLI tests driven by a JSON clip manifest

mod common;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Command isolated from any settings file or `DASHCUT_*` variable on the host
fn dashcut(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("dashcut").unwrap();
    cmd.current_dir(dir.path())
        .env("HOME", dir.path())
        .env("XDG_CONFIG_HOME", dir.path().join("config"))
        .env("APPDATA", dir.path().join("config"))
        .env_remove("RUST_LOG");
    for (key, _) in std::env::vars() {
        if key.starts_with("DASHCUT_") {
            cmd.env_remove(key);
        }
    }
    cmd
}

fn with_manifest() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("clips.json"), common::drive_manifest()).unwrap();
    dir
}

#[test]
fn test_timeline_summary() {
    let dir = with_manifest();
    dashcut(&dir)
        .args(["timeline", "--manifest", "clips.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Clips: 23  Segments: 2  Gaps: 1"))
        .stdout(predicate::str::contains("Footage: 23:00.000"))
        .stdout(predicate::str::contains("Segment 2: clips 12-22"));
}

#[test]
fn test_timeline_json() {
    let dir = with_manifest();
    let output = dashcut(&dir)
        .args(["timeline", "--manifest", "clips.json", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["total_duration"], 1380.0);
    assert_eq!(json["clips"].as_array().unwrap().len(), 23);
    assert_eq!(json["gaps"][0]["duration"], 1379.0);
    assert_eq!(json["gaps"][0]["before_index"], 11);
}

#[test]
fn test_locate_half_way() {
    let dir = with_manifest();
    let output = dashcut(&dir)
        .args(["locate", "--manifest", "clips.json", "--percent", "50", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["clip_index"], 11);
    assert_eq!(json["offset"], 30.0);
    assert_eq!(json["footage_time"], 690.0);
    assert_eq!(json["segment"], 0);
}

#[test]
fn test_export_dry_run_across_the_gap() {
    let dir = with_manifest();
    dashcut(&dir)
        .args([
            "export",
            "--manifest",
            "clips.json",
            "--start",
            "10:00",
            "--end",
            "12:30",
            "--cameras",
            "front,back,left_repeater,right_repeater",
            "--output",
            "drive.mp4",
            "--hwaccel",
            "none",
            "--dry-run",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Range: 10:00.000 - 12:30.000 (2:30.000)"))
        .stdout(predicate::str::contains("Crosses gap"))
        .stdout(predicate::str::contains("xstack=inputs=4"))
        .stdout(predicate::str::contains("-c:v libx264"));

    assert!(!dir.path().join("drive.mp4").exists());
}

#[test]
fn test_export_dry_run_json_omits_absent_cameras() {
    let dir = with_manifest();
    let output = dashcut(&dir)
        .args([
            "export",
            "--manifest",
            "clips.json",
            "--start",
            "0",
            "--end",
            "30",
            "--output",
            "front.mp4",
            "--hwaccel",
            "none",
            "--timestamp",
            "none",
            "--dry-run",
            "--json",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["dry_run"], true);
    assert_eq!(json["plan"]["cameras"].as_array().unwrap().len(), 4);
    let omitted: Vec<&str> = json["plan"]["omitted"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|v| v.as_str())
        .collect();
    assert_eq!(omitted, vec!["left_pillar", "right_pillar"]);
    assert!(!json["command"]["filter_graph"].as_str().unwrap().contains("drawtext"));
}

#[test]
fn test_export_rejects_range_past_the_end() {
    let dir = with_manifest();
    dashcut(&dir)
        .args([
            "export",
            "--manifest",
            "clips.json",
            "--start",
            "1370",
            "--end",
            "1400",
            "--output",
            "late.mp4",
            "--dry-run",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid export range"));
}

#[test]
fn test_settings_file_and_flags() {
    let dir = with_manifest();
    std::fs::write(
        dir.path().join("dashcut.toml"),
        "ffmpeg_path = \"/opt/ffmpeg\"\n[export]\nquality = \"mobile\"\n",
    )
    .unwrap();

    dashcut(&dir)
        .args(["config"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ffmpeg_path = \"/opt/ffmpeg\""))
        .stdout(predicate::str::contains("quality = \"mobile\""));

    dashcut(&dir)
        .args(["--ffmpeg", "/usr/local/bin/ffmpeg", "config"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ffmpeg_path = \"/usr/local/bin/ffmpeg\""));

    dashcut(&dir)
        .env("DASHCUT_FFMPEG", "/env/ffmpeg")
        .args(["config"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ffmpeg_path = \"/env/ffmpeg\""));
}

#[test]
fn test_missing_config_file_fails() {
    let dir = with_manifest();
    dashcut(&dir)
        .args(["--config", "nope.toml", "timeline", "--manifest", "clips.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Config file does not exist"));
}

#[test]
fn test_unknown_camera_is_a_usage_error() {
    let dir = with_manifest();
    dashcut(&dir)
        .args([
            "export", "--manifest", "clips.json", "--start", "0", "--end", "10", "--cameras", "roof", "--output",
            "x.mp4",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown camera"));
}

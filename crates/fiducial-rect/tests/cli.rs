use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;

/// 300 x 200 px board framed by 20 px markers inset 5 px (ids 1..=4),
/// plus one marker of a second, incomplete board (id 7).
const DETECTIONS: &str = r#"[
    {"id": 1, "corners": [[5, 5], [25, 5], [25, 25], [5, 25]]},
    {"id": 2, "corners": [[275, 5], [295, 5], [295, 25], [275, 25]]},
    {"id": 3, "corners": [[275, 175], [295, 175], [295, 195], [275, 195]]},
    {"id": 4, "corners": [[5, 175], [25, 175], [25, 195], [5, 195]]},
    {"id": 7, "corners": [[400, 5], [420, 5], [420, 25], [400, 25]]}
]"#;

fn write_detections(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("detections.json");
    fs::write(&path, DETECTIONS).expect("write detections");
    path
}

fn bin() -> Command {
    Command::cargo_bin("fiducial-rect").expect("binary built")
}

fn stdout_json(cmd: &mut Command) -> Value {
    let out = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&out).expect("stdout is JSON")
}

#[test]
fn measures_complete_target_and_skips_incomplete_one() {
    let dir = tempfile::tempdir().expect("tempdir");
    let detections = write_detections(dir.path());

    let json = stdout_json(
        bin()
            .arg(&detections)
            .args(["--targets", "[[7, 8, 9, 10], [1, 2, 3, 4]]"]),
    );

    let obj = json.as_object().expect("object");
    assert_eq!(obj.len(), 1);
    let board = &json["1"];
    assert_eq!(board["points"][0], serde_json::json!([0.0, 0.0]));
    assert_eq!(board["points"][2], serde_json::json!([300.0, 200.0]));
    assert_eq!(board["mm_width"], 600.0);
    assert_eq!(board["mm_height"], 400.0);
    assert_eq!(board["width"], 300);
    assert_eq!(board["height"], 200);
}

#[test]
fn cli_constants_override_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let detections = write_detections(dir.path());

    let json = stdout_json(bin().arg(&detections).args([
        "--targets",
        "[[1, 2, 3, 4]]",
        "--marker-size-mm",
        "20",
        "--offset-mm",
        "0",
    ]));

    // Corners stay on the markers: 290 x 190 px at 1 mm per px.
    assert_eq!(json["0"]["mm_width"], 290.0);
    assert_eq!(json["0"]["mm_height"], 190.0);
}

#[test]
fn zero_marker_size_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    let detections = write_detections(dir.path());

    bin()
        .arg(&detections)
        .args(["--targets", "[[1, 2, 3, 4]]", "--marker-size-mm", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("marker_size_mm must be finite and > 0"));
}

#[test]
fn malformed_targets_fail() {
    let dir = tempfile::tempdir().expect("tempdir");
    let detections = write_detections(dir.path());

    bin()
        .arg(&detections)
        .args(["--targets", "[[1, 2, 3]]"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error: invalid length 3"));
}

#[cfg(not(feature = "tracing"))]
#[test]
fn unknown_log_level_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let detections = write_detections(dir.path());

    bin()
        .arg(&detections)
        .args(["--targets", "[[1, 2, 3, 4]]", "--log-level", "loud"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value 'loud'"));
}

#[test]
fn config_file_writes_report() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_detections(dir.path());
    let config = dir.path().join("job.json");
    fs::write(
        &config,
        r#"{
            "detections_path": "detections.json",
            "targets": [[1, 2, 3, 4], [7, 8, 9, 10]],
            "params": {"marker_size_mm": 40, "offset_mm": 10},
            "output_path": "out/report.json"
        }"#,
    )
    .expect("write config");

    // Relative paths in the config are taken from the config's directory.
    let elsewhere = tempfile::tempdir().expect("tempdir");
    bin()
        .current_dir(elsewhere.path())
        .arg("--config")
        .arg(&config)
        .arg("--report")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let report: Value = serde_json::from_str(
        &fs::read_to_string(dir.path().join("out/report.json")).expect("report written"),
    )
    .expect("report is JSON");
    assert!(!elsewhere.path().join("out").exists());
    assert_eq!(report["detected_ids"], serde_json::json!([1, 2, 3, 4, 7]));
    assert_eq!(report["outcomes"][0]["status"], "resolved");
    assert_eq!(report["outcomes"][1]["status"], "missing_markers");
    assert_eq!(report["outcomes"][1]["missing"], serde_json::json!([8, 9, 10]));
    assert_eq!(report["results"]["0"]["width"], 300);
}

#[test]
fn missing_inputs_are_usage_errors() {
    bin().assert().failure().stderr(predicate::str::contains("Usage"));
}

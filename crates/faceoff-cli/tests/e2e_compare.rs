//! E2E tests for `fo compare`: checkpoint discovery, correlation series,
//! model comparison, plot suppression, and failure exits.
//!
//! Each test runs the `fo` binary as a subprocess against snapshot fixtures
//! in an isolated temp directory.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{Value, json};
use std::path::Path;
use tempfile::TempDir;

/// Build a Command targeting the `fo` binary.
fn fo_cmd() -> Command {
    let mut cmd = Command::cargo_bin("fo").expect("fo binary must exist");
    cmd.env("FACEOFF_LOG", "error");
    cmd
}

/// Write a map-form snapshot fixture.
fn write_snapshot(dir: &Path, name: &str, entries: &[(&str, f64, u32)]) {
    let mut records = serde_json::Map::new();
    for &(id, score, comparisons) in entries {
        records.insert(
            id.to_string(),
            json!({"id": id, "score": score, "comparisons": comparisons}),
        );
    }
    let doc = json!({"ImageRecords": records, "Metadata": {}});
    std::fs::write(
        dir.join(name),
        serde_json::to_string_pretty(&doc).expect("fixture serializes"),
    )
    .expect("fixture written");
}

/// Run `fo <args> --json` and parse the payload.
fn run_json(args: &[&str]) -> Value {
    let mut full = args.to_vec();
    full.push("--json");
    let output = fo_cmd().args(&full).output().expect("fo should not crash");
    assert!(
        output.status.success(),
        "fo {} failed: {}",
        args.join(" "),
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("--json should produce valid JSON")
}

#[test]
fn identical_checkpoints_correlate_perfectly() {
    let temp = TempDir::new().expect("temp dir");
    let ordered = [("a.png", 3.0, 4), ("b.png", 1.0, 4), ("c.png", -1.0, 4)];
    write_snapshot(temp.path(), "scores_10.json", &ordered);
    write_snapshot(temp.path(), "scores_20.json", &ordered);

    fo_cmd()
        .args(["compare", "-d"])
        .arg(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("rho +1.0000"))
        .stdout(predicate::str::contains("Comparisons with previous checkpoint"));

    let payload = run_json(&["compare", "-d", &temp.path().to_string_lossy()]);
    assert_eq!(payload["checkpoints"], json!([10, 20]));
    let successive = payload["successive"]
        .as_array()
        .expect("successive is an array");
    assert_eq!(successive.len(), 1);
    assert_eq!(successive[0]["total_comparisons"], 20);
    assert!((successive[0]["coefficient"].as_f64().expect("rho is a number") - 1.0).abs() < 1e-9);
}

#[test]
fn reversed_checkpoints_correlate_negatively() {
    let temp = TempDir::new().expect("temp dir");
    write_snapshot(
        temp.path(),
        "scores_5.json",
        &[("a.png", 2.0, 1), ("b.png", 1.0, 1), ("c.png", 0.0, 1)],
    );
    write_snapshot(
        temp.path(),
        "scores_9.json",
        &[("a.png", 0.0, 2), ("b.png", 1.0, 2), ("c.png", 2.0, 2)],
    );

    let payload = run_json(&["compare", "-d", &temp.path().to_string_lossy()]);
    let rho = payload["successive"][0]["coefficient"]
        .as_f64()
        .expect("rho is a number");
    assert!((rho + 1.0).abs() < 1e-9, "expected -1, got {rho}");
}

#[test]
fn model_snapshot_is_compared_against_every_checkpoint() {
    let temp = TempDir::new().expect("temp dir");
    write_snapshot(
        temp.path(),
        "scores_8.json",
        &[("a.png", 2.0, 1), ("b.png", 1.0, 1), ("c.png", 0.0, 1)],
    );
    // Model agrees with the single checkpoint; one checkpoint alone is fine
    // when a model is supplied.
    write_snapshot(
        temp.path(),
        "predictions.json",
        &[("a.png", 0.9, 0), ("b.png", 0.5, 0), ("c.png", 0.1, 0)],
    );

    let model_path = temp.path().join("predictions.json");
    let payload = run_json(&[
        "compare",
        "-d",
        &temp.path().to_string_lossy(),
        "--model",
        &model_path.to_string_lossy(),
    ]);

    let model_series = payload["model"].as_array().expect("model series exists");
    assert_eq!(model_series.len(), 1);
    assert!(
        (model_series[0]["coefficient"]
            .as_f64()
            .expect("rho is a number")
            - 1.0)
            .abs()
            < 1e-9
    );
    assert!(payload["successive"].as_array().expect("array").is_empty());
}

#[test]
fn no_plot_suppresses_the_chart() {
    let temp = TempDir::new().expect("temp dir");
    let ordered = [("a.png", 1.0, 1), ("b.png", 0.0, 1)];
    write_snapshot(temp.path(), "scores_2.json", &ordered);
    write_snapshot(temp.path(), "scores_4.json", &ordered);

    fo_cmd()
        .args(["compare", "--no-plot", "-d"])
        .arg(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("####").not());

    fo_cmd()
        .args(["compare", "-d"])
        .arg(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("####"));
}

#[test]
fn too_few_checkpoints_is_a_failure() {
    let temp = TempDir::new().expect("temp dir");
    write_snapshot(temp.path(), "scores_3.json", &[("a.png", 1.0, 1), ("b.png", 0.0, 1)]);

    fo_cmd()
        .args(["compare", "-d"])
        .arg(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least two checkpoints"));
}

#[test]
fn missing_directory_is_a_failure() {
    let temp = TempDir::new().expect("temp dir");
    fo_cmd()
        .args(["compare", "-d"])
        .arg(temp.path().join("nope"))
        .assert()
        .failure();
}

#[test]
fn corrupt_checkpoint_is_a_failure() {
    let temp = TempDir::new().expect("temp dir");
    write_snapshot(temp.path(), "scores_1.json", &[("a.png", 1.0, 1), ("b.png", 0.0, 1)]);
    std::fs::write(temp.path().join("scores_2.json"), "{ not json").expect("fixture written");

    fo_cmd()
        .args(["compare", "-d"])
        .arg(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("scores_2.json"));
}

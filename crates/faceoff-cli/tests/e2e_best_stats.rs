//! E2E tests for `fo best` (threshold export) and `fo stats` (snapshot
//! summary).

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{Value, json};
use std::path::Path;
use tempfile::TempDir;

fn fo_cmd() -> Command {
    let mut cmd = Command::cargo_bin("fo").expect("fo binary must exist");
    cmd.env("FACEOFF_LOG", "error");
    cmd
}

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

fn touch(path: &Path) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("parent dirs created");
    }
    std::fs::write(path, b"image-bytes").expect("file written");
}

// ---------------------------------------------------------------------------
// fo best
// ---------------------------------------------------------------------------

#[test]
fn best_copies_only_records_above_the_threshold() {
    let temp = TempDir::new().expect("temp dir");
    let keepers = temp.path().join("keepers");
    write_snapshot(
        temp.path(),
        "scores.json",
        &[("good.png", 0.35, 1), ("bad.png", -0.35, 1)],
    );
    touch(&temp.path().join("good.png"));
    touch(&temp.path().join("bad.png"));

    let output = fo_cmd()
        .args(["best", "-d"])
        .arg(temp.path())
        .arg("--save-in")
        .arg(&keepers)
        .args(["--threshold", "0.0", "--json"])
        .output()
        .expect("fo should not crash");
    assert!(output.status.success());
    let payload: Value = serde_json::from_slice(&output.stdout).expect("valid JSON");

    assert_eq!(payload["kept"], 1);
    assert_eq!(payload["dropped"], 1);
    assert_eq!(payload["copied"], 1);
    assert_eq!(payload["skipped"], 0);
    assert!(keepers.join("good.png").exists());
    assert!(!keepers.join("bad.png").exists());
}

#[test]
fn best_renames_on_collision_and_writes_the_savefile() {
    let temp = TempDir::new().expect("temp dir");
    let keepers = temp.path().join("keepers");
    write_snapshot(temp.path(), "scores.json", &[("img.png", 1.0, 2)]);
    touch(&temp.path().join("img.png"));
    // A file with the same name already sits in the target directory.
    touch(&keepers.join("img.png"));

    fo_cmd()
        .args(["best", "-d"])
        .arg(temp.path())
        .arg("--save-in")
        .arg(&keepers)
        .args(["--savefile", "kept.csv"])
        .assert()
        .success();

    assert!(keepers.join("img_1.png").exists());
    let table = std::fs::read_to_string(keepers.join("kept.csv")).expect("savefile exists");
    assert!(table.starts_with("id\tscore\tcomparisons"));
    assert!(table.contains("img.png"));
}

#[test]
fn best_counts_missing_backing_files() {
    let temp = TempDir::new().expect("temp dir");
    write_snapshot(temp.path(), "scores.json", &[("ghost.png", 5.0, 3)]);

    let output = fo_cmd()
        .args(["best", "-d"])
        .arg(temp.path())
        .arg("--save-in")
        .arg(temp.path().join("keepers"))
        .arg("--json")
        .output()
        .expect("fo should not crash");
    assert!(output.status.success());
    let payload: Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(payload["copied"], 0);
    assert_eq!(payload["skipped"], 1);
}

#[test]
fn best_loads_tabular_snapshots_too() {
    let temp = TempDir::new().expect("temp dir");
    std::fs::write(
        temp.path().join("scores.csv"),
        "id\tscore\tcomparisons\nkeep.png\t2.0\t5\ndrop.png\t-1.0\t5\n",
    )
    .expect("fixture written");
    touch(&temp.path().join("keep.png"));
    touch(&temp.path().join("drop.png"));

    let keepers = temp.path().join("keepers");
    fo_cmd()
        .args(["best", "-d"])
        .arg(temp.path())
        .arg("--save-in")
        .arg(&keepers)
        .args(["-s", "scores.csv"])
        .assert()
        .success();

    assert!(keepers.join("keep.png").exists());
    assert!(!keepers.join("drop.png").exists());
}

#[test]
fn best_fails_without_a_snapshot() {
    let temp = TempDir::new().expect("temp dir");
    fo_cmd()
        .args(["best", "-d"])
        .arg(temp.path())
        .arg("--save-in")
        .arg(temp.path().join("keepers"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("scores.json"));
}

// ---------------------------------------------------------------------------
// fo stats
// ---------------------------------------------------------------------------

#[test]
fn stats_summarizes_a_snapshot() {
    let temp = TempDir::new().expect("temp dir");
    write_snapshot(
        temp.path(),
        "scores.json",
        &[("a.png", 1.5, 3), ("b.png", 0.5, 3), ("c.png", -0.5, 2)],
    );

    fo_cmd()
        .args(["stats", "-d"])
        .arg(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("8 comparisons for"))
        .stdout(predicate::str::contains("3 records."))
        .stdout(predicate::str::contains("a.png"));
}

#[test]
fn stats_json_reports_ranking_and_histogram() {
    let temp = TempDir::new().expect("temp dir");
    write_snapshot(
        temp.path(),
        "scores.json",
        &[("low.png", -1.0, 2), ("high.png", 4.0, 2), ("mid.png", 1.0, 7)],
    );

    let output = fo_cmd()
        .args(["stats", "--top", "2", "--json", "-d"])
        .arg(temp.path())
        .output()
        .expect("fo should not crash");
    assert!(output.status.success());
    let payload: Value = serde_json::from_slice(&output.stdout).expect("valid JSON");

    assert_eq!(payload["records"], 3);
    assert_eq!(payload["total_comparisons"], 11);
    let top = payload["top"].as_array().expect("top is an array");
    assert_eq!(top.len(), 2);
    assert_eq!(top[0]["id"], "high.png");
    assert_eq!(top[1]["id"], "mid.png");
    assert_eq!(payload["histogram"]["2"], 2);
    assert_eq!(payload["histogram"]["7"], 1);
}

#[test]
fn stats_fails_on_unreadable_input() {
    let temp = TempDir::new().expect("temp dir");
    std::fs::write(temp.path().join("scores.json"), "{ nope").expect("fixture written");

    fo_cmd()
        .args(["stats", "-d"])
        .arg(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("scores.json"));
}

//! `fo best` — export the records above a score threshold.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use tracing::warn;

use crate::cmd::load_store_strict;
use crate::output::{OutputMode, render};

/// Arguments for `fo best`.
#[derive(Args, Debug)]
pub struct BestArgs {
    /// Directory holding the snapshot and the backing files.
    #[arg(short, long)]
    pub directory: PathBuf,

    /// Directory to copy the surviving files into.
    #[arg(long)]
    pub save_in: PathBuf,

    /// Snapshot filename (relative to the directory) to load scores from.
    #[arg(short, long, default_value = "scores.json")]
    pub scores: String,

    /// Keep records scoring at or above this threshold.
    #[arg(long, default_value_t = 0.0)]
    pub threshold: f64,

    /// Also write a tabular scorefile for the kept set (relative to the
    /// target directory).
    #[arg(long)]
    pub savefile: Option<String>,
}

/// Report payload for `fo best`.
#[derive(Debug, Serialize)]
struct BestPayload {
    threshold: f64,
    kept: usize,
    dropped: usize,
    copied: usize,
    /// Kept records whose backing file was already gone.
    skipped: usize,
}

/// Execute `fo best`.
pub fn run(args: &BestArgs, output: OutputMode) -> Result<()> {
    let snapshot_path = args.directory.join(&args.scores);
    let mut store = load_store_strict(&snapshot_path)?;

    let dropped = store.remove_where(|record| record.score < args.threshold);

    fs::create_dir_all(&args.save_in)
        .with_context(|| format!("failed to create {}", args.save_in.display()))?;

    let mut copied = 0;
    let mut skipped = 0;
    for record in store.records() {
        let source = args.directory.join(&record.id);
        if !source.is_file() {
            warn!(id = %record.id, "backing file is gone, not copying");
            skipped += 1;
            continue;
        }
        let target = free_target_name(&args.save_in, &record.id);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::copy(&source, &target)
            .with_context(|| format!("failed to copy {} to {}", source.display(), target.display()))?;
        copied += 1;
    }

    if let Some(ref savefile) = args.savefile {
        store
            .save_table(&args.save_in.join(savefile))
            .context("failed to write the kept-set scorefile")?;
    }

    let payload = BestPayload {
        threshold: args.threshold,
        kept: store.len(),
        dropped,
        copied,
        skipped,
    };

    render(output, &payload, |payload, w| render_best_human(payload, w))
}

/// First non-colliding name for `id` under `root`: the id itself, then
/// `<stem>_1.<ext>`, `<stem>_2.<ext>`, ...
fn free_target_name(root: &Path, id: &str) -> PathBuf {
    let plain = root.join(id);
    if !plain.exists() {
        return plain;
    }

    let id_path = Path::new(id);
    let stem = id_path
        .file_stem()
        .map_or_else(|| id.to_string(), |s| s.to_string_lossy().into_owned());
    let extension = id_path.extension().map(|e| e.to_string_lossy().into_owned());
    let parent = id_path.parent().unwrap_or_else(|| Path::new(""));

    let mut counter = 1;
    loop {
        let name = match &extension {
            Some(ext) => format!("{stem}_{counter}.{ext}"),
            None => format!("{stem}_{counter}"),
        };
        let candidate = root.join(parent).join(name);
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

fn render_best_human(payload: &BestPayload, w: &mut dyn Write) -> std::io::Result<()> {
    writeln!(
        w,
        "kept {} records at threshold {} ({} dropped)",
        payload.kept, payload.threshold, payload.dropped
    )?;
    writeln!(w, "copied {} files ({} missing)", payload.copied, payload.skipped)
}

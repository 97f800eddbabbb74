//! `fo stats` — one-snapshot summary.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use faceoff_core::record::ItemRecord;
use serde::Serialize;

use crate::cmd::load_store_strict;
use crate::output::{OutputMode, render};

/// Arguments for `fo stats`.
#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Directory holding the snapshot.
    #[arg(short, long)]
    pub directory: PathBuf,

    /// Snapshot filename (relative to the directory).
    #[arg(short, long, default_value = "scores.json")]
    pub scores: String,

    /// How many top-ranked records to list.
    #[arg(long, default_value_t = 10)]
    pub top: usize,
}

/// Report payload for `fo stats`.
#[derive(Debug, Serialize)]
struct StatsPayload {
    records: usize,
    total_comparisons: u64,
    top: Vec<ItemRecord>,
    /// `comparisons` value to how many records carry it.
    histogram: BTreeMap<u32, usize>,
}

/// Execute `fo stats`.
pub fn run(args: &StatsArgs, output: OutputMode) -> Result<()> {
    let mut store = load_store_strict(&args.directory.join(&args.scores))?;
    store.sort(true);

    let mut histogram = BTreeMap::new();
    for record in store.records() {
        *histogram.entry(record.comparisons).or_insert(0_usize) += 1;
    }

    let payload = StatsPayload {
        records: store.len(),
        total_comparisons: store.total_comparisons(),
        top: store.records().iter().take(args.top).cloned().collect(),
        histogram,
    };

    render(output, &payload, |payload, w| render_stats_human(payload, w))
}

fn render_stats_human(payload: &StatsPayload, w: &mut dyn Write) -> std::io::Result<()> {
    writeln!(
        w,
        "{:>6} comparisons for {:>6} records.",
        payload.total_comparisons, payload.records
    )?;

    if !payload.top.is_empty() {
        writeln!(w, "\nTop records:")?;
        for record in &payload.top {
            writeln!(w, "  {record}")?;
        }
    }

    writeln!(w, "\nComparison counts:")?;
    for (comparisons, count) in &payload.histogram {
        writeln!(w, "  {count:>4} records have {comparisons:>4} comparisons")?;
    }
    Ok(())
}

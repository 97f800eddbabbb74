//! `fo compare` — rank-correlation analysis across a run's checkpoints.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Args;
use faceoff_core::snapshot;
use faceoff_rank::correlate::{Correlation, ranking, spearman};
use serde::Serialize;

use crate::cmd::load_store_strict;
use crate::output::{OutputMode, render};

const CHART_WIDTH: usize = 40;

/// Arguments for `fo compare`.
#[derive(Args, Debug)]
pub struct CompareArgs {
    /// Directory holding the snapshots.
    #[arg(short, long)]
    pub directory: PathBuf,

    /// Base snapshot filename whose numbered checkpoints are analyzed.
    #[arg(short, long, default_value = "scores.json")]
    pub scores: String,

    /// Model-prediction snapshot to correlate against every checkpoint.
    #[arg(long)]
    pub model: Option<PathBuf>,

    /// Suppress the chart in human output.
    #[arg(long)]
    pub no_plot: bool,
}

/// One point of a correlation series.
#[derive(Debug, Clone, Serialize)]
struct SeriesPoint {
    /// Total comparisons at the (later) checkpoint.
    total_comparisons: u64,
    coefficient: f64,
    p_value: f64,
    n: usize,
}

impl SeriesPoint {
    fn new(total_comparisons: u64, correlation: Correlation) -> Self {
        Self {
            total_comparisons,
            coefficient: correlation.coefficient,
            p_value: correlation.p_value,
            n: correlation.n,
        }
    }
}

/// Report payload for `fo compare`.
#[derive(Debug, Serialize)]
struct ComparePayload {
    checkpoints: Vec<u64>,
    /// Agreement between each checkpoint and its predecessor.
    successive: Vec<SeriesPoint>,
    /// Agreement between the model prediction and each checkpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<Vec<SeriesPoint>>,
}

/// Execute `fo compare`.
pub fn run(args: &CompareArgs, output: OutputMode) -> Result<()> {
    let checkpoints = snapshot::find_checkpoints(&args.directory, &args.scores)
        .with_context(|| format!("failed to list {}", args.directory.display()))?;
    if checkpoints.len() < 2 && args.model.is_none() {
        bail!(
            "need at least two checkpoints of {} in {} (found {})",
            args.scores,
            args.directory.display(),
            checkpoints.len()
        );
    }

    let mut rankings = Vec::with_capacity(checkpoints.len());
    for (count, path) in &checkpoints {
        let store = load_store_strict(path)?;
        rankings.push((*count, ranking(&store)));
    }

    let mut successive = Vec::new();
    for pair in rankings.windows(2) {
        let (_, earlier) = &pair[0];
        let (count, later) = &pair[1];
        if let Some(correlation) = spearman(earlier, later) {
            successive.push(SeriesPoint::new(*count, correlation));
        }
    }

    let model = match &args.model {
        Some(model_path) => {
            let model_store = load_store_strict(model_path)?;
            let model_ranking = ranking(&model_store);
            let series: Vec<SeriesPoint> = rankings
                .iter()
                .filter_map(|(count, checkpoint)| {
                    spearman(&model_ranking, checkpoint)
                        .map(|correlation| SeriesPoint::new(*count, correlation))
                })
                .collect();
            Some(series)
        }
        None => None,
    };

    let payload = ComparePayload {
        checkpoints: checkpoints.iter().map(|&(count, _)| count).collect(),
        successive,
        model,
    };

    let plot = !args.no_plot;
    render(output, &payload, |payload, w| {
        render_compare_human(payload, plot, w)
    })
}

fn render_compare_human(
    payload: &ComparePayload,
    plot: bool,
    w: &mut dyn Write,
) -> std::io::Result<()> {
    if let Some(ref model) = payload.model {
        writeln!(w, "Comparison with model predictions")?;
        render_series(model, plot, w)?;
        writeln!(w)?;
    }

    writeln!(w, "Comparisons with previous checkpoint")?;
    render_series(&payload.successive, plot, w)
}

fn render_series(series: &[SeriesPoint], plot: bool, w: &mut dyn Write) -> std::io::Result<()> {
    for point in series {
        write!(
            w,
            "  at {:>8} comparisons  rho {:+.4}  (p = {:.3e}, n = {})",
            point.total_comparisons, point.coefficient, point.p_value, point.n
        )?;
        if plot {
            write!(w, "  {}", bar(point.coefficient))?;
        }
        writeln!(w)?;
    }
    Ok(())
}

/// Bar for one coefficient: `[-1, 1]` mapped onto the chart width.
fn bar(coefficient: f64) -> String {
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let filled = (((coefficient.clamp(-1.0, 1.0) + 1.0) / 2.0) * CHART_WIDTH as f64).round() as usize;
    let mut rendered = String::with_capacity(CHART_WIDTH);
    for _ in 0..filled {
        rendered.push('#');
    }
    for _ in filled..CHART_WIDTH {
        rendered.push('.');
    }
    rendered
}

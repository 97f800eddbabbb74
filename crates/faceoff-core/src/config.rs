//! Engine configuration.
//!
//! Loaded from TOML and passed into each component at construction; there
//! is no ambient global configuration anywhere in the engine.

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which score-update engine a session runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    /// Elo-style logistic updates with running statistics.
    #[default]
    Statistical,
    /// Exact partial order via transitive closure.
    Exact,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub engine: EngineKind,

    /// Learning rate for the statistical updater.
    #[serde(default = "default_k")]
    pub k: f64,

    /// Clamp range applied to externally derived k-factor scales
    /// (e.g. response-latency weighting). The timing source itself is a
    /// collaborator concern; the engine only clamps what it is handed.
    #[serde(default = "default_k_scale_min")]
    pub k_scale_min: f64,
    #[serde(default = "default_k_scale_max")]
    pub k_scale_max: f64,

    /// Preference strength for under-sampled records, in `[0, 1)`.
    /// Zero means uniform selection.
    #[serde(default = "default_low_count_weight")]
    pub low_count_weight: f64,

    /// Reserve one slot per round for a uniformly random pick, so strong
    /// bias settings still explore the whole collection.
    #[serde(default)]
    pub explore: bool,

    /// How many records to show per comparison round.
    #[serde(default = "default_pick_size")]
    pub pick_size: usize,

    /// Comparison budget for one session; `None` runs until cancelled.
    #[serde(default)]
    pub max_comparisons: Option<u64>,

    #[serde(default = "default_snapshot_filename")]
    pub snapshot_filename: String,

    /// Also write a numbered checkpoint on every save.
    #[serde(default = "default_true")]
    pub checkpoint: bool,

    /// How many top records the final report lists; zero disables.
    #[serde(default = "default_show_top_n")]
    pub show_top_n: usize,

    /// The final report counts records with fewer comparisons than this.
    #[serde(default = "default_low_comparison_threshold")]
    pub low_comparison_threshold: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            engine: EngineKind::default(),
            k: default_k(),
            k_scale_min: default_k_scale_min(),
            k_scale_max: default_k_scale_max(),
            low_count_weight: default_low_count_weight(),
            explore: false,
            pick_size: default_pick_size(),
            max_comparisons: None,
            snapshot_filename: default_snapshot_filename(),
            checkpoint: default_true(),
            show_top_n: default_show_top_n(),
            low_comparison_threshold: default_low_comparison_threshold(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file; a missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Unreadable or invalid TOML, or out-of-range values.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the value ranges the engine depends on.
    ///
    /// # Errors
    ///
    /// A descriptive error for the first violated range.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            (0.0..1.0).contains(&self.low_count_weight),
            "low_count_weight must be in [0, 1), got {}",
            self.low_count_weight
        );
        ensure!(self.k > 0.0, "k must be positive, got {}", self.k);
        ensure!(
            self.k_scale_min <= self.k_scale_max,
            "k_scale_min ({}) must not exceed k_scale_max ({})",
            self.k_scale_min,
            self.k_scale_max
        );
        ensure!(
            self.pick_size >= 2,
            "pick_size must be at least 2, got {}",
            self.pick_size
        );
        Ok(())
    }
}

fn default_k() -> f64 {
    0.7
}

fn default_k_scale_min() -> f64 {
    0.5
}

fn default_k_scale_max() -> f64 {
    1.5
}

fn default_low_count_weight() -> f64 {
    0.4
}

fn default_pick_size() -> usize {
    2
}

fn default_snapshot_filename() -> String {
    "scores.json".to_string()
}

fn default_true() -> bool {
    true
}

fn default_show_top_n() -> usize {
    10
}

fn default_low_comparison_threshold() -> u32 {
    5
}

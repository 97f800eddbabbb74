//! Elo-style statistical score updates.
//!
//! # Algorithm
//!
//! For one judgment "winner beats loser":
//!
//! ```text
//! delta = winner.score - loser.score
//! p     = 1 / (1 + 10^(-delta))
//! winner.score += (1 - p) * k * k_scale
//! loser.score  -= (1 - p) * k * k_scale
//! ```
//!
//! `p` is the probability the winner was predicted to win; the transfer is
//! symmetric, so the score sum of the pair is conserved. `k` is the
//! engine-wide learning rate; `k_scale` is an externally derived per-judgment
//! multiplier (e.g. from response latency), clamped by [`clamp_k_scale`]
//! before it reaches the update. The updater never measures timing itself.
//!
//! Running accuracy statistics use the incremental mean
//! `mean <- (n * mean + x) / (n + 1)`, applied before the comparison count
//! increments.

use faceoff_core::record::ItemRecord;
use serde::Serialize;
use tracing::debug;

/// Running accuracy statistics across one updater's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct EloStats {
    /// Judgments processed.
    pub total_comparisons: u64,
    /// Mean of `p` (prediction confidence for the observed winner).
    pub average_p: f64,
    /// Mean of `max(p, 1 - p)` (confidence regardless of direction).
    pub average_best_p: f64,
    /// Judgments where the pre-update favourite actually won (`p > 0.5`).
    pub favourite_wins: u64,
}

impl EloStats {
    /// Fraction of judgments won by the pre-existing favourite.
    #[must_use]
    pub fn favourite_win_rate(&self) -> f64 {
        if self.total_comparisons == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let rate = self.favourite_wins as f64 / self.total_comparisons as f64;
        rate
    }
}

/// The statistical score updater.
#[derive(Debug, Clone)]
pub struct EloUpdater {
    k: f64,
    stats: EloStats,
}

impl EloUpdater {
    #[must_use]
    pub fn new(k: f64) -> Self {
        Self {
            k,
            stats: EloStats::default(),
        }
    }

    #[must_use]
    pub const fn k(&self) -> f64 {
        self.k
    }

    #[must_use]
    pub const fn stats(&self) -> &EloStats {
        &self.stats
    }

    /// Apply one judgment. Both records' comparison counters increment;
    /// the statistics fold in `p` before the global count moves.
    pub fn update(&mut self, winner: &mut ItemRecord, loser: &mut ItemRecord, k_scale: f64) {
        let delta = winner.score - loser.score;
        let p = 1.0 / (1.0 + 10f64.powf(-delta));
        let transfer = (1.0 - p) * self.k * k_scale;

        winner.score += transfer;
        loser.score -= transfer;
        winner.comparisons += 1;
        loser.comparisons += 1;

        #[allow(clippy::cast_precision_loss)]
        let n = self.stats.total_comparisons as f64;
        self.stats.average_p = (n * self.stats.average_p + p) / (n + 1.0);
        self.stats.average_best_p =
            (n * self.stats.average_best_p + p.max(1.0 - p)) / (n + 1.0);
        if p > 0.5 {
            self.stats.favourite_wins += 1;
        }
        self.stats.total_comparisons += 1;

        debug!(
            winner = %winner.id,
            loser = %loser.id,
            p,
            transfer,
            "applied statistical update"
        );
    }
}

/// Clamp an externally derived k-factor scale to the configured range.
#[must_use]
pub fn clamp_k_scale(raw: f64, min: f64, max: f64) -> f64 {
    if !raw.is_finite() {
        return min;
    }
    raw.clamp(min, max)
}

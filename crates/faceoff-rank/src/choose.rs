//! Weighted record selection.
//!
//! The chooser biases comparison rounds toward under-sampled records via
//! `weight(r) = (1 - lambda)^comparisons(r)`; `lambda = 0` degenerates to a
//! uniform draw. Strategies are a closed enum chosen by configuration, not
//! injected callables.
//!
//! Draws are independent weighted samples; a draw containing a duplicate is
//! discarded and retried in full. The caller contract `n <= population`
//! guarantees the retry loop terminates.

use std::collections::HashSet;

use faceoff_core::record::ItemRecord;
use faceoff_core::store::RecordStore;
use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};
use tracing::trace;

use crate::error::EngineError;

/// How a single record's selection weight is derived.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WeightStrategy {
    /// Every record weighs 1.0.
    Uniform,
    /// `(1 - lambda)^comparisons`: the more often a record has been shown,
    /// the less likely it is shown again. `lambda` must be in `[0, 1)`.
    LowCountBias { lambda: f64 },
}

impl WeightStrategy {
    /// Build the configured strategy; `lambda = 0` is the uniform draw.
    #[must_use]
    pub fn from_bias(lambda: f64) -> Self {
        if lambda > 0.0 {
            Self::LowCountBias { lambda }
        } else {
            Self::Uniform
        }
    }

    #[must_use]
    pub fn weight(&self, record: &ItemRecord) -> f64 {
        match self {
            Self::Uniform => 1.0,
            Self::LowCountBias { lambda } => {
                (1.0 - lambda).powf(f64::from(record.comparisons))
            }
        }
    }
}

/// Whether one slot per round escapes the weighting entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    /// All `n` picks are weighted.
    Weighted,
    /// `n - 1` weighted picks plus exactly one uniform pick, so strong bias
    /// settings still revisit the whole collection periodically.
    WeightedWithExplorer,
}

/// Selects the set of distinct records for the next comparison round.
#[derive(Debug, Clone)]
pub struct Chooser {
    strategy: WeightStrategy,
    mode: SelectionMode,
}

impl Chooser {
    #[must_use]
    pub const fn new(strategy: WeightStrategy, mode: SelectionMode) -> Self {
        Self { strategy, mode }
    }

    /// Pick `n` distinct records from the store.
    ///
    /// # Errors
    ///
    /// [`EngineError::InsufficientPopulation`] when `n` exceeds the store's
    /// record count (the retry loop could never terminate otherwise).
    pub fn pick(
        &self,
        store: &RecordStore,
        n: usize,
        rng: &mut impl Rng,
    ) -> Result<Vec<String>, EngineError> {
        if n > store.len() {
            return Err(EngineError::InsufficientPopulation {
                needed: n,
                found: store.len(),
            });
        }
        if n == 0 {
            return Ok(Vec::new());
        }

        let records = store.records();
        let weights: Vec<f64> = records.iter().map(|r| self.strategy.weight(r)).collect();

        loop {
            let mut draw = Vec::with_capacity(n);
            let weighted_picks = match self.mode {
                SelectionMode::Weighted => n,
                SelectionMode::WeightedWithExplorer => n - 1,
            };

            for _ in 0..weighted_picks {
                let Some(index) = weighted_index(&weights, rng) else {
                    return Err(EngineError::InsufficientPopulation {
                        needed: n,
                        found: 0,
                    });
                };
                draw.push(index);
            }
            if self.mode == SelectionMode::WeightedWithExplorer {
                draw.push(rng.gen_range(0..records.len()));
            }

            let distinct: HashSet<usize> = draw.iter().copied().collect();
            if distinct.len() == n {
                return Ok(draw.into_iter().map(|i| records[i].id.clone()).collect());
            }
            trace!("duplicate in weighted draw, retrying");
        }
    }
}

/// Shared weighted-sampling primitive: one index drawn with probability
/// proportional to its weight. Zero-weight entries are never chosen;
/// returns `None` when no entry is drawable.
pub(crate) fn weighted_index(weights: &[f64], rng: &mut impl Rng) -> Option<usize> {
    let distribution = WeightedIndex::new(weights.iter().copied()).ok()?;
    Some(distribution.sample(rng))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn store_of(entries: &[(&str, u32)]) -> RecordStore {
        let records = entries
            .iter()
            .map(|&(id, comparisons)| ItemRecord::with_score(id, 0.0, comparisons))
            .collect();
        RecordStore::from_records(records).expect("test ids are unique")
    }

    fn assert_approx_eq(actual: f64, expected: f64) {
        let tolerance = 1e-10;
        assert!(
            (actual - expected).abs() <= tolerance,
            "actual ({actual}) != expected ({expected})"
        );
    }

    #[test]
    fn low_count_bias_weights_decay_geometrically() {
        // Scenario B: lambda = 0.4.
        let strategy = WeightStrategy::from_bias(0.4);
        assert_approx_eq(strategy.weight(&ItemRecord::new("a")), 1.0);
        assert_approx_eq(strategy.weight(&ItemRecord::with_score("b", 0.0, 3)), 0.216);
    }

    #[test]
    fn zero_bias_degenerates_to_uniform() {
        let strategy = WeightStrategy::from_bias(0.0);
        assert_eq!(strategy, WeightStrategy::Uniform);
        assert_approx_eq(strategy.weight(&ItemRecord::with_score("a", 0.0, 50)), 1.0);
    }

    #[test]
    fn pick_returns_exactly_n_distinct_ids() {
        let store = store_of(&[("a", 0), ("b", 2), ("c", 5), ("d", 9)]);
        let chooser = Chooser::new(WeightStrategy::from_bias(0.4), SelectionMode::Weighted);
        let mut rng = StdRng::seed_from_u64(7);

        for n in [2, 3, 4] {
            let picked = chooser.pick(&store, n, &mut rng).expect("pick succeeds");
            assert_eq!(picked.len(), n);
            let distinct: HashSet<&String> = picked.iter().collect();
            assert_eq!(distinct.len(), n);
        }
    }

    #[test]
    fn pick_rejects_oversized_requests() {
        let store = store_of(&[("a", 0), ("b", 0)]);
        let chooser = Chooser::new(WeightStrategy::Uniform, SelectionMode::Weighted);
        let mut rng = StdRng::seed_from_u64(7);

        let err = chooser.pick(&store, 3, &mut rng).expect_err("3 of 2 must fail");
        assert!(matches!(
            err,
            EngineError::InsufficientPopulation { needed: 3, found: 2 }
        ));
    }

    #[test]
    fn bias_prefers_under_sampled_records() {
        // One fresh record against one heavily sampled record under a
        // strong bias: single draws should essentially always land on the
        // fresh record (weight("tired") = 0.1^20).
        let store = store_of(&[("fresh", 0), ("tired", 20)]);
        let chooser = Chooser::new(WeightStrategy::from_bias(0.9), SelectionMode::Weighted);
        let mut rng = StdRng::seed_from_u64(42);

        let mut fresh = 0;
        for _ in 0..200 {
            let picked = chooser.pick(&store, 1, &mut rng).expect("pick succeeds");
            if picked[0] == "fresh" {
                fresh += 1;
            }
        }
        assert_eq!(fresh, 200);
    }

    #[test]
    fn explorer_mode_still_returns_distinct_sets() {
        let store = store_of(&[("a", 0), ("b", 30), ("c", 30)]);
        let chooser =
            Chooser::new(WeightStrategy::from_bias(0.9), SelectionMode::WeightedWithExplorer);
        let mut rng = StdRng::seed_from_u64(11);

        for _ in 0..100 {
            let picked = chooser.pick(&store, 2, &mut rng).expect("pick succeeds");
            let distinct: HashSet<&String> = picked.iter().collect();
            assert_eq!(distinct.len(), 2);
        }
    }

    #[test]
    fn explorer_mode_reaches_heavily_sampled_records() {
        // With bias this strong the weighted slot essentially never picks
        // "tired"; only the uniform slot can. Seen at all means the
        // explorer slot works.
        let store = store_of(&[("fresh-1", 0), ("fresh-2", 0), ("tired", 200)]);
        let chooser =
            Chooser::new(WeightStrategy::from_bias(0.99), SelectionMode::WeightedWithExplorer);
        let mut rng = StdRng::seed_from_u64(3);

        let mut tired_seen = false;
        for _ in 0..300 {
            let picked = chooser.pick(&store, 2, &mut rng).expect("pick succeeds");
            if picked.iter().any(|id| id == "tired") {
                tired_seen = true;
                break;
            }
        }
        assert!(tired_seen, "uniform slot never reached the sampled-out record");
    }

    #[test]
    fn weighted_index_excludes_zero_weights() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..50 {
            let picked = weighted_index(&[0.0, 1.0, 0.0], &mut rng).expect("drawable");
            assert_eq!(picked, 1);
        }
        assert!(weighted_index(&[0.0, 0.0], &mut rng).is_none());
        assert!(weighted_index(&[], &mut rng).is_none());
    }
}

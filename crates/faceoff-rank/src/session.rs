//! The engine side of the judgment loop.
//!
//! A driver (graphical or otherwise, out of scope here) repeatedly asks
//! [`Session::next_round`] for records to show, forwards the human's choice
//! to [`Session::judge`], and finally calls [`Session::finish`]. The loop
//! state is an explicit [`Round`] value; cancellation takes the same
//! `finish` path as normal completion, so the final save and report are
//! never skipped. All operations run to completion before the next judgment
//! is accepted; nothing is retried.

use std::collections::BTreeMap;
use std::path::Path;

use faceoff_core::config::{EngineConfig, EngineKind};
use faceoff_core::record::ItemRecord;
use faceoff_core::store::RecordStore;
use rand::Rng;
use serde::Serialize;
use tracing::info;

use crate::choose::{Chooser, SelectionMode, WeightStrategy};
use crate::closure::ExactEngine;
use crate::elo::{EloStats, EloUpdater, clamp_k_scale};
use crate::error::EngineError;

/// Whether the driver loop should keep going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Round {
    Continue,
    /// The comparison budget is spent, or the exact order is complete.
    Finished,
}

#[derive(Debug)]
enum Updater {
    Statistical(EloUpdater),
    Exact(ExactEngine),
}

/// Final report returned by [`Session::finish`].
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub records: usize,
    pub total_comparisons: u64,
    pub rounds: u64,
    /// Top of the final ranking, up to the configured `show_top_n`.
    pub top: Vec<ItemRecord>,
    /// `comparisons` value to how many records carry it.
    pub histogram: BTreeMap<u32, usize>,
    /// Records still under the configured low-comparison threshold.
    pub under_threshold: usize,
    /// Statistical-mode accuracy statistics.
    pub statistics: Option<EloStats>,
    /// Exact-mode open-pair counter (zero means a total order).
    pub remaining_undetermined: Option<usize>,
}

/// One ranking session over a record store.
#[derive(Debug)]
pub struct Session {
    store: RecordStore,
    config: EngineConfig,
    chooser: Chooser,
    updater: Updater,
    rounds: u64,
}

impl Session {
    /// Start a session.
    ///
    /// # Errors
    ///
    /// [`EngineError::InsufficientPopulation`] when the store holds fewer
    /// than two records, or fewer than the configured pick size. Fatal at
    /// startup by contract.
    pub fn new(store: RecordStore, config: EngineConfig) -> Result<Self, EngineError> {
        let needed = config.pick_size.max(2);
        if store.len() < needed {
            return Err(EngineError::InsufficientPopulation {
                needed,
                found: store.len(),
            });
        }

        let mode = if config.explore {
            SelectionMode::WeightedWithExplorer
        } else {
            SelectionMode::Weighted
        };
        let chooser = Chooser::new(WeightStrategy::from_bias(config.low_count_weight), mode);
        let updater = match config.engine {
            EngineKind::Statistical => Updater::Statistical(EloUpdater::new(config.k)),
            EngineKind::Exact => Updater::Exact(ExactEngine::new(&store)),
        };

        info!(records = store.len(), engine = ?config.engine, "session started");
        Ok(Self {
            store,
            config,
            chooser,
            updater,
            rounds: 0,
        })
    }

    #[must_use]
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    #[must_use]
    pub const fn rounds(&self) -> u64 {
        self.rounds
    }

    /// Select the records for the next comparison round.
    ///
    /// Returns `None` when there is nothing left to compare (exact mode
    /// only; the statistical engine can always produce a round).
    ///
    /// # Errors
    ///
    /// Selection contract violations ([`EngineError::InsufficientPopulation`]).
    pub fn next_round(&mut self, rng: &mut impl Rng) -> Result<Option<Vec<String>>, EngineError> {
        match &self.updater {
            Updater::Statistical(_) => self
                .chooser
                .pick(&self.store, self.config.pick_size, rng)
                .map(Some),
            Updater::Exact(engine) => {
                Ok(engine.pick_pair(rng).map(|(a, b)| vec![a, b]))
            }
        }
    }

    /// Record that the human preferred `winner` over every other record in
    /// `shown`. The `k_scale` input (externally derived, typically from
    /// response latency) is clamped to the configured range; pass `1.0`
    /// when speed weighting is off.
    ///
    /// # Errors
    ///
    /// Unknown ids, or an exact-mode precondition violation. Violations
    /// abort the update and propagate; the session must not continue.
    pub fn judge(
        &mut self,
        winner: &str,
        shown: &[String],
        k_scale: f64,
    ) -> Result<Round, EngineError> {
        if !self.store.contains(winner) {
            return Err(EngineError::UnknownId(winner.to_string()));
        }

        match &mut self.updater {
            Updater::Statistical(elo) => {
                let scale =
                    clamp_k_scale(k_scale, self.config.k_scale_min, self.config.k_scale_max);
                for other in shown.iter().filter(|id| id.as_str() != winner) {
                    let (winner_record, loser_record) = self.store.pair_mut(winner, other)?;
                    elo.update(winner_record, loser_record, scale);
                }
            }
            Updater::Exact(engine) => {
                for other in shown.iter().filter(|id| id.as_str() != winner) {
                    engine.apply(&mut self.store, winner, other)?;
                }
            }
        }
        self.rounds += 1;

        Ok(self.round_state())
    }

    /// Sort, persist (snapshot, checkpoint, tabular export), and report.
    ///
    /// This is the cancellation path as well as the normal one: a save
    /// failure here is fatal and propagates, never swallowed.
    ///
    /// # Errors
    ///
    /// [`EngineError::Store`] on any persistence failure.
    pub fn finish(&mut self, directory: &Path) -> Result<SessionReport, EngineError> {
        self.store.sort(true);

        let snapshot_path = directory.join(&self.config.snapshot_filename);
        self.store.save(&snapshot_path, self.config.checkpoint)?;
        self.store
            .save_table(&snapshot_path.with_extension("csv"))?;

        let report = self.report();
        info!(
            records = report.records,
            total_comparisons = report.total_comparisons,
            rounds = report.rounds,
            "session finished"
        );
        Ok(report)
    }

    /// Build the running report without persisting anything.
    #[must_use]
    pub fn report(&self) -> SessionReport {
        let mut histogram = BTreeMap::new();
        for record in self.store.records() {
            *histogram.entry(record.comparisons).or_insert(0) += 1;
        }
        let under_threshold = self
            .store
            .records()
            .iter()
            .filter(|r| r.comparisons < self.config.low_comparison_threshold)
            .count();

        let mut top: Vec<ItemRecord> = self.store.records().to_vec();
        top.sort_by(|a, b| b.score.total_cmp(&a.score));
        top.truncate(self.config.show_top_n);

        let (statistics, remaining_undetermined) = match &self.updater {
            Updater::Statistical(elo) => (Some(*elo.stats()), None),
            Updater::Exact(engine) => (None, Some(engine.total_undetermined())),
        };

        SessionReport {
            records: self.store.len(),
            total_comparisons: self.store.total_comparisons(),
            rounds: self.rounds,
            top,
            histogram,
            under_threshold,
            statistics,
            remaining_undetermined,
        }
    }

    fn round_state(&self) -> Round {
        if let Some(budget) = self.config.max_comparisons
            && self.rounds >= budget
        {
            return Round::Finished;
        }
        if let Updater::Exact(engine) = &self.updater
            && engine.is_complete()
        {
            return Round::Finished;
        }
        Round::Continue
    }
}

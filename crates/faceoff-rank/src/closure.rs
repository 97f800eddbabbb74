//! Exact ranking via transitive closure of direct judgments.
//!
//! # Overview
//!
//! Instead of nudging scores statistically, this engine builds the partial
//! order implied by the judgments seen so far and closes it transitively:
//! whatever the loser had already beaten is now also beaten by the winner,
//! and whatever had already beaten the winner now also beats the loser.
//!
//! Per record the engine tracks two index sets: `defeated` (transitively
//! proven worse) and `undetermined` (no relation established yet). For any
//! two distinct records exactly one of three states holds: one defeats the
//! other, or the pair is mutually undetermined. A record's score is
//! `|defeated|`, rewritten into the store after every update; once
//! [`ExactEngine::total_undetermined`] reaches zero the scores form the
//! permutation `0..R-1` and the order is total.
//!
//! # Propagation
//!
//! Propagation runs on an explicit FIFO worklist rather than recursion, so
//! stack depth stays bounded for large collections. A popped pair that is
//! already resolved in the same direction is skipped; one resolved in the
//! opposite direction is a fatal [`EngineError::PreconditionViolation`],
//! exactly like judging the same pair twice. Intransitive human judgments
//! surface through that same violation; the engine makes no attempt to
//! detect cycles in advance or to reconcile contradictions.

use std::collections::{HashMap, HashSet, VecDeque};

use faceoff_core::store::RecordStore;
use rand::Rng;
use tracing::debug;

use crate::choose::weighted_index;
use crate::error::EngineError;

/// The exact-mode score updater and its relation state.
///
/// The relation sets exist only while this engine runs; they are not part
/// of the persisted record. `comparisons` counters are untouched in this
/// mode (the score is purely rank-derived).
#[derive(Debug, Clone)]
pub struct ExactEngine {
    ids: Vec<String>,
    index: HashMap<String, usize>,
    defeated: Vec<HashSet<usize>>,
    undetermined: Vec<HashSet<usize>>,
}

impl ExactEngine {
    /// Start from a store with every pair mutually undetermined.
    #[must_use]
    pub fn new(store: &RecordStore) -> Self {
        let ids: Vec<String> = store.records().iter().map(|r| r.id.clone()).collect();
        let count = ids.len();
        let index = ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();
        let undetermined = (0..count)
            .map(|i| (0..count).filter(|&j| j != i).collect())
            .collect();

        Self {
            ids,
            index,
            defeated: vec![HashSet::new(); count],
            undetermined,
        }
    }

    /// Apply one direct judgment and close it transitively, writing
    /// `score = |defeated|` back into the store for every touched record.
    ///
    /// Returns the number of relations established (the direct judgment
    /// plus everything inferred).
    ///
    /// # Errors
    ///
    /// [`EngineError::UnknownId`] for ids the engine was not built with;
    /// [`EngineError::PreconditionViolation`] when the pair is not mutually
    /// undetermined, or when propagation meets a contradicting relation.
    /// Violations are fatal: the engine state is not rolled back and must
    /// not be reused.
    pub fn apply(
        &mut self,
        store: &mut RecordStore,
        winner: &str,
        loser: &str,
    ) -> Result<usize, EngineError> {
        let seed_w = self.position(winner)?;
        let seed_l = self.position(loser)?;
        if seed_w == seed_l || !self.mutually_undetermined(seed_w, seed_l) {
            return Err(self.violation(seed_w, seed_l));
        }

        let mut queue = VecDeque::from([(seed_w, seed_l)]);
        let mut touched = HashSet::new();
        let mut applied = 0;

        while let Some((w, l)) = queue.pop_front() {
            if self.defeated[w].contains(&l) {
                // Already inferred along another path.
                continue;
            }
            if self.defeated[l].contains(&w) {
                return Err(self.violation(w, l));
            }

            self.undetermined[w].remove(&l);
            self.undetermined[l].remove(&w);
            self.defeated[w].insert(l);
            touched.insert(w);
            touched.insert(l);
            applied += 1;

            for third in 0..self.ids.len() {
                if third == w || third == l {
                    continue;
                }
                // The winner inherits everything the loser already beat.
                if self.defeated[l].contains(&third) && self.undetermined[w].contains(&third) {
                    queue.push_back((w, third));
                }
                // Everything that already beat the winner also beats the loser.
                if self.defeated[third].contains(&w) && self.undetermined[third].contains(&l) {
                    queue.push_back((third, l));
                }
            }
        }

        for i in touched {
            if let Some(record) = store.get_mut(&self.ids[i]) {
                #[allow(clippy::cast_precision_loss)]
                let score = self.defeated[i].len() as f64;
                record.score = score;
            }
        }

        debug!(winner, loser, applied, remaining = self.total_undetermined(), "closed judgment");
        Ok(applied)
    }

    /// Pick the next pair to put in front of the human: `a` weighted by
    /// `1 / |a.undetermined|` (near-resolved records first, to shrink the
    /// frontier), then `b` from `a`'s undetermined partners weighted by
    /// `|b.undetermined|` (partners likely to trigger the largest cascade).
    ///
    /// Returns `None` once no undetermined pairs remain.
    pub fn pick_pair(&self, rng: &mut impl Rng) -> Option<(String, String)> {
        let weights_a: Vec<f64> = self.undetermined.iter().map(inverse_frontier).collect();
        let a = weighted_index(&weights_a, rng)?;

        let mut partners: Vec<usize> = self.undetermined[a].iter().copied().collect();
        partners.sort_unstable();
        #[allow(clippy::cast_precision_loss)]
        let weights_b: Vec<f64> = partners
            .iter()
            .map(|&b| self.undetermined[b].len() as f64)
            .collect();
        let b = partners[weighted_index(&weights_b, rng)?];

        Some((self.ids[a].clone(), self.ids[b].clone()))
    }

    /// Sum of `|undetermined|` across all records (each open pair counts
    /// twice). Zero means a full total order has been derived.
    #[must_use]
    pub fn total_undetermined(&self) -> usize {
        self.undetermined.iter().map(HashSet::len).sum()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.total_undetermined() == 0
    }

    /// How many records this record transitively defeats.
    #[must_use]
    pub fn defeated_count(&self, id: &str) -> Option<usize> {
        self.index.get(id).map(|&i| self.defeated[i].len())
    }

    /// Whether `winner` has been proven (directly or transitively) to beat
    /// `loser`.
    #[must_use]
    pub fn defeats(&self, winner: &str, loser: &str) -> bool {
        match (self.index.get(winner), self.index.get(loser)) {
            (Some(&w), Some(&l)) => self.defeated[w].contains(&l),
            _ => false,
        }
    }

    fn position(&self, id: &str) -> Result<usize, EngineError> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| EngineError::UnknownId(id.to_string()))
    }

    fn mutually_undetermined(&self, a: usize, b: usize) -> bool {
        self.undetermined[a].contains(&b) && self.undetermined[b].contains(&a)
    }

    fn violation(&self, winner: usize, loser: usize) -> EngineError {
        EngineError::PreconditionViolation {
            winner: self.ids[winner].clone(),
            loser: self.ids[loser].clone(),
        }
    }
}

/// Selection weight for the first pick: near-resolved records first.
#[allow(clippy::cast_precision_loss)]
fn inverse_frontier(undetermined: &HashSet<usize>) -> f64 {
    if undetermined.is_empty() {
        0.0
    } else {
        1.0 / undetermined.len() as f64
    }
}

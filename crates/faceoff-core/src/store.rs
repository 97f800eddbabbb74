//! The record store: an ordered collection of [`ItemRecord`]s with an id
//! index, reconciliation against a discovered file set, and snapshot
//! persistence.
//!
//! Insertion order is preserved and acts as the stable tie-break when
//! sorting by score; it carries no other meaning.

use std::collections::HashMap;
use std::path::Path;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::record::ItemRecord;
use crate::snapshot;

/// Counts from one [`RecordStore::reconcile`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// Records created for newly discovered ids.
    pub added: usize,
    /// Records dropped because their backing item no longer validates.
    pub removed: usize,
}

/// Ordered mapping from id to [`ItemRecord`].
///
/// Invariants: ids are unique; a fresh record starts at
/// `score = 0.0, comparisons = 0`.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    records: Vec<ItemRecord>,
    index: HashMap<String, usize>,
    metadata: Map<String, Value>,
}

impl RecordStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from records, rejecting duplicate ids.
    ///
    /// # Errors
    ///
    /// [`StoreError::DuplicateId`] if two records share an id.
    pub fn from_records(records: Vec<ItemRecord>) -> Result<Self, StoreError> {
        let mut store = Self::new();
        for record in records {
            store.insert(record)?;
        }
        Ok(store)
    }

    /// Load a store from a snapshot file, dispatching on extension
    /// (`.json` is map form, anything else tabular form).
    ///
    /// A missing or corrupt snapshot is not fatal: the problem is logged as
    /// a warning and an empty store is returned, per the load policy.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            warn!(path = %path.display(), "no snapshot to load, starting empty");
            return Self::new();
        }

        let loaded = if path.extension().and_then(|e| e.to_str()) == Some("json") {
            snapshot::read_map(path).and_then(|snap| {
                let mut store = Self::from_records(snap.records)?;
                store.metadata = snap.metadata;
                Ok(store)
            })
        } else {
            snapshot::read_table(path).and_then(Self::from_records)
        };

        match loaded {
            Ok(store) => store,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "corrupt snapshot, starting empty");
                Self::new()
            }
        }
    }

    /// Write the full snapshot in map form, overwriting any prior content.
    ///
    /// With `checkpoint` set, additionally writes a copy named
    /// `<stem>_<totalComparisons>.<ext>`. Distinct comparison counts give
    /// distinct names, so earlier checkpoints are never clobbered.
    ///
    /// # Errors
    ///
    /// [`StoreError::SnapshotWrite`] on any write failure; persistence
    /// failures are fatal and must reach the caller.
    pub fn save(&self, path: &Path, checkpoint: bool) -> Result<(), StoreError> {
        snapshot::write_map(path, self.records(), &self.metadata, self.total_comparisons())?;
        if checkpoint {
            let numbered = snapshot::checkpoint_path(path, self.total_comparisons());
            snapshot::write_map(&numbered, self.records(), &self.metadata, self.total_comparisons())?;
        }
        Ok(())
    }

    /// Write the tabular form (header line plus one row per record).
    ///
    /// # Errors
    ///
    /// [`StoreError::SnapshotWrite`] on any write failure.
    pub fn save_table(&self, path: &Path) -> Result<(), StoreError> {
        snapshot::write_table(path, self.records())
    }

    /// Insert a record.
    ///
    /// # Errors
    ///
    /// [`StoreError::DuplicateId`] if the id is already present.
    pub fn insert(&mut self, record: ItemRecord) -> Result<(), StoreError> {
        if self.index.contains_key(&record.id) {
            return Err(StoreError::DuplicateId(record.id));
        }
        self.index.insert(record.id.clone(), self.records.len());
        self.records.push(record);
        Ok(())
    }

    /// Add fresh records for newly discovered ids, then drop records whose
    /// backing item fails `validate`. Add-then-remove order, so an add can
    /// never resurrect something removed in the same pass.
    pub fn reconcile(
        &mut self,
        discovered: &[String],
        validate: impl Fn(&str) -> bool,
    ) -> ReconcileSummary {
        let mut summary = ReconcileSummary::default();

        for id in discovered {
            if !self.index.contains_key(id) {
                self.index.insert(id.clone(), self.records.len());
                self.records.push(ItemRecord::new(id.clone()));
                summary.added += 1;
            }
        }

        summary.removed = self.remove_where(|record| {
            let missing = !validate(&record.id);
            if missing {
                debug!(id = %record.id, "backing item no longer validates, dropping record");
            }
            missing
        });

        summary
    }

    /// Delete every record satisfying the predicate; returns how many were
    /// removed. Surviving records keep their relative order.
    pub fn remove_where(&mut self, predicate: impl Fn(&ItemRecord) -> bool) -> usize {
        let before = self.records.len();
        self.records.retain(|record| !predicate(record));
        let removed = before - self.records.len();
        if removed > 0 {
            self.rebuild_index();
        }
        removed
    }

    /// Stable sort by score. Ties preserve prior relative order, which keeps
    /// regression output reproducible.
    pub fn sort(&mut self, descending: bool) {
        if descending {
            self.records.sort_by(|a, b| b.score.total_cmp(&a.score));
        } else {
            self.records.sort_by(|a, b| a.score.total_cmp(&b.score));
        }
        self.rebuild_index();
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&ItemRecord> {
        self.index.get(id).map(|&i| &self.records[i])
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut ItemRecord> {
        self.index.get(id).map(|&i| &mut self.records[i])
    }

    /// Mutable access to two distinct records at once (winner and loser of
    /// one judgment).
    ///
    /// # Errors
    ///
    /// [`StoreError::UnknownId`] if either id is absent,
    /// [`StoreError::AliasedPair`] if both ids are the same record.
    pub fn pair_mut(
        &mut self,
        a: &str,
        b: &str,
    ) -> Result<(&mut ItemRecord, &mut ItemRecord), StoreError> {
        let ia = *self
            .index
            .get(a)
            .ok_or_else(|| StoreError::UnknownId(a.to_string()))?;
        let ib = *self
            .index
            .get(b)
            .ok_or_else(|| StoreError::UnknownId(b.to_string()))?;
        if ia == ib {
            return Err(StoreError::AliasedPair(a.to_string()));
        }

        if ia < ib {
            let (left, right) = self.records.split_at_mut(ib);
            Ok((&mut left[ia], &mut right[0]))
        } else {
            let (left, right) = self.records.split_at_mut(ia);
            Ok((&mut right[0], &mut left[ib]))
        }
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    #[must_use]
    pub fn records(&self) -> &[ItemRecord] {
        &self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sum of every record's comparison counter.
    #[must_use]
    pub fn total_comparisons(&self) -> u64 {
        self.records
            .iter()
            .map(|record| u64::from(record.comparisons))
            .sum()
    }

    #[must_use]
    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.metadata
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .records
            .iter()
            .enumerate()
            .map(|(i, record)| (record.id.clone(), i))
            .collect();
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;

/// One ranked item.
///
/// The `id` is stable and unique within a store (for file-backed items it is
/// the path relative to the collection root). Fresh records start at
/// `score = 0.0` with no comparisons; only an updater mutates them.
///
/// Legacy snapshots name the id field `relative_path` (or the even older
/// `relative_filepath`); both are accepted on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    #[serde(alias = "relative_path", alias = "relative_filepath")]
    pub id: String,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub comparisons: u32,
}

impl ItemRecord {
    /// A record as first discovered: zero score, zero comparisons.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            score: 0.0,
            comparisons: 0,
        }
    }

    #[must_use]
    pub fn with_score(id: impl Into<String>, score: f64, comparisons: u32) -> Self {
        Self {
            id: id.into(),
            score,
            comparisons,
        }
    }
}

impl fmt::Display for ItemRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}',{:>7.3},{:>4}",
            self.id, self.score, self.comparisons
        )
    }
}

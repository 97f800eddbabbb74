pub mod best;
pub mod compare;
pub mod stats;

use std::path::Path;

use anyhow::{Context, Result};
use faceoff_core::snapshot;
use faceoff_core::store::RecordStore;

/// Load a snapshot for offline analysis.
///
/// Unlike the engine's lenient session load, analysis input that is missing
/// or unreadable is an error: the command exits non-zero instead of quietly
/// analyzing an empty store.
pub(crate) fn load_store_strict(path: &Path) -> Result<RecordStore> {
    let records = if path.extension().and_then(|e| e.to_str()) == Some("json") {
        snapshot::read_map(path)
            .with_context(|| format!("failed to load snapshot {}", path.display()))?
            .records
    } else {
        snapshot::read_table(path)
            .with_context(|| format!("failed to load snapshot {}", path.display()))?
    };

    RecordStore::from_records(records)
        .with_context(|| format!("snapshot {} has duplicate record ids", path.display()))
}

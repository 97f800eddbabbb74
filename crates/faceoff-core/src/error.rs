use std::io;
use std::path::PathBuf;

/// Errors raised by the record store and snapshot persistence.
///
/// Read-side variants (`SnapshotRead`, `SnapshotParse`, `TableParse`) are
/// downgraded to warnings by [`crate::store::RecordStore::load`]; write-side
/// failures always propagate.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Snapshot file could not be read.
    #[error("failed to read snapshot {}: {source}", path.display())]
    SnapshotRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Snapshot file exists but is not valid map-form JSON.
    #[error("failed to parse snapshot {}: {source}", path.display())]
    SnapshotParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Snapshot or tabular export could not be written.
    #[error("failed to write snapshot {}: {source}", path.display())]
    SnapshotWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A tabular snapshot row or header could not be parsed.
    #[error("bad table data at {}:{line}: {reason}", path.display())]
    TableParse {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// Two records with the same id in one store.
    #[error("duplicate record id: {0}")]
    DuplicateId(String),

    /// An id was requested that the store does not contain.
    #[error("unknown record id: {0}")]
    UnknownId(String),

    /// A pair operation was given the same record twice.
    #[error("cannot borrow record {0} twice in one pair")]
    AliasedPair(String),
}

#[cfg(test)]
mod tests {
    use super::StoreError;

    #[test]
    fn messages_name_the_offending_id() {
        let err = StoreError::DuplicateId("a/b.png".to_string());
        assert!(err.to_string().contains("a/b.png"));

        let err = StoreError::UnknownId("gone.png".to_string());
        assert!(err.to_string().contains("gone.png"));
    }

    #[test]
    fn table_parse_reports_location() {
        let err = StoreError::TableParse {
            path: std::path::PathBuf::from("scores.csv"),
            line: 3,
            reason: "missing score column".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("scores.csv"));
        assert!(msg.contains(":3"));
    }
}

//! Snapshot persistence.
//!
//! Two wire forms:
//!
//! - **Map form** (`.json`): `{"ImageRecords": {<id>: {...}}, "Metadata": {...}}`.
//!   Record order in the document is preserved on load and reflects store
//!   order on save, which needs a hand-written serde pair (serde_json's
//!   default map type would reorder keys).
//! - **Tabular form** (anything else): delimited text, first line is the
//!   header. Required columns are the identifier, `score` and `comparisons`;
//!   extended columns are ignored on load.
//!
//! Checkpoints are numbered copies named `<stem>_<totalComparisons>.<ext>`,
//! discovered and ordered numerically by [`find_checkpoints`].
//!
//! All writes go through a temp file and an atomic rename so an interrupted
//! save never leaves a truncated snapshot behind.

use std::ffi::OsStr;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::{IgnoredAny, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::StoreError;
use crate::record::ItemRecord;

const RECORDS_KEY: &str = "ImageRecords";
const METADATA_KEY: &str = "Metadata";
const TABLE_DELIMITER: char = '\t';

/// In-memory form of one snapshot file.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub records: Vec<ItemRecord>,
    pub metadata: Map<String, Value>,
}

/// Read a map-form snapshot.
///
/// # Errors
///
/// [`StoreError::SnapshotRead`] / [`StoreError::SnapshotParse`]. Callers
/// decide the policy; [`crate::store::RecordStore::load`] downgrades both to
/// a warning and an empty store.
pub fn read_map(path: &Path) -> Result<Snapshot, StoreError> {
    let content = fs::read_to_string(path).map_err(|source| StoreError::SnapshotRead {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| StoreError::SnapshotParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Write a map-form snapshot, stamping `saved_at` and `total_comparisons`
/// into the metadata object of the written document.
///
/// # Errors
///
/// [`StoreError::SnapshotWrite`] on any write failure.
pub fn write_map(
    path: &Path,
    records: &[ItemRecord],
    metadata: &Map<String, Value>,
    total_comparisons: u64,
) -> Result<(), StoreError> {
    let mut stamped = metadata.clone();
    stamped.insert(
        "saved_at".to_string(),
        Value::String(chrono::Utc::now().to_rfc3339()),
    );
    stamped.insert("total_comparisons".to_string(), total_comparisons.into());

    let doc = SnapshotDoc { records, metadata: &stamped };
    let body = serde_json::to_vec_pretty(&doc).map_err(|source| StoreError::SnapshotWrite {
        path: path.to_path_buf(),
        source: source.into(),
    })?;
    write_atomic(path, &body)
}

/// Write the tabular form: a header line, then one row per record in store
/// order.
///
/// # Errors
///
/// [`StoreError::SnapshotWrite`] on any write failure.
pub fn write_table(path: &Path, records: &[ItemRecord]) -> Result<(), StoreError> {
    let mut body = String::from("id\tscore\tcomparisons\n");
    for record in records {
        body.push_str(&format!(
            "{}{TABLE_DELIMITER}{}{TABLE_DELIMITER}{}\n",
            record.id, record.score, record.comparisons
        ));
    }
    write_atomic(path, body.as_bytes())
}

/// Read a tabular-form snapshot.
///
/// The header names the columns; the identifier column may be called `id`,
/// `relative_path` or `relative_filepath`. Unknown columns are ignored.
///
/// # Errors
///
/// [`StoreError::SnapshotRead`] / [`StoreError::TableParse`].
pub fn read_table(path: &Path) -> Result<Vec<ItemRecord>, StoreError> {
    let content = fs::read_to_string(path).map_err(|source| StoreError::SnapshotRead {
        path: path.to_path_buf(),
        source,
    })?;

    let mut lines = content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty());

    let Some((_, header)) = lines.next() else {
        return Ok(Vec::new());
    };
    let columns: Vec<&str> = header.split(TABLE_DELIMITER).map(str::trim).collect();
    let id_col = columns
        .iter()
        .position(|c| matches!(*c, "id" | "relative_path" | "relative_filepath"))
        .ok_or_else(|| table_error(path, 1, "header has no identifier column"))?;
    let score_col = columns
        .iter()
        .position(|c| *c == "score")
        .ok_or_else(|| table_error(path, 1, "header has no score column"))?;
    let comparisons_col = columns
        .iter()
        .position(|c| *c == "comparisons")
        .ok_or_else(|| table_error(path, 1, "header has no comparisons column"))?;

    let mut records = Vec::new();
    for (index, line) in lines {
        let line_no = index + 1;
        let fields: Vec<&str> = line.split(TABLE_DELIMITER).collect();
        let field = |col: usize, name: &str| {
            fields
                .get(col)
                .map(|f| f.trim())
                .ok_or_else(|| table_error(path, line_no, format!("row is missing the {name} column")))
        };

        let id = field(id_col, "identifier")?;
        let score: f64 = field(score_col, "score")?
            .parse()
            .map_err(|_| table_error(path, line_no, "score is not a number"))?;
        let comparisons: u32 = field(comparisons_col, "comparisons")?
            .parse()
            .map_err(|_| table_error(path, line_no, "comparisons is not a count"))?;

        records.push(ItemRecord::with_score(id, score, comparisons));
    }
    Ok(records)
}

/// Checkpoint name for a base snapshot path: `<stem>_<total>.<ext>`.
#[must_use]
pub fn checkpoint_path(path: &Path, total_comparisons: u64) -> PathBuf {
    let stem = path
        .file_stem()
        .and_then(OsStr::to_str)
        .unwrap_or("scores");
    let name = match path.extension().and_then(OsStr::to_str) {
        Some(ext) => format!("{stem}_{total_comparisons}.{ext}"),
        None => format!("{stem}_{total_comparisons}"),
    };
    path.with_file_name(name)
}

/// Discover the numbered checkpoints of `base` in `dir`, ordered
/// numerically by the embedded comparison count.
///
/// # Errors
///
/// [`StoreError::SnapshotRead`] if the directory cannot be listed.
pub fn find_checkpoints(dir: &Path, base: &str) -> Result<Vec<(u64, PathBuf)>, StoreError> {
    let base_path = Path::new(base);
    let stem = base_path
        .file_stem()
        .and_then(OsStr::to_str)
        .unwrap_or("scores");
    let ext = base_path.extension().and_then(OsStr::to_str).unwrap_or("json");
    let prefix = format!("{stem}_");

    let entries = fs::read_dir(dir).map_err(|source| StoreError::SnapshotRead {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut found = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(OsStr::to_str) != Some(ext) {
            continue;
        }
        let Some(file_stem) = path.file_stem().and_then(OsStr::to_str) else {
            continue;
        };
        let Some(number) = file_stem.strip_prefix(&prefix) else {
            continue;
        };
        if let Ok(count) = number.parse::<u64>() {
            found.push((count, path));
        }
    }
    found.sort_by_key(|&(count, _)| count);
    Ok(found)
}

fn table_error(path: &Path, line: usize, reason: impl Into<String>) -> StoreError {
    StoreError::TableParse {
        path: path.to_path_buf(),
        line,
        reason: reason.into(),
    }
}

fn write_atomic(path: &Path, body: &[u8]) -> Result<(), StoreError> {
    let write_err = |source: std::io::Error| StoreError::SnapshotWrite {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(write_err)?;
    }

    let file_name = path.file_name().and_then(OsStr::to_str).unwrap_or("snapshot");
    let tmp_path = path.with_file_name(format!("{file_name}.tmp"));
    fs::write(&tmp_path, body).map_err(write_err)?;
    fs::rename(&tmp_path, path).map_err(write_err)
}

// ---------------------------------------------------------------------------
// Map-form serde (order preserving)
// ---------------------------------------------------------------------------

struct SnapshotDoc<'a> {
    records: &'a [ItemRecord],
    metadata: &'a Map<String, Value>,
}

impl Serialize for SnapshotDoc<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut doc = serializer.serialize_map(Some(2))?;
        doc.serialize_entry(RECORDS_KEY, &RecordTable(self.records))?;
        doc.serialize_entry(METADATA_KEY, self.metadata)?;
        doc.end()
    }
}

struct RecordTable<'a>(&'a [ItemRecord]);

impl Serialize for RecordTable<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut table = serializer.serialize_map(Some(self.0.len()))?;
        for record in self.0 {
            table.serialize_entry(&record.id, record)?;
        }
        table.end()
    }
}

/// Map value as found on disk. The identifier may live in the value (any of
/// its historical names) or only in the map key.
#[derive(Deserialize)]
struct RawRecord {
    #[serde(default, alias = "relative_path", alias = "relative_filepath")]
    id: String,
    #[serde(default)]
    score: f64,
    #[serde(default)]
    comparisons: u32,
}

impl<'de> Deserialize<'de> for Snapshot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DocVisitor;

        impl<'de> Visitor<'de> for DocVisitor {
            type Value = Snapshot;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a snapshot object with ImageRecords and Metadata")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut snapshot = Snapshot::default();
                while let Some(key) = access.next_key::<String>()? {
                    match key.as_str() {
                        RECORDS_KEY => {
                            snapshot.records = access.next_value::<RecordTableDe>()?.0;
                        }
                        METADATA_KEY => {
                            snapshot.metadata = access.next_value()?;
                        }
                        _ => {
                            access.next_value::<IgnoredAny>()?;
                        }
                    }
                }
                Ok(snapshot)
            }
        }

        deserializer.deserialize_map(DocVisitor)
    }
}

struct RecordTableDe(Vec<ItemRecord>);

impl<'de> Deserialize<'de> for RecordTableDe {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TableVisitor;

        impl<'de> Visitor<'de> for TableVisitor {
            type Value = RecordTableDe;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of id to record")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut records = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((key, raw)) = access.next_entry::<String, RawRecord>()? {
                    let id = if raw.id.is_empty() { key } else { raw.id };
                    records.push(ItemRecord {
                        id,
                        score: raw.score,
                        comparisons: raw.comparisons,
                    });
                }
                Ok(RecordTableDe(records))
            }
        }

        deserializer.deserialize_map(TableVisitor)
    }
}

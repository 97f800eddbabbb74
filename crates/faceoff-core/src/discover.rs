//! Item discovery collaborators.
//!
//! The engine never opens items itself; it consumes this boundary. An
//! [`ItemSource`] enumerates candidate ids and answers validity checks, and
//! [`DirectorySource`] is the file-backed implementation: recursive
//! directory walk, extension filter, ids are paths relative to the root.

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

/// Errors raised while enumerating a collection root.
#[derive(Debug, thiserror::Error)]
pub enum DiscoverError {
    /// The collection root does not exist.
    #[error("path not found: {}", .0.display())]
    PathNotFound(PathBuf),

    /// The collection root exists but is not a directory.
    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
}

/// Boundary consumed by the record store during reconciliation.
///
/// Implementations decide what "exists" means; an item failing validation
/// during discovery is skipped silently and reconciliation continues.
pub trait ItemSource {
    /// Enumerate candidate item ids.
    ///
    /// # Errors
    ///
    /// [`DiscoverError`] when the source itself is unusable. Individual
    /// unreadable items are not errors; they are simply omitted.
    fn discover(&self) -> Result<Vec<String>, DiscoverError>;

    /// Whether the item's backing resource still exists.
    fn validate(&self, id: &str) -> bool;
}

/// File-backed item source rooted at a directory.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
    /// Lowercase extensions (without the dot) to accept; empty accepts all.
    extensions: Vec<String>,
}

impl DirectorySource {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extensions: Vec::new(),
        }
    }

    /// Restrict discovery to the given extensions (compared case
    /// insensitively, without the leading dot).
    #[must_use]
    pub fn with_extensions(mut self, extensions: &[&str]) -> Self {
        self.extensions = extensions
            .iter()
            .map(|ext| ext.trim_start_matches('.').to_lowercase())
            .collect();
        self
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn extension_accepted(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                let ext = ext.to_lowercase();
                self.extensions.iter().any(|accepted| *accepted == ext)
            })
    }
}

impl ItemSource for DirectorySource {
    fn discover(&self) -> Result<Vec<String>, DiscoverError> {
        if !self.root.exists() {
            return Err(DiscoverError::PathNotFound(self.root.clone()));
        }
        if !self.root.is_dir() {
            return Err(DiscoverError::NotADirectory(self.root.clone()));
        }

        let mut ids = Vec::new();
        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    // Unreadable subtree: skip and continue, per policy.
                    debug!(error = %err, "skipping unreadable entry during discovery");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            if !self.extension_accepted(entry.path()) {
                continue;
            }
            if let Ok(relative) = entry.path().strip_prefix(&self.root) {
                ids.push(relative.to_string_lossy().into_owned());
            }
        }
        Ok(ids)
    }

    fn validate(&self, id: &str) -> bool {
        let path = self.root.join(id);
        path.is_file() && self.extension_accepted(&path)
    }
}

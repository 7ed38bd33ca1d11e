//! Bookkeeping for files that have already been ingested

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

use cora_core::{Error, ProcessedSet, Result};

use crate::persist::{read_json, write_json_atomic};

pub const DEFAULT_PROCESSED_PREFIX: &str = "_";

/// Marks a file by renaming it with a prefix (`data/a.pdf` becomes `data/_a.pdf`)
#[derive(Debug, Clone)]
pub struct RenameMarker {
    prefix: String,
}

impl Default for RenameMarker {
    fn default() -> Self {
        Self::new(DEFAULT_PROCESSED_PREFIX)
    }
}

impl RenameMarker {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }

    fn file_name(path: &Path) -> Result<&str> {
        path.file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| Error::ingestion(path, "file name is not valid UTF-8"))
    }
}

impl ProcessedSet for RenameMarker {
    fn is_processed(&self, path: &Path) -> Result<bool> {
        Ok(Self::file_name(path)?.starts_with(&self.prefix))
    }

    fn mark_processed(&self, path: &Path) -> Result<()> {
        let name = Self::file_name(path)?;
        let target = path.with_file_name(format!("{}{}", self.prefix, name));
        if target.exists() {
            return Err(Error::ingestion(
                path,
                format!("cannot mark as processed, {} already exists", target.display()),
            ));
        }
        fs::rename(path, &target)
            .map_err(|e| Error::ingestion(path, format!("failed to rename: {}", e)))?;
        debug!(from = %path.display(), to = %target.display(), "marked as processed");
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ManifestEntry {
    md5: String,
    processed_at: String,
}

/// Records processed files in a JSON manifest keyed by path, leaving the
/// source files untouched. A file whose content changed since it was
/// recorded counts as unprocessed again.
pub struct ManifestMarker {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, ManifestEntry>>,
}

impl ManifestMarker {
    /// Load the manifest, starting empty if it does not exist yet
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = read_json(&path)?.unwrap_or_default();
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn key(path: &Path) -> String {
        fs::canonicalize(path)
            .unwrap_or_else(|_| path.to_path_buf())
            .display()
            .to_string()
    }

    fn digest(path: &Path) -> Result<String> {
        let bytes = fs::read(path).map_err(|e| Error::ingestion(path, format!("failed to read file: {}", e)))?;
        Ok(format!("{:x}", md5::compute(bytes)))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, ManifestEntry>>> {
        self.entries
            .lock()
            .map_err(|e| Error::Io(std::io::Error::other(format!("manifest lock poisoned: {}", e))))
    }
}

impl ProcessedSet for ManifestMarker {
    fn is_processed(&self, path: &Path) -> Result<bool> {
        let entries = self.lock()?;
        match entries.get(&Self::key(path)) {
            Some(entry) => Ok(entry.md5 == Self::digest(path)?),
            None => Ok(false),
        }
    }

    fn mark_processed(&self, path: &Path) -> Result<()> {
        let entry = ManifestEntry {
            md5: Self::digest(path)?,
            processed_at: Utc::now().to_rfc3339(),
        };

        let mut entries = self.lock()?;
        let mut next = entries.clone();
        next.insert(Self::key(path), entry);
        write_json_atomic(&self.path, &next, true)?;
        *entries = next;

        debug!(path = %path.display(), manifest = %self.path.display(), "recorded in manifest");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_rename_marker() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("constitution.pdf");
        fs::write(&path, b"%PDF").unwrap();

        let marker = RenameMarker::default();
        assert!(!marker.is_processed(&path).unwrap());
        marker.mark_processed(&path).unwrap();

        let renamed = dir.path().join("_constitution.pdf");
        assert!(!path.exists());
        assert!(renamed.exists());
        assert!(marker.is_processed(&renamed).unwrap());
    }

    #[test]
    fn test_rename_marker_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "new").unwrap();
        fs::write(dir.path().join("_a.txt"), "old").unwrap();

        let err = RenameMarker::default().mark_processed(&path).unwrap_err();
        assert!(matches!(err, Error::Ingestion { .. }));
        assert!(path.exists());
    }

    #[test]
    fn test_manifest_marker_persists() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.txt");
        fs::write(&file, "Article 21").unwrap();
        let manifest = dir.path().join("db").join("processed.json");

        let marker = ManifestMarker::open(&manifest).unwrap();
        assert!(!marker.is_processed(&file).unwrap());
        marker.mark_processed(&file).unwrap();
        assert!(marker.is_processed(&file).unwrap());
        assert!(file.exists());

        let reopened = ManifestMarker::open(&manifest).unwrap();
        assert!(reopened.is_processed(&file).unwrap());
    }

    #[test]
    fn test_manifest_marker_detects_changed_content() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.txt");
        fs::write(&file, "Article 21").unwrap();

        let marker = ManifestMarker::open(dir.path().join("processed.json")).unwrap();
        marker.mark_processed(&file).unwrap();
        fs::write(&file, "Article 21A").unwrap();
        assert!(!marker.is_processed(&file).unwrap());
    }
}

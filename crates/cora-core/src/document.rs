//! Document loading and ingestion bookkeeping traits

use std::path::Path;

use crate::{Document, Result};

/// Turns a file on disk into ordered plain-text pages
pub trait DocumentLoader: Send + Sync {
    /// Lower-case file extensions (without the dot) this loader accepts
    fn extensions(&self) -> &[&'static str];

    /// Load the file
    fn load(&self, path: &Path) -> Result<Document>;
}

/// Records which source files have already been ingested
///
/// Ingestion consults the set before processing a file and marks the file
/// only after all of its chunks are stored.
pub trait ProcessedSet: Send + Sync {
    /// Whether the file was ingested by an earlier run
    fn is_processed(&self, path: &Path) -> Result<bool>;

    /// Record the file as ingested
    fn mark_processed(&self, path: &Path) -> Result<()>;
}

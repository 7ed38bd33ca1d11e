//! Vector index trait

use async_trait::async_trait;

use crate::{IndexEntry, Result, ScoredChunk, SearchParams};

/// Trait for persistent vector indexes
///
/// An index is bound to one named collection. Implementations must persist
/// `add` before returning and reuse existing entries when a collection is
/// reopened.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Name of the collection this index serves
    fn collection(&self) -> &str;

    /// Insert entries, overwriting any entry with the same id
    async fn add(&self, entries: Vec<IndexEntry>) -> Result<()>;

    /// Diversity-aware search; returns at most `params.k` chunks in rank order
    async fn search(&self, query: &[f32], params: &SearchParams) -> Result<Vec<ScoredChunk>>;

    /// Look up an entry by id
    async fn get(&self, id: &str) -> Result<Option<IndexEntry>>;

    /// Number of entries in the collection
    async fn count(&self) -> Result<usize>;
}

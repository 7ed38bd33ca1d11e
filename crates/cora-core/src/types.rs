//! Common types used across the CORA pipeline

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// A single page of extracted plain text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// 1-based page number within the source document
    pub number: usize,
    pub text: String,
}

/// A source document loaded from disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub source: PathBuf,
    pub pages: Vec<Page>,
}

impl Document {
    /// Number of pages in the document
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Whether every page is blank
    pub fn is_blank(&self) -> bool {
        self.pages.iter().all(|page| page.text.trim().is_empty())
    }
}

/// Where a chunk came from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source: Option<String>,
    /// Page on which the chunk starts
    pub page: Option<usize>,
    pub chunk_index: usize,
    /// Set when no separator fit inside the window and the text was cut blindly
    #[serde(default)]
    pub hard_cut: bool,
}

/// A bounded, immutable piece of document text and its index key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// A chunk with its embedding, as persisted by a vector index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: String,
    pub embedding: Vec<f32>,
    pub text: String,
    pub metadata: ChunkMetadata,
}

impl IndexEntry {
    /// Pair a chunk with its embedding
    pub fn new(chunk: Chunk, embedding: Vec<f32>) -> Self {
        Self {
            id: chunk.id,
            embedding,
            text: chunk.text,
            metadata: chunk.metadata,
        }
    }

    /// Drop the embedding and recover the chunk
    pub fn to_chunk(&self) -> Chunk {
        Chunk {
            id: self.id.clone(),
            text: self.text.clone(),
            metadata: self.metadata.clone(),
        }
    }
}

/// A retrieved chunk with its similarity to the query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Parameters for a diversity-aware (MMR) search
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchParams {
    /// Number of results to return
    pub k: usize,
    /// Number of nearest neighbours considered before re-ranking
    pub fetch_k: usize,
    /// 1.0 ranks purely by relevance, 0.0 purely by diversity
    pub lambda: f32,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            k: 6,
            fetch_k: 20,
            lambda: 0.5,
        }
    }
}

/// Configuration for retry behavior of remote calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Upper bound on a single attempt
    pub attempt_timeout: Duration,
    /// Delay before retry `n` is `backoff * n`
    pub backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            attempt_timeout: Duration::from_secs(60),
            backoff: Duration::from_millis(500),
        }
    }
}

impl RetryConfig {
    /// Total number of attempts including the first one
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }
}

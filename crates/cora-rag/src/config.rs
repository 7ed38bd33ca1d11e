//! Configuration for ingestion and retrieval.

use serde::{Deserialize, Serialize};

use cora_core::{Error, Result, SearchParams};

use crate::splitter::RecursiveSplitter;

pub const DEFAULT_COLLECTION: &str = "constitution";

/// Parameters shared by ingestion and retrieval.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Name of the vector collection.
    pub collection: String,
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
    /// MMR search parameters.
    pub search: SearchParams,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            collection: DEFAULT_COLLECTION.to_string(),
            chunk_size: 1800,
            chunk_overlap: 200,
            search: SearchParams::default(),
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// A splitter using this configuration's chunk parameters.
    pub fn splitter(&self) -> Result<RecursiveSplitter> {
        RecursiveSplitter::new(self.chunk_size, self.chunk_overlap)
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    pub fn collection(mut self, name: impl Into<String>) -> Self {
        self.config.collection = name.into();
        self
    }

    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the number of chunks returned per query.
    pub fn k(mut self, k: usize) -> Self {
        self.config.search.k = k;
        self
    }

    /// Set the number of candidates considered before re-ranking.
    pub fn fetch_k(mut self, fetch_k: usize) -> Self {
        self.config.search.fetch_k = fetch_k;
        self
    }

    /// Set the relevance/diversity trade-off.
    pub fn lambda(mut self, lambda: f32) -> Self {
        self.config.search.lambda = lambda;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if:
    /// - `chunk_size == 0` or `chunk_overlap >= chunk_size`
    /// - `k == 0` or `fetch_k < k`
    /// - `lambda` is outside `[0, 1]`
    pub fn build(self) -> Result<RagConfig> {
        let config = self.config;
        if config.chunk_size == 0 {
            return Err(Error::Configuration("chunk_size must be greater than zero".to_string()));
        }
        if config.chunk_overlap >= config.chunk_size {
            return Err(Error::Configuration(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                config.chunk_overlap, config.chunk_size
            )));
        }
        if config.search.k == 0 {
            return Err(Error::Configuration("k must be greater than zero".to_string()));
        }
        if config.search.fetch_k < config.search.k {
            return Err(Error::Configuration(format!(
                "fetch_k ({}) must be at least k ({})",
                config.search.fetch_k, config.search.k
            )));
        }
        if !(0.0..=1.0).contains(&config.search.lambda) {
            return Err(Error::Configuration(format!(
                "lambda ({}) must be between 0 and 1",
                config.search.lambda
            )));
        }
        if config.collection.trim().is_empty() {
            return Err(Error::Configuration("collection name must not be empty".to_string()));
        }
        Ok(config)
    }
}

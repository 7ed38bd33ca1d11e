//! Query-time retrieval

use std::sync::Arc;
use tracing::debug;

use cora_core::{Chunk, ModelProvider, Result, ScoredChunk, SearchParams, VectorIndex};

/// Embeds a query and fetches a diverse set of relevant chunks
pub struct Retriever {
    provider: Arc<dyn ModelProvider>,
    index: Arc<dyn VectorIndex>,
    params: SearchParams,
}

impl Retriever {
    /// Create a retriever with the default search parameters
    pub fn new(provider: Arc<dyn ModelProvider>, index: Arc<dyn VectorIndex>) -> Self {
        Self {
            provider,
            index,
            params: SearchParams::default(),
        }
    }

    pub fn with_params(mut self, params: SearchParams) -> Self {
        self.params = params;
        self
    }

    pub fn params(&self) -> &SearchParams {
        &self.params
    }

    /// Retrieve chunks in rank order; an empty collection yields an empty list
    pub async fn retrieve(&self, query: &str) -> Result<Vec<Chunk>> {
        Ok(self
            .retrieve_scored(query)
            .await?
            .into_iter()
            .map(|scored| scored.chunk)
            .collect())
    }

    /// Like [`retrieve`](Self::retrieve), keeping the similarity scores
    pub async fn retrieve_scored(&self, query: &str) -> Result<Vec<ScoredChunk>> {
        let embedding = self.provider.embed(query).await?;
        let results = self.index.search(&embedding, &self.params).await?;
        debug!(
            collection = %self.index.collection(),
            retrieved = results.len(),
            "Retrieved {} documents",
            results.len()
        );
        Ok(results)
    }
}

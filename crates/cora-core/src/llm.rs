//! Model provider trait

use async_trait::async_trait;

use crate::Result;

/// Trait for model providers (e.g., Azure OpenAI, Ollama, etc.)
///
/// A provider supplies both capabilities the pipeline needs: turning text into
/// a fixed-length vector and turning a prompt into generated text. Providers
/// validate their configuration when constructed, so a value of this type is
/// always ready to make remote calls.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts, preserving order
    ///
    /// The default implementation calls [`embed`](ModelProvider::embed) once
    /// per input. Backends with native batching should override it.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    /// Generate a completion for the prompt at temperature 0
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Length of every vector returned by `embed`
    fn dimensions(&self) -> usize;

    /// Identifier of the generation model or deployment
    fn model_id(&self) -> &str;
}

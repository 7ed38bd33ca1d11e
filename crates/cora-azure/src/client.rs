//! Azure OpenAI client implementation

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use cora_core::{with_retry, Error, ModelProvider, Result, RetryConfig};

use crate::config::AzureOpenAIConfig;

const PROVIDER: &str = "azure-openai";

/// Inputs sent per embeddings request
const MAX_BATCH_SIZE: usize = 64;

/// Azure OpenAI client for embeddings and chat completions
pub struct AzureOpenAIClient {
    config: AzureOpenAIConfig,
    client: Client,
    retry: RetryConfig,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a [String],
    dimensions: usize,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
pub(crate) struct EmbeddingData {
    pub(crate) embedding: Vec<f32>,
    pub(crate) index: usize,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

impl AzureOpenAIClient {
    /// Create a new client, validating the configuration first
    pub fn new(config: AzureOpenAIConfig) -> Result<Self> {
        config.validate()?;

        let retry = RetryConfig::default();
        let client = Client::builder()
            .timeout(retry.attempt_timeout)
            .build()
            .map_err(|e| Error::Configuration(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            config,
            client,
            retry,
        })
    }

    /// Create a new client from environment variables
    pub fn from_env() -> Result<Self> {
        let config = AzureOpenAIConfig::from_env()?;
        Self::new(config)
    }

    /// Override the retry budget and per-attempt timeout
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Use a preconfigured HTTP client
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Get the active configuration
    pub fn config(&self) -> &AzureOpenAIConfig {
        &self.config
    }

    async fn post_json<B, R>(&self, url: &str, body: &B) -> Result<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(url)
            .header("api-key", &self.config.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "request failed");
                Error::transient(PROVIDER, format!("request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            error!(provider = PROVIDER, %status, "API error");
            return Err(Error::from_http_status(PROVIDER, status.as_u16(), &detail));
        }

        response.json::<R>().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse response");
            Error::provider(PROVIDER, format!("failed to parse response: {}", e))
        })
    }

    async fn request_embeddings(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = EmbeddingRequest {
            input: inputs,
            dimensions: self.config.dimensions,
        };
        let response: EmbeddingResponse = self.post_json(&self.config.embeddings_url(), &body).await?;
        collect_embeddings(response.data, inputs.len(), self.config.dimensions)
    }

    async fn request_completion(&self, prompt: &str) -> Result<String> {
        let body = ChatRequest {
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: 0.0,
        };
        let response: ChatResponse = self.post_json(&self.config.chat_url(), &body).await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| Error::provider(PROVIDER, "response contained no completion"))
    }
}

/// Order embeddings by their input index and check their shape
pub(crate) fn collect_embeddings(
    mut data: Vec<EmbeddingData>,
    expected: usize,
    dimensions: usize,
) -> Result<Vec<Vec<f32>>> {
    if data.len() != expected {
        return Err(Error::provider(
            PROVIDER,
            format!("expected {} embeddings, got {}", expected, data.len()),
        ));
    }

    data.sort_by_key(|d| d.index);

    data.into_iter()
        .map(|d| {
            if d.embedding.len() != dimensions {
                Err(Error::DimensionMismatch {
                    expected: dimensions,
                    actual: d.embedding.len(),
                })
            } else {
                Ok(d.embedding)
            }
        })
        .collect()
}

#[async_trait]
impl ModelProvider for AzureOpenAIClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings
            .pop()
            .ok_or_else(|| Error::provider(PROVIDER, "API returned empty response"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(MAX_BATCH_SIZE) {
            debug!(
                provider = PROVIDER,
                batch_size = batch.len(),
                deployment = %self.config.embeddings_deployment,
                "embedding batch"
            );
            let vectors =
                with_retry(&self.retry, PROVIDER, "embeddings", || self.request_embeddings(batch)).await?;
            embeddings.extend(vectors);
        }

        Ok(embeddings)
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!(
            provider = PROVIDER,
            prompt_len = prompt.len(),
            deployment = %self.config.chat_deployment,
            "requesting completion"
        );
        with_retry(&self.retry, PROVIDER, "chat completion", || self.request_completion(prompt)).await
    }

    fn dimensions(&self) -> usize {
        self.config.dimensions
    }

    fn model_id(&self) -> &str {
        &self.config.chat_deployment
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(index: usize, embedding: Vec<f32>) -> EmbeddingData {
        EmbeddingData { embedding, index }
    }

    #[test]
    fn test_embeddings_reordered_by_index() {
        let vectors = collect_embeddings(
            vec![data(1, vec![1.0, 1.0]), data(0, vec![0.0, 0.0])],
            2,
            2,
        )
        .unwrap();
        assert_eq!(vectors, vec![vec![0.0, 0.0], vec![1.0, 1.0]]);
    }

    #[test]
    fn test_wrong_dimension_is_configuration_error() {
        let err = collect_embeddings(vec![data(0, vec![0.0; 3])], 1, 4).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { expected: 4, actual: 3 }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_missing_embeddings_rejected() {
        let err = collect_embeddings(vec![data(0, vec![0.0; 2])], 2, 2).unwrap_err();
        assert!(matches!(err, Error::Provider { .. }));
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = AzureOpenAIConfig::new(
            String::new(),
            "https://example.openai.azure.com".to_string(),
            "gpt-4o".to_string(),
        );
        assert!(matches!(AzureOpenAIClient::new(config), Err(Error::Configuration(_))));
    }
}

//! Ollama client implementation

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use cora_core::{with_retry, Error, ModelProvider, Result, RetryConfig};

use crate::config::OllamaConfig;

const PROVIDER: &str = "ollama";

/// Client for a local Ollama server
pub struct OllamaClient {
    config: OllamaConfig,
    client: Client,
    retry: RetryConfig,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

impl OllamaClient {
    /// Create a new client, validating the configuration first
    pub fn new(config: OllamaConfig) -> Result<Self> {
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
        Self::new(OllamaConfig::from_env()?)
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
    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.config.endpoint(path))
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
                .map(|e| e.error)
                .unwrap_or(text);
            error!(provider = PROVIDER, %status, "API error");
            return Err(Error::from_http_status(PROVIDER, status.as_u16(), &detail));
        }

        response.json::<R>().await.map_err(|e| {
            Error::provider(PROVIDER, format!("failed to parse response: {}", e))
        })
    }

    async fn request_embedding(&self, text: &str) -> Result<Vec<f32>> {
        let body = EmbeddingRequest {
            model: &self.config.embed_model,
            prompt: text,
        };
        let response: EmbeddingResponse = self.post_json("embeddings", &body).await?;
        check_dimensions(response.embedding, self.config.embed_dimensions)
    }

    async fn request_generation(&self, prompt: &str) -> Result<String> {
        let body = GenerateRequest {
            model: &self.config.chat_model,
            prompt,
            stream: false,
            options: GenerateOptions { temperature: 0.0 },
        };
        let response: GenerateResponse = self.post_json("generate", &body).await?;
        Ok(response.response)
    }
}

fn check_dimensions(embedding: Vec<f32>, expected: usize) -> Result<Vec<f32>> {
    if embedding.len() == expected {
        Ok(embedding)
    } else {
        Err(Error::DimensionMismatch {
            expected,
            actual: embedding.len(),
        })
    }
}

#[async_trait]
impl ModelProvider for OllamaClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = PROVIDER, text_len = text.len(), model = %self.config.embed_model, "embedding text");
        with_retry(&self.retry, PROVIDER, "embeddings", || self.request_embedding(text)).await
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!(provider = PROVIDER, prompt_len = prompt.len(), model = %self.config.chat_model, "generating");
        with_retry(&self.retry, PROVIDER, "generate", || self.request_generation(prompt)).await
    }

    fn dimensions(&self) -> usize {
        self.config.embed_dimensions
    }

    fn model_id(&self) -> &str {
        &self.config.chat_model
    }
}

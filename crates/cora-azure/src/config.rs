//! Azure OpenAI configuration

use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use url::Url;

use cora_core::{Error, Result};

pub const DEFAULT_API_VERSION: &str = "2023-12-01-preview";
pub const DEFAULT_EMBEDDINGS_DEPLOYMENT: &str = "text-embedding-3-large";
pub const DEFAULT_DIMENSIONS: usize = 1536;

/// Configuration for the Azure OpenAI client
#[derive(Clone, Serialize, Deserialize)]
pub struct AzureOpenAIConfig {
    #[serde(skip_serializing, default)]
    pub api_key: String,
    pub embeddings_endpoint: String,
    pub chat_endpoint: String,
    pub api_version: String,
    pub chat_deployment: String,
    pub embeddings_deployment: String,
    pub dimensions: usize,
}

impl fmt::Debug for AzureOpenAIConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureOpenAIConfig")
            .field("api_key", &"<redacted>")
            .field("embeddings_endpoint", &self.embeddings_endpoint)
            .field("chat_endpoint", &self.chat_endpoint)
            .field("api_version", &self.api_version)
            .field("chat_deployment", &self.chat_deployment)
            .field("embeddings_deployment", &self.embeddings_deployment)
            .field("dimensions", &self.dimensions)
            .finish()
    }
}

impl AzureOpenAIConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup
    ///
    /// Blank values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let require = |key: &str| {
            get(key).ok_or_else(|| {
                Error::Configuration(format!("Missing {} environment variable.", key))
            })
        };

        let api_key = require("AZURE_OPENAI_API_KEY")?;
        let embeddings_endpoint = require("AZURE_OPENAI_EMBEDDINGS_ENDPOINT")?;
        let chat_deployment = require("AZURE_OPENAI_API_DEPLOYMENT_NAME")?;

        let api_version = get("AZURE_OPENAI_EMBEDDINGS_API_VERSION")
            .unwrap_or_else(|| DEFAULT_API_VERSION.to_string());
        let chat_endpoint =
            get("AZURE_OPENAI_CHAT_ENDPOINT").unwrap_or_else(|| embeddings_endpoint.clone());
        let embeddings_deployment = get("AZURE_OPENAI_EMBEDDINGS_DEPLOYMENT")
            .unwrap_or_else(|| DEFAULT_EMBEDDINGS_DEPLOYMENT.to_string());
        let dimensions = match get("AZURE_OPENAI_EMBEDDINGS_DIMENSIONS") {
            Some(raw) => raw.trim().parse::<usize>().map_err(|_| {
                Error::Configuration(format!(
                    "AZURE_OPENAI_EMBEDDINGS_DIMENSIONS must be a positive integer, got '{}'",
                    raw
                ))
            })?,
            None => DEFAULT_DIMENSIONS,
        };

        let config = Self {
            api_key,
            embeddings_endpoint,
            chat_endpoint,
            api_version,
            chat_deployment,
            embeddings_deployment,
            dimensions,
        };
        config.validate()?;
        Ok(config)
    }

    /// Create configuration with explicit values
    pub fn new(api_key: String, endpoint: String, chat_deployment: String) -> Self {
        Self {
            api_key,
            chat_endpoint: endpoint.clone(),
            embeddings_endpoint: endpoint,
            api_version: DEFAULT_API_VERSION.to_string(),
            chat_deployment,
            embeddings_deployment: DEFAULT_EMBEDDINGS_DEPLOYMENT.to_string(),
            dimensions: DEFAULT_DIMENSIONS,
        }
    }

    /// Check that every required value is present and well-formed
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(Error::Configuration("Azure OpenAI API key is empty".to_string()));
        }
        if self.chat_deployment.trim().is_empty() {
            return Err(Error::Configuration(
                "Azure OpenAI chat deployment name is empty".to_string(),
            ));
        }
        if self.embeddings_deployment.trim().is_empty() {
            return Err(Error::Configuration(
                "Azure OpenAI embeddings deployment name is empty".to_string(),
            ));
        }
        if self.api_version.trim().is_empty() {
            return Err(Error::Configuration("Azure OpenAI API version is empty".to_string()));
        }
        if self.dimensions == 0 {
            return Err(Error::Configuration(
                "embedding dimensions must be greater than zero".to_string(),
            ));
        }
        check_endpoint("embeddings endpoint", &self.embeddings_endpoint)?;
        check_endpoint("chat endpoint", &self.chat_endpoint)?;
        Ok(())
    }

    /// Full URL of the embeddings operation
    pub fn embeddings_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/embeddings?api-version={}",
            self.embeddings_endpoint.trim_end_matches('/'),
            self.embeddings_deployment,
            self.api_version
        )
    }

    /// Full URL of the chat completions operation
    pub fn chat_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.chat_endpoint.trim_end_matches('/'),
            self.chat_deployment,
            self.api_version
        )
    }
}

fn check_endpoint(name: &str, raw: &str) -> Result<()> {
    let parsed = Url::parse(raw)
        .map_err(|e| Error::Configuration(format!("invalid Azure OpenAI {} '{}': {}", name, raw, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(Error::Configuration(format!(
            "Azure OpenAI {} must use http or https, got '{}'",
            name, other
        ))),
    }
}

//! Ollama configuration

use serde::{Deserialize, Serialize};
use std::env;
use url::Url;

use cora_core::{Error, Result};

pub const DEFAULT_HOST: &str = "http://localhost:11434";
pub const DEFAULT_EMBED_MODEL: &str = "mxbai-embed-large";
pub const DEFAULT_EMBED_DIMENSIONS: usize = 1024;
pub const DEFAULT_CHAT_MODEL: &str = "phi3:mini";

/// Configuration for a local Ollama server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    pub host: String,
    pub embed_model: String,
    pub embed_dimensions: usize,
    pub chat_model: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            embed_model: DEFAULT_EMBED_MODEL.to_string(),
            embed_dimensions: DEFAULT_EMBED_DIMENSIONS,
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
        }
    }
}

impl OllamaConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        let embed_dimensions = match get("OLLAMA_EMBED_DIMENSIONS") {
            Some(raw) => raw.trim().parse::<usize>().map_err(|_| {
                Error::Configuration(format!(
                    "OLLAMA_EMBED_DIMENSIONS must be a positive integer, got '{}'",
                    raw
                ))
            })?,
            None => defaults.embed_dimensions,
        };

        let config = Self {
            host: get("OLLAMA_HOST").unwrap_or(defaults.host),
            embed_model: get("OLLAMA_EMBED_MODEL").unwrap_or(defaults.embed_model),
            embed_dimensions,
            chat_model: get("OLLAMA_CHAT_MODEL").unwrap_or(defaults.chat_model),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that the host is a usable URL and the models are named
    pub fn validate(&self) -> Result<()> {
        let host = Url::parse(&self.host)
            .map_err(|e| Error::Configuration(format!("invalid OLLAMA_HOST '{}': {}", self.host, e)))?;
        if !matches!(host.scheme(), "http" | "https") {
            return Err(Error::Configuration(format!(
                "OLLAMA_HOST must use http or https, got '{}'",
                host.scheme()
            )));
        }
        if self.embed_model.trim().is_empty() || self.chat_model.trim().is_empty() {
            return Err(Error::Configuration("Ollama model names must not be empty".to_string()));
        }
        if self.embed_dimensions == 0 {
            return Err(Error::Configuration(
                "embedding dimensions must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}/api/{}", self.host.trim_end_matches('/'), path)
    }
}

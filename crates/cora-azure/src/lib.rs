//! Azure OpenAI integration for CORA
//!
//! This crate provides the Azure OpenAI implementation of the ModelProvider trait:
//! embeddings through an embeddings deployment and answers through a chat deployment.

mod client;
mod config;


pub use client::AzureOpenAIClient;
pub use config::AzureOpenAIConfig;

// Re-export core types for convenience
pub use cora_core::{Error, ModelProvider, Result, RetryConfig};

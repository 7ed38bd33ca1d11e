//! Ollama integration for CORA
//!
//! This crate provides a ModelProvider backed by a local Ollama server, for running
//! the pipeline without hosted credentials.

mod client;
mod config;


pub use client::OllamaClient;
pub use config::OllamaConfig;

// Re-export core types for convenience
pub use cora_core::{Error, ModelProvider, Result, RetryConfig};

//! Core traits and types for CORA (Constitution RAG)
//!
//! This crate defines the fundamental traits and types used across the CORA system.
//! It provides capability-facing interfaces for model providers, vector indexes,
//! document loaders, processed-file bookkeeping and question answering, making the
//! system test-friendly and extensible.

pub mod document;
pub mod error;
pub mod llm;
pub mod rag;
pub mod retry;
pub mod types;
pub mod vector_store;

pub use document::{DocumentLoader, ProcessedSet};
pub use error::{Error, Result};
pub use llm::ModelProvider;
pub use rag::QuestionAnswerer;
pub use retry::with_retry;
pub use types::*;
pub use vector_store::VectorIndex;

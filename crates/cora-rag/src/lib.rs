//! Retrieval-augmented answering for CORA
//!
//! This crate holds the pipeline itself: loading and splitting source
//! documents, the persistent vector index, processed-file bookkeeping,
//! MMR retrieval and prompt composition. Model access goes through
//! [`cora_core::ModelProvider`], so any provider crate can drive it.

pub mod composer;
pub mod config;
pub mod ingestor;
pub mod loader;
pub mod mmr;
mod persist;
pub mod processed;
pub mod retriever;
pub mod splitter;
pub mod vector_store;

#[cfg(test)]
mod tests;

pub use composer::{ANSWER_TEMPLATE, AnswerComposer, NO_INFORMATION_RESPONSE, PromptTemplate, build_context};
pub use config::{DEFAULT_COLLECTION, RagConfig, RagConfigBuilder};
pub use ingestor::{DirectoryStatus, DocumentIngestor, FileFailure, FileOutcome, IngestionReport};
pub use loader::{LoaderRegistry, MarkdownLoader, PdfLoader, TextLoader, normalize_text};
pub use processed::{ManifestMarker, RenameMarker};
pub use retriever::Retriever;
pub use splitter::{Cut, RecursiveSplitter, Separator, TextPiece, constitution_separators};
pub use vector_store::JsonVectorStore;

// Re-export core types for convenience
pub use cora_core::{Chunk, Error, QuestionAnswerer, Result, SearchParams};

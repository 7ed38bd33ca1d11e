//! Document ingestion: load, split, embed, store, mark

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use cora_core::{
    Chunk, ChunkMetadata, Document, Error, IndexEntry, ModelProvider, ProcessedSet, Result,
    VectorIndex,
};

use crate::loader::LoaderRegistry;
use crate::splitter::RecursiveSplitter;

/// Separator placed between pages before splitting
const PAGE_JOINER: &str = "\n\n";

/// What happened to a single file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FileOutcome {
    Stored { pages: usize, chunks: usize },
    /// The file loaded but held no text; it is left unmarked
    NoText { pages: usize },
    /// No loader handles the file's extension
    Unsupported,
}

/// State of the input directory for a pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum DirectoryStatus {
    #[default]
    Scanned,
    Missing,
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    pub path: PathBuf,
    pub message: String,
}

/// Summary of a directory pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestionReport {
    pub status: DirectoryStatus,
    pub files_ingested: usize,
    pub files_skipped: usize,
    pub files_already_processed: usize,
    /// Files that loaded without any extractable text
    pub files_without_text: Vec<PathBuf>,
    pub chunks_stored: usize,
    pub failures: Vec<FileFailure>,
}

impl IngestionReport {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Turns source files into stored, embedded chunks
pub struct DocumentIngestor {
    provider: Arc<dyn ModelProvider>,
    index: Arc<dyn VectorIndex>,
    splitter: RecursiveSplitter,
    processed: Arc<dyn ProcessedSet>,
    loaders: LoaderRegistry,
}

impl DocumentIngestor {
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        index: Arc<dyn VectorIndex>,
        splitter: RecursiveSplitter,
        processed: Arc<dyn ProcessedSet>,
    ) -> Self {
        Self {
            provider,
            index,
            splitter,
            processed,
            loaders: LoaderRegistry::default(),
        }
    }

    /// Replace the default PDF/text/Markdown loaders
    pub fn with_loaders(mut self, loaders: LoaderRegistry) -> Self {
        self.loaders = loaders;
        self
    }

    /// Ingest one file and return the number of chunks stored
    ///
    /// A file already in the processed set stores nothing and is not marked again.
    pub async fn ingest(&self, path: &Path) -> Result<usize> {
        if self.processed.is_processed(path)? {
            debug!(path = %path.display(), "Already processed");
            return Ok(0);
        }

        match self.ingest_file(path).await? {
            FileOutcome::Stored { chunks, .. } => Ok(chunks),
            FileOutcome::NoText { .. } | FileOutcome::Unsupported => Ok(0),
        }
    }

    /// Ingest one file, marking it processed once its chunks are stored
    pub async fn ingest_file(&self, path: &Path) -> Result<FileOutcome> {
        let Some(loader) = self.loaders.for_path(path) else {
            info!(path = %path.display(), "Skipping unsupported file");
            return Ok(FileOutcome::Unsupported);
        };

        info!(path = %path.display(), "Loading file");
        let document = loader.load(path)?;
        let pages = document.page_count();

        let chunks = self.chunk_document(&document);
        if chunks.is_empty() {
            warn!(path = %path.display(), pages, "No text extracted, leaving file unmarked");
            return Ok(FileOutcome::NoText { pages });
        }
        info!(path = %path.display(), pages, chunks = chunks.len(), "Split document");

        let count = chunks.len();
        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let embeddings = self.provider.embed_batch(&texts).await?;
        if embeddings.len() != count {
            return Err(Error::provider(
                self.provider.model_id(),
                format!("expected {} embeddings, got {}", count, embeddings.len()),
            ));
        }

        let entries: Vec<IndexEntry> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| IndexEntry::new(chunk, embedding))
            .collect();
        self.index.add(entries).await?;

        self.processed.mark_processed(path)?;
        info!(path = %path.display(), chunks = count, collection = %self.index.collection(), "Stored and marked as processed");

        Ok(FileOutcome::Stored { pages, chunks: count })
    }

    /// Split a document into chunks, recording the page of each chunk's first
    /// non-whitespace character
    pub fn chunk_document(&self, document: &Document) -> Vec<Chunk> {
        let mut text = String::new();
        let mut page_starts: Vec<(usize, usize)> = Vec::with_capacity(document.pages.len());
        let mut offset = 0;

        for (i, page) in document.pages.iter().enumerate() {
            if i > 0 {
                text.push_str(PAGE_JOINER);
                offset += PAGE_JOINER.chars().count();
            }
            page_starts.push((offset, page.number));
            text.push_str(&page.text);
            offset += page.text.chars().count();
        }

        let source = document.source.display().to_string();

        self.splitter
            .split(&text)
            .into_iter()
            .enumerate()
            .map(|(chunk_index, piece)| {
                // Chunks cut before a heading begin with the page joiner
                let first = piece.start + piece.text.chars().take_while(|c| c.is_whitespace()).count();
                let page = page_starts
                    .iter()
                    .take_while(|(start, _)| *start <= first)
                    .last()
                    .map(|(_, number)| *number);
                if piece.hard_cut {
                    debug!(source = %source, chunk_index, "Chunk was cut at the size limit");
                }

                Chunk {
                    id: Uuid::new_v4().to_string(),
                    text: piece.text,
                    metadata: ChunkMetadata {
                        source: Some(source.clone()),
                        page,
                        chunk_index,
                        hard_cut: piece.hard_cut,
                    },
                }
            })
            .collect()
    }

    /// Ingest every unprocessed file directly inside `dir`, in name order
    ///
    /// A missing or empty directory is reported, not raised. Failures of
    /// single files are collected in the report and leave the file
    /// unmarked; fatal errors stop the pass.
    pub async fn ingest_dir(&self, dir: &Path) -> Result<IngestionReport> {
        let mut report = IngestionReport::default();

        if !dir.is_dir() {
            error!(dir = %dir.display(), "Data folder not found");
            report.status = DirectoryStatus::Missing;
            return Ok(report);
        }

        let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect();
        paths.sort();

        if paths.is_empty() {
            error!(dir = %dir.display(), "No files found in data folder");
            report.status = DirectoryStatus::Empty;
            return Ok(report);
        }

        for path in paths {
            match self.processed.is_processed(&path) {
                Ok(true) => {
                    debug!(path = %path.display(), "Already processed");
                    report.files_already_processed += 1;
                    continue;
                }
                Ok(false) => {}
                Err(e) => {
                    error!(path = %path.display(), error = %e, "Could not check processed state");
                    report.failures.push(FileFailure {
                        path,
                        message: e.to_string(),
                    });
                    continue;
                }
            }

            match self.ingest_file(&path).await {
                Ok(FileOutcome::Stored { chunks, .. }) => {
                    report.files_ingested += 1;
                    report.chunks_stored += chunks;
                }
                Ok(FileOutcome::NoText { .. }) => report.files_without_text.push(path),
                Ok(FileOutcome::Unsupported) => report.files_skipped += 1,
                Err(e) if e.is_fatal() => {
                    error!(path = %path.display(), error = %e, "Fatal error, stopping ingestion");
                    return Err(e);
                }
                Err(e) => {
                    error!(path = %path.display(), error = %e, "Failed to ingest file");
                    report.failures.push(FileFailure {
                        path,
                        message: e.to_string(),
                    });
                }
            }
        }

        info!(
            ingested = report.files_ingested,
            skipped = report.files_skipped,
            already_processed = report.files_already_processed,
            without_text = report.files_without_text.len(),
            failed = report.failures.len(),
            chunks = report.chunks_stored,
            "Ingestion pass complete"
        );
        Ok(report)
    }
}

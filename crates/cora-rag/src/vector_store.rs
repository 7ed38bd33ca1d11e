//! Persistent JSON-backed vector index

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info};

use cora_core::{Error, IndexEntry, Result, ScoredChunk, SearchParams, VectorIndex};

use crate::mmr::{cosine_similarity, mmr_select};
use crate::persist::{read_json, write_json_atomic};

/// On-disk layout of one collection
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CollectionFile {
    name: String,
    /// Fixed by the first stored vector
    dimensions: Option<usize>,
    entries: BTreeMap<String, IndexEntry>,
}

impl CollectionFile {
    fn empty(name: &str) -> Self {
        Self {
            name: name.to_string(),
            dimensions: None,
            entries: BTreeMap::new(),
        }
    }
}

/// Vector index stored as `<persist_dir>/<collection>.json`
///
/// Every `add` rewrites the collection file atomically before returning, so
/// a reopened index sees exactly the entries that were acknowledged. The
/// write runs on the blocking pool while the write lock is held; searches
/// wait for it.
pub struct JsonVectorStore {
    collection: String,
    path: PathBuf,
    state: RwLock<CollectionFile>,
}

impl JsonVectorStore {
    /// Open (or create) a collection under `persist_dir`
    pub fn open(persist_dir: impl AsRef<Path>, collection: &str) -> Result<Self> {
        validate_collection_name(collection)?;

        let path = persist_dir.as_ref().join(format!("{}.json", collection));
        let state = match read_json::<CollectionFile>(&path) {
            Ok(Some(file)) => {
                if file.name != collection {
                    return Err(Error::VectorStore(format!(
                        "{} holds collection '{}', expected '{}'",
                        path.display(),
                        file.name,
                        collection
                    )));
                }
                info!(collection, entries = file.entries.len(), "Opened existing collection");
                file
            }
            Ok(None) => {
                let file = CollectionFile::empty(collection);
                write_json_atomic(&path, &file, false)?;
                info!(collection, path = %path.display(), "Created collection");
                file
            }
            Err(Error::Serialization(e)) => {
                return Err(Error::VectorStore(format!(
                    "collection file {} is corrupt: {}",
                    path.display(),
                    e
                )));
            }
            Err(e) => return Err(e),
        };

        Ok(Self {
            collection: collection.to_string(),
            path,
            state: RwLock::new(state),
        })
    }

    /// Location of the collection file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Embedding width, once the first vector has been stored
    pub async fn dimensions(&self) -> Option<usize> {
        self.state.read().await.dimensions
    }
}

fn validate_collection_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(Error::Configuration(format!(
            "invalid collection name '{}': use ASCII letters, digits, '-' or '_'",
            name
        )))
    }
}

#[async_trait]
impl VectorIndex for JsonVectorStore {
    fn collection(&self) -> &str {
        &self.collection
    }

    async fn add(&self, entries: Vec<IndexEntry>) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut state = self.state.write().await;

        let expected = state.dimensions.unwrap_or(entries[0].embedding.len());
        if expected == 0 {
            return Err(Error::VectorStore("cannot store an empty embedding".to_string()));
        }
        if let Some(bad) = entries.iter().find(|e| e.embedding.len() != expected) {
            return Err(Error::DimensionMismatch {
                expected,
                actual: bad.embedding.len(),
            });
        }

        // Only commit in memory once the file is on disk
        let mut next = state.clone();
        next.dimensions = Some(expected);
        let added = entries.len();
        for entry in entries {
            next.entries.insert(entry.id.clone(), entry);
        }
        let path = self.path.clone();
        let next = tokio::task::spawn_blocking(move || write_json_atomic(&path, &next, false).map(|_| next))
            .await
            .map_err(|e| Error::VectorStore(format!("collection write task failed: {}", e)))??;
        *state = next;

        debug!(collection = %self.collection, added, total = state.entries.len(), "Stored entries");
        Ok(())
    }

    async fn search(&self, query: &[f32], params: &SearchParams) -> Result<Vec<ScoredChunk>> {
        let state = self.state.read().await;

        if let Some(expected) = state.dimensions {
            if query.len() != expected {
                return Err(Error::DimensionMismatch {
                    expected,
                    actual: query.len(),
                });
            }
        }
        if state.entries.is_empty() || params.k == 0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(&IndexEntry, f32)> = state
            .entries
            .values()
            .map(|entry| (entry, cosine_similarity(query, &entry.embedding)))
            .collect();
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.id.cmp(&b.0.id))
        });
        scored.truncate(params.fetch_k.max(params.k));

        let vectors: Vec<&[f32]> = scored.iter().map(|(entry, _)| entry.embedding.as_slice()).collect();
        let picks = mmr_select(query, &vectors, params.k, params.lambda);

        Ok(picks
            .into_iter()
            .map(|idx| {
                let (entry, score) = scored[idx];
                ScoredChunk {
                    chunk: entry.to_chunk(),
                    score,
                }
            })
            .collect())
    }

    async fn get(&self, id: &str) -> Result<Option<IndexEntry>> {
        let state = self.state.read().await;
        Ok(state.entries.get(id).cloned())
    }

    async fn count(&self) -> Result<usize> {
        let state = self.state.read().await;
        Ok(state.entries.len())
    }
}

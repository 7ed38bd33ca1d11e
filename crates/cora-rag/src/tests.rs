//! Pipeline tests with an in-process model provider

#[cfg(test)]
pub(crate) mod fakes {
    use async_trait::async_trait;
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};
    use std::sync::atomic::{AtomicUsize, Ordering};

    use cora_core::{Error, ModelProvider, Result};

    /// Hashed bag-of-words embeddings and an echoing generator
    pub(crate) struct FakeProvider {
        dimensions: usize,
        poison: Option<String>,
        pub(crate) embed_calls: AtomicUsize,
        pub(crate) generate_calls: AtomicUsize,
    }

    impl FakeProvider {
        pub(crate) fn new() -> Self {
            Self::with_dimensions(256)
        }

        pub(crate) fn with_dimensions(dimensions: usize) -> Self {
            Self {
                dimensions,
                poison: None,
                embed_calls: AtomicUsize::new(0),
                generate_calls: AtomicUsize::new(0),
            }
        }

        /// Fail (non-fatally) to embed any text containing `word`
        pub(crate) fn failing_on(mut self, word: &str) -> Self {
            self.poison = Some(word.to_string());
            self
        }

        pub(crate) fn generate_count(&self) -> usize {
            self.generate_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ModelProvider for FakeProvider {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.embed_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(poison) = &self.poison {
                if text.contains(poison.as_str()) {
                    return Err(Error::provider("fake", "refused to embed"));
                }
            }

            let normalized: String = text
                .to_lowercase()
                .chars()
                .map(|c| if c.is_alphanumeric() { c } else { ' ' })
                .collect();
            let mut embedding = vec![0.0f32; self.dimensions];
            for word in normalized.split_whitespace() {
                let mut hasher = DefaultHasher::new();
                word.hash(&mut hasher);
                embedding[(hasher.finish() as usize) % self.dimensions] += 1.0;
            }
            Ok(embedding)
        }

        async fn generate(&self, prompt: &str) -> Result<String> {
            self.generate_calls.fetch_add(1, Ordering::SeqCst);
            let context = prompt
                .split_once("Context:\n")
                .and_then(|(_, rest)| rest.split_once("\n\nQuestion:"))
                .map(|(context, _)| context)
                .unwrap_or_default();
            Ok(format!("According to the context: {}", context))
        }

        fn dimensions(&self) -> usize {
            self.dimensions
        }

        fn model_id(&self) -> &str {
            "fake-model"
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};
    use std::path::Path;

    /// Write a PDF with one text line per page; an empty string gives a page
    /// without a content stream
    pub(crate) fn write_pdf(path: &Path, pages: &[&str]) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
        for text in pages {
            let mut page = dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
            };
            if !text.is_empty() {
                let content = Content {
                    operations: vec![
                        Operation::new("BT", vec![]),
                        Operation::new("Tf", vec!["F1".into(), 12.into()]),
                        Operation::new("Td", vec![72.into(), 720.into()]),
                        Operation::new("Tj", vec![Object::string_literal(*text)]),
                        Operation::new("ET", vec![]),
                    ],
                };
                let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
                page.set("Contents", content_id);
            }
            kids.push(doc.add_object(page).into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.save(path).unwrap();
    }
}

#[cfg(test)]
mod pipeline_tests {
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;

    use tempfile::TempDir;

    use cora_core::{Document, Error, Page, ProcessedSet, SearchParams, VectorIndex};

    use super::fakes::FakeProvider;
    use super::fixtures::write_pdf;
    use crate::{
        AnswerComposer, DirectoryStatus, DocumentIngestor, FileOutcome, JsonVectorStore, ManifestMarker,
        NO_INFORMATION_RESPONSE, RagConfig, RecursiveSplitter, RenameMarker, Retriever,
    };

    const ARTICLE_21: &str = "Article 21: Protection of life and personal liberty.";

    struct Pipeline {
        provider: Arc<FakeProvider>,
        index: Arc<JsonVectorStore>,
        ingestor: DocumentIngestor,
    }

    fn pipeline(db: &Path, provider: FakeProvider, processed: Arc<dyn ProcessedSet>) -> Pipeline {
        let provider = Arc::new(provider);
        let index = Arc::new(JsonVectorStore::open(db, "constitution").unwrap());
        let splitter = RagConfig::default().splitter().unwrap();
        let ingestor = DocumentIngestor::new(provider.clone(), index.clone(), splitter, processed);
        Pipeline {
            provider,
            index,
            ingestor,
        }
    }

    fn composer(pipeline: &Pipeline, params: SearchParams) -> AnswerComposer {
        let retriever =
            Retriever::new(pipeline.provider.clone(), pipeline.index.clone()).with_params(params);
        AnswerComposer::new(retriever, pipeline.provider.clone())
    }

    #[tokio::test]
    async fn test_article_21_end_to_end() {
        let tmp = TempDir::new().unwrap();
        let data = tmp.path().join("data");
        fs::create_dir(&data).unwrap();
        fs::write(data.join("article21.txt"), format!("{}\n", ARTICLE_21)).unwrap();

        let p = pipeline(&tmp.path().join("db"), FakeProvider::new(), Arc::new(RenameMarker::default()));
        let report = p.ingestor.ingest_dir(&data).await.unwrap();
        assert_eq!(report.status, DirectoryStatus::Scanned);
        assert_eq!(report.files_ingested, 1);
        assert_eq!(report.chunks_stored, 1);

        let composer = composer(&p, SearchParams::default());
        let chunks = composer
            .retriever()
            .retrieve("What does Article 21 protect?")
            .await
            .unwrap();
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].text.contains(ARTICLE_21));
        assert_eq!(chunks[0].metadata.page, Some(1));
        assert!(chunks[0].metadata.source.as_deref().unwrap().ends_with("article21.txt"));

        let answer = composer.answer("What does Article 21 protect?").await.unwrap();
        assert!(!answer.is_empty());
        assert_ne!(answer, NO_INFORMATION_RESPONSE);
        assert!(answer.contains("personal liberty"));
        assert_eq!(p.provider.generate_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_index_skips_generation() {
        let tmp = TempDir::new().unwrap();
        let p = pipeline(tmp.path(), FakeProvider::new(), Arc::new(RenameMarker::default()));
        let composer = composer(&p, SearchParams::default());

        let answer = composer.answer("What does Article 21 protect?").await.unwrap();
        assert_eq!(answer, NO_INFORMATION_RESPONSE);
        assert_eq!(p.provider.generate_count(), 0);
    }

    #[tokio::test]
    async fn test_nearest_chunk_is_retrieved() {
        let tmp = TempDir::new().unwrap();
        let data = tmp.path().join("data");
        fs::create_dir(&data).unwrap();
        fs::write(data.join("a.txt"), "Article 14: Equality before law.").unwrap();
        fs::write(
            data.join("b.txt"),
            "Article 19: Protection of certain rights regarding freedom of speech and expression.",
        )
        .unwrap();
        fs::write(data.join("c.txt"), ARTICLE_21).unwrap();

        let p = pipeline(&tmp.path().join("db"), FakeProvider::new(), Arc::new(RenameMarker::default()));
        p.ingestor.ingest_dir(&data).await.unwrap();
        assert_eq!(p.index.count().await.unwrap(), 3);

        let params = SearchParams {
            k: 1,
            fetch_k: 3,
            lambda: 1.0,
        };
        let chunks = composer(&p, params)
            .retriever()
            .retrieve("freedom of speech and expression")
            .await
            .unwrap();
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].text.starts_with("Article 19"));
    }

    #[tokio::test]
    async fn test_rerun_skips_processed_files() {
        let tmp = TempDir::new().unwrap();
        let data = tmp.path().join("data");
        fs::create_dir(&data).unwrap();
        fs::write(data.join("article21.txt"), ARTICLE_21).unwrap();

        let p = pipeline(&tmp.path().join("db"), FakeProvider::new(), Arc::new(RenameMarker::default()));
        p.ingestor.ingest_dir(&data).await.unwrap();
        assert!(data.join("_article21.txt").exists());

        let second = p.ingestor.ingest_dir(&data).await.unwrap();
        assert_eq!(second.files_ingested, 0);
        assert_eq!(second.files_already_processed, 1);
        assert_eq!(p.index.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_manifest_marker_leaves_files_in_place() {
        let tmp = TempDir::new().unwrap();
        let data = tmp.path().join("data");
        fs::create_dir(&data).unwrap();
        fs::write(data.join("article21.md"), format!("## Article 21\n\n{}\n", ARTICLE_21)).unwrap();

        let marker = Arc::new(ManifestMarker::open(tmp.path().join("db").join("processed.json")).unwrap());
        let p = pipeline(&tmp.path().join("db"), FakeProvider::new(), marker);

        let first = p.ingestor.ingest_dir(&data).await.unwrap();
        assert_eq!(first.files_ingested, 1);
        assert!(data.join("article21.md").exists());

        let second = p.ingestor.ingest_dir(&data).await.unwrap();
        assert_eq!(second.files_already_processed, 1);
        assert_eq!(p.index.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_failed_files_stay_unmarked() {
        let tmp = TempDir::new().unwrap();
        let data = tmp.path().join("data");
        fs::create_dir(&data).unwrap();
        fs::write(data.join("a.txt"), ARTICLE_21).unwrap();
        fs::write(data.join("b.txt"), "POISON page").unwrap();
        fs::write(data.join("c.png"), [0u8, 1, 2]).unwrap();

        let provider = FakeProvider::new().failing_on("POISON");
        let p = pipeline(&tmp.path().join("db"), provider, Arc::new(RenameMarker::default()));
        let report = p.ingestor.ingest_dir(&data).await.unwrap();

        assert_eq!(report.files_ingested, 1);
        assert_eq!(report.files_skipped, 1);
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].path.ends_with("b.txt"));
        assert!(report.has_failures());

        assert!(data.join("_a.txt").exists());
        assert!(data.join("b.txt").exists());
        assert!(data.join("c.png").exists());
    }

    #[tokio::test]
    async fn test_dimension_mismatch_aborts_pass() {
        let tmp = TempDir::new().unwrap();
        let db = tmp.path().join("db");
        let data = tmp.path().join("data");
        fs::create_dir(&data).unwrap();
        fs::write(data.join("a.txt"), ARTICLE_21).unwrap();
        fs::write(data.join("b.txt"), "Article 14: Equality before law.").unwrap();

        {
            let p = pipeline(&db, FakeProvider::with_dimensions(64), Arc::new(RenameMarker::default()));
            p.ingestor.ingest(&data.join("a.txt")).await.unwrap();
        }

        let p = pipeline(&db, FakeProvider::with_dimensions(32), Arc::new(RenameMarker::default()));
        let err = p.ingestor.ingest_dir(&data).await.unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { expected: 64, actual: 32 }));
        assert!(data.join("b.txt").exists());
    }

    #[tokio::test]
    async fn test_missing_and_empty_directories_are_reported() {
        let tmp = TempDir::new().unwrap();
        let p = pipeline(&tmp.path().join("db"), FakeProvider::new(), Arc::new(RenameMarker::default()));

        let missing = p.ingestor.ingest_dir(&tmp.path().join("nope")).await.unwrap();
        assert_eq!(missing.status, DirectoryStatus::Missing);

        let empty_dir = tmp.path().join("empty");
        fs::create_dir(&empty_dir).unwrap();
        let empty = p.ingestor.ingest_dir(&empty_dir).await.unwrap();
        assert_eq!(empty.status, DirectoryStatus::Empty);
        assert_eq!(empty.files_ingested, 0);
    }

    #[tokio::test]
    async fn test_chunks_record_starting_page() {
        let tmp = TempDir::new().unwrap();
        let provider = Arc::new(FakeProvider::new());
        let index = Arc::new(JsonVectorStore::open(tmp.path(), "constitution").unwrap());
        let ingestor = DocumentIngestor::new(
            provider,
            index,
            RecursiveSplitter::new(20, 0).unwrap(),
            Arc::new(RenameMarker::default()),
        );

        let document = Document {
            source: "constitution.pdf".into(),
            pages: vec![
                Page {
                    number: 1,
                    text: "Page one text.".to_string(),
                },
                Page {
                    number: 2,
                    text: "Page two text.".to_string(),
                },
            ],
        };

        let chunks = ingestor.chunk_document(&document);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "Page one text.\n\n");
        assert_eq!(chunks[0].metadata.page, Some(1));
        assert_eq!(chunks[1].text, "Page two text.");
        assert_eq!(chunks[1].metadata.page, Some(2));
        assert_eq!(chunks[1].metadata.chunk_index, 1);
        assert_ne!(chunks[0].id, chunks[1].id);
    }

    #[tokio::test]
    async fn test_pdf_chunks_carry_page_numbers() {
        let tmp = TempDir::new().unwrap();
        let data = tmp.path().join("data");
        fs::create_dir(&data).unwrap();
        write_pdf(
            &data.join("constitution.pdf"),
            &[ARTICLE_21, "Article 22: Protection against arrest and detention."],
        );

        let provider = Arc::new(FakeProvider::new());
        let index = Arc::new(JsonVectorStore::open(&tmp.path().join("db"), "constitution").unwrap());
        let ingestor = DocumentIngestor::new(
            provider.clone(),
            index.clone(),
            RecursiveSplitter::new(60, 0).unwrap(),
            Arc::new(RenameMarker::default()),
        );

        let report = ingestor.ingest_dir(&data).await.unwrap();
        assert_eq!(report.files_ingested, 1);
        assert_eq!(report.chunks_stored, 2);
        assert!(data.join("_constitution.pdf").exists());

        let params = SearchParams {
            k: 2,
            fetch_k: 2,
            lambda: 1.0,
        };
        let chunks = Retriever::new(provider, index)
            .with_params(params)
            .retrieve("protection")
            .await
            .unwrap();
        assert_eq!(chunks.len(), 2);
        for chunk in &chunks {
            assert!(chunk.metadata.source.as_deref().unwrap().ends_with("constitution.pdf"));
            let expected = if chunk.text.contains("Article 22") { 2 } else { 1 };
            assert_eq!(chunk.metadata.page, Some(expected), "{:?}", chunk.text);
        }
    }

    #[tokio::test]
    async fn test_file_without_text_is_reported_and_unmarked() {
        let tmp = TempDir::new().unwrap();
        let data = tmp.path().join("data");
        fs::create_dir(&data).unwrap();
        fs::write(data.join("a.txt"), ARTICLE_21).unwrap();
        fs::write(data.join("blank.txt"), "  \n\t\n").unwrap();
        write_pdf(&data.join("scan.pdf"), &["", ""]);

        let p = pipeline(&tmp.path().join("db"), FakeProvider::new(), Arc::new(RenameMarker::default()));
        let report = p.ingestor.ingest_dir(&data).await.unwrap();

        assert_eq!(report.files_ingested, 1);
        assert_eq!(report.chunks_stored, 1);
        assert_eq!(report.files_without_text, vec![data.join("blank.txt"), data.join("scan.pdf")]);
        assert!(!report.has_failures());
        assert!(data.join("blank.txt").exists());
        assert!(data.join("scan.pdf").exists());
        assert_eq!(p.index.count().await.unwrap(), 1);

        let outcome = p.ingestor.ingest_file(&data.join("scan.pdf")).await.unwrap();
        assert_eq!(outcome, FileOutcome::NoText { pages: 2 });
    }

    #[tokio::test]
    async fn test_ingest_skips_processed_file() {
        let tmp = TempDir::new().unwrap();
        let data = tmp.path().join("data");
        fs::create_dir(&data).unwrap();
        let marked = data.join("_a.txt");
        fs::write(&marked, ARTICLE_21).unwrap();

        let p = pipeline(&tmp.path().join("db"), FakeProvider::new(), Arc::new(RenameMarker::default()));
        assert_eq!(p.ingestor.ingest(&marked).await.unwrap(), 0);

        assert!(marked.exists());
        assert!(!data.join("__a.txt").exists());
        assert_eq!(p.index.count().await.unwrap(), 0);
        assert_eq!(p.provider.embed_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }
}

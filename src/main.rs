use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cora_azure::AzureOpenAIClient;
use cora_cli::{display_banner, run_session};
use cora_core::{ModelProvider, ProcessedSet, VectorIndex};
use cora_ollama::OllamaClient;
use cora_rag::{
    AnswerComposer, DirectoryStatus, DocumentIngestor, IngestionReport, JsonVectorStore,
    ManifestMarker, RagConfig, RenameMarker, Retriever,
};

const MANIFEST_FILE: &str = "processed.json";

#[derive(Parser)]
#[command(name = "cora")]
#[command(about = "Question answering over the Indian Constitution", long_about = None)]
struct Cli {
    /// Model provider for embeddings and answers
    #[arg(long, global = true, env = "CORA_PROVIDER", value_enum, default_value_t = ProviderKind::Azure)]
    provider: ProviderKind,

    /// Directory holding the vector collections
    #[arg(long, global = true, env = "CORA_DB_DIR", default_value = "db")]
    db_dir: PathBuf,

    /// Vector collection name
    #[arg(long, global = true, env = "CORA_COLLECTION", default_value = "constitution")]
    collection: String,

    /// Maximum chunk size in characters
    #[arg(long, global = true, env = "CORA_CHUNK_SIZE", default_value_t = 1800)]
    chunk_size: usize,

    /// Characters shared by neighbouring chunks
    #[arg(long, global = true, env = "CORA_CHUNK_OVERLAP", default_value_t = 200)]
    chunk_overlap: usize,

    /// Chunks retrieved per question
    #[arg(long, global = true, env = "CORA_K", default_value_t = 6)]
    k: usize,

    /// Candidates considered before diversity re-ranking
    #[arg(long, global = true, env = "CORA_FETCH_K", default_value_t = 20)]
    fetch_k: usize,

    /// Relevance/diversity trade-off (1.0 = relevance only)
    #[arg(long, global = true, env = "CORA_LAMBDA", default_value_t = 0.5)]
    lambda: f32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest unprocessed documents from the data directory
    Ingest {
        #[arg(long, env = "CORA_DATA_DIR", default_value = "data")]
        data_dir: PathBuf,

        /// How processed files are remembered
        #[arg(long, value_enum, default_value_t = MarkerKind::Rename)]
        marker: MarkerKind,
    },
    /// Ask questions interactively, or once with --question
    Chat {
        #[arg(short, long)]
        question: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ProviderKind {
    Azure,
    Ollama,
}

impl ProviderKind {
    fn as_str(self) -> &'static str {
        match self {
            ProviderKind::Azure => "azure",
            ProviderKind::Ollama => "ollama",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum MarkerKind {
    /// Prefix processed files with "_"
    Rename,
    /// Record content digests in <db-dir>/processed.json
    Manifest,
}

impl Cli {
    fn rag_config(&self) -> cora_core::Result<RagConfig> {
        RagConfig::builder()
            .collection(self.collection.clone())
            .chunk_size(self.chunk_size)
            .chunk_overlap(self.chunk_overlap)
            .k(self.k)
            .fetch_k(self.fetch_k)
            .lambda(self.lambda)
            .build()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Before parsing so `.env` values feed the CORA_* fallbacks
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing();

    let config = cli.rag_config()?;
    let provider = build_provider(cli.provider)?;
    let index: Arc<dyn VectorIndex> = Arc::new(
        JsonVectorStore::open(&cli.db_dir, &config.collection)
            .with_context(|| format!("failed to open vector store in {}", cli.db_dir.display()))?,
    );
    info!(
        provider = cli.provider.as_str(),
        model = provider.model_id(),
        collection = %config.collection,
        "Pipeline ready"
    );

    match cli.command {
        Commands::Ingest { ref data_dir, marker } => {
            let processed = build_marker(marker, &cli.db_dir)?;
            let ingestor = DocumentIngestor::new(provider, index, config.splitter()?, processed);
            let report = ingestor.ingest_dir(data_dir).await?;
            print_report(data_dir, &report);
        }
        Commands::Chat { ref question } => {
            let retriever = Retriever::new(provider.clone(), index).with_params(config.search);
            let composer = AnswerComposer::new(retriever, provider);

            match question {
                Some(question) => {
                    let answer = composer.answer(question).await?;
                    println!("{}", answer);
                }
                None => {
                    display_banner(cli.provider.as_str(), &config.collection);
                    let answered = run_session(&composer, io::stdin().lock(), io::stdout()).await?;
                    info!(answered, "Session ended");
                    println!("{}", "Goodbye!".green());
                }
            }
        }
    }

    Ok(())
}

/// Logs go to stderr so the chat transcript on stdout stays clean
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn build_provider(kind: ProviderKind) -> Result<Arc<dyn ModelProvider>> {
    let provider: Arc<dyn ModelProvider> = match kind {
        ProviderKind::Azure => Arc::new(AzureOpenAIClient::from_env()?),
        ProviderKind::Ollama => Arc::new(OllamaClient::from_env()?),
    };
    Ok(provider)
}

fn build_marker(kind: MarkerKind, db_dir: &Path) -> Result<Arc<dyn ProcessedSet>> {
    let marker: Arc<dyn ProcessedSet> = match kind {
        MarkerKind::Rename => Arc::new(RenameMarker::default()),
        MarkerKind::Manifest => Arc::new(ManifestMarker::open(db_dir.join(MANIFEST_FILE))?),
    };
    Ok(marker)
}

fn print_report(data_dir: &Path, report: &IngestionReport) {
    match report.status {
        DirectoryStatus::Missing => {
            println!("{} Data folder not found: {}", "✗".red(), data_dir.display());
            return;
        }
        DirectoryStatus::Empty => {
            println!("{} No files found in {}", "✗".red(), data_dir.display());
            return;
        }
        DirectoryStatus::Scanned => {}
    }

    println!("{}", "Ingestion summary".bold());
    println!("  {} {}", "ingested:".green(), report.files_ingested);
    println!("  {} {}", "chunks stored:".green(), report.chunks_stored);
    println!("  {} {}", "already processed:".dimmed(), report.files_already_processed);
    println!("  {} {}", "unsupported:".dimmed(), report.files_skipped);
    if !report.files_without_text.is_empty() {
        println!("  {} {}", "no text found:".yellow(), report.files_without_text.len());
        for path in &report.files_without_text {
            println!("    {} {}", "•".yellow(), path.display());
        }
    }
    if report.has_failures() {
        println!("  {} {}", "failed:".red(), report.failures.len());
        for failure in &report.failures {
            println!("    {} {}: {}", "•".red(), failure.path.display(), failure.message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults_match_pipeline_defaults() {
        let cli = Cli::try_parse_from(["cora", "chat"]).unwrap();
        assert_eq!(cli.rag_config().unwrap(), RagConfig::default());
        assert!(matches!(cli.command, Commands::Chat { question: None }));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "cora", "ingest", "--provider", "ollama", "--marker", "manifest", "--chunk-size", "900",
        ])
        .unwrap();
        assert_eq!(cli.provider, ProviderKind::Ollama);
        assert_eq!(cli.chunk_size, 900);
        assert!(matches!(
            cli.command,
            Commands::Ingest { marker: MarkerKind::Manifest, .. }
        ));
    }

    #[test]
    fn test_invalid_overlap_is_rejected() {
        let cli = Cli::try_parse_from(["cora", "--chunk-overlap", "2000", "chat"]).unwrap();
        assert!(cli.rag_config().is_err());
    }
}

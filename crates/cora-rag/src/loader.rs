//! Document loaders for the supported source formats

use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use pulldown_cmark::{Event, Parser, TagEnd};
use regex::Regex;
use tracing::{debug, warn};

use cora_core::{Document, DocumentLoader, Error, Page, Result};

static HORIZONTAL_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\u{00A0}\u{000C}]+").expect("static regex"));
static TRAILING_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m) +$").expect("static regex"));
static BLANK_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("static regex"));

/// Tidy extracted text so splitting sees stable separators
///
/// Line endings become `\n`, runs of horizontal whitespace collapse to one
/// space, trailing spaces are dropped and at most one blank line separates
/// paragraphs.
pub fn normalize_text(raw: &str) -> String {
    let text = raw.replace("\r\n", "\n").replace('\r', "\n");
    let text = HORIZONTAL_SPACE.replace_all(&text, " ");
    let text = TRAILING_SPACE.replace_all(&text, "");
    let text = BLANK_RUNS.replace_all(&text, "\n\n");
    text.trim().to_string()
}

/// PDF loader producing one page per PDF page
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfLoader;

impl DocumentLoader for PdfLoader {
    fn extensions(&self) -> &[&'static str] {
        &["pdf"]
    }

    fn load(&self, path: &Path) -> Result<Document> {
        let doc = lopdf::Document::load(path)
            .map_err(|e| Error::ingestion(path, format!("failed to parse PDF: {}", e)))?;

        let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
        let mut pages = Vec::with_capacity(page_numbers.len());

        for (idx, page_number) in page_numbers.iter().enumerate() {
            let raw = doc.extract_text(&[*page_number]).unwrap_or_else(|e| {
                warn!(path = %path.display(), page = page_number, error = %e, "could not extract page text");
                String::new()
            });
            pages.push(Page {
                number: idx + 1,
                text: normalize_text(&raw),
            });
        }

        debug!(path = %path.display(), pages = pages.len(), "parsed PDF");
        Ok(Document {
            source: path.to_path_buf(),
            pages,
        })
    }
}

/// Plain UTF-8 text, loaded as a single page
#[derive(Debug, Default, Clone, Copy)]
pub struct TextLoader;

impl DocumentLoader for TextLoader {
    fn extensions(&self) -> &[&'static str] {
        &["txt"]
    }

    fn load(&self, path: &Path) -> Result<Document> {
        let raw = read_utf8(path)?;
        Ok(single_page(path, normalize_text(&raw)))
    }
}

/// Markdown rendered to plain text, loaded as a single page
#[derive(Debug, Default, Clone, Copy)]
pub struct MarkdownLoader;

impl DocumentLoader for MarkdownLoader {
    fn extensions(&self) -> &[&'static str] {
        &["md", "markdown"]
    }

    fn load(&self, path: &Path) -> Result<Document> {
        let raw = read_utf8(path)?;
        Ok(single_page(path, normalize_text(&markdown_to_text(&raw))))
    }
}

fn read_utf8(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| Error::ingestion(path, format!("failed to read file: {}", e)))?;
    String::from_utf8(bytes).map_err(|_| Error::ingestion(path, "file is not valid UTF-8"))
}

fn single_page(path: &Path, text: String) -> Document {
    Document {
        source: path.to_path_buf(),
        pages: vec![Page { number: 1, text }],
    }
}

/// Strip markup, keeping block structure as blank lines
fn markdown_to_text(source: &str) -> String {
    let mut out = String::with_capacity(source.len());

    for event in Parser::new(source) {
        match event {
            Event::Text(text) | Event::Code(text) => out.push_str(&text),
            Event::SoftBreak | Event::HardBreak => out.push('\n'),
            Event::End(TagEnd::Paragraph)
            | Event::End(TagEnd::Heading(_))
            | Event::End(TagEnd::CodeBlock) => out.push_str("\n\n"),
            Event::End(TagEnd::Item) => out.push('\n'),
            _ => {}
        }
    }

    out
}

/// Loaders keyed by file extension
pub struct LoaderRegistry {
    loaders: Vec<Box<dyn DocumentLoader>>,
}

impl Default for LoaderRegistry {
    fn default() -> Self {
        Self::empty()
            .with_loader(Box::new(PdfLoader))
            .with_loader(Box::new(TextLoader))
            .with_loader(Box::new(MarkdownLoader))
    }
}

impl LoaderRegistry {
    /// A registry that supports nothing
    pub fn empty() -> Self {
        Self { loaders: Vec::new() }
    }

    /// Register a loader; later loaders win for shared extensions
    pub fn with_loader(mut self, loader: Box<dyn DocumentLoader>) -> Self {
        self.loaders.insert(0, loader);
        self
    }

    /// Loader for the file's extension, compared case-insensitively
    pub fn for_path(&self, path: &Path) -> Option<&dyn DocumentLoader> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        self.loaders
            .iter()
            .find(|loader| loader.extensions().contains(&extension.as_str()))
            .map(|loader| loader.as_ref())
    }

    pub fn supports(&self, path: &Path) -> bool {
        self.for_path(path).is_some()
    }

    /// All registered extensions, sorted
    pub fn extensions(&self) -> Vec<&'static str> {
        let mut all: Vec<&'static str> = self
            .loaders
            .iter()
            .flat_map(|loader| loader.extensions().iter().copied())
            .collect();
        all.sort_unstable();
        all.dedup();
        all
    }
}

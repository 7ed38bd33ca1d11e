//! Layered-separator text splitting
//!
//! [`RecursiveSplitter`] walks the text left to right. While the rest of the
//! text is longer than the chunk size it looks at the next window of at most
//! `chunk_size` characters and ends the chunk at the last occurrence of the
//! most meaningful separator found in that window, trying each separator in
//! priority order. Only when no separator fits does it cut blindly at the
//! window end. The following chunk starts exactly `chunk_overlap` characters
//! before the previous one ended, so neighbours always share that many
//! characters.
//!
//! All lengths and offsets are counted in `char`s.

use serde::{Deserialize, Serialize};
use tracing::warn;

use cora_core::{Error, Result};

/// Which side of a separator the chunk boundary falls on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cut {
    /// End the chunk just before the separator (headings start the next chunk)
    Before,
    /// Keep the separator at the end of the chunk
    After,
}

/// A boundary marker tried by the splitter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Separator {
    pattern: Vec<char>,
    cut: Cut,
}

impl Separator {
    /// Boundary placed before `pattern`
    pub fn before(pattern: &str) -> Self {
        Self {
            pattern: pattern.chars().collect(),
            cut: Cut::Before,
        }
    }

    /// Boundary placed after `pattern`
    pub fn after(pattern: &str) -> Self {
        Self {
            pattern: pattern.chars().collect(),
            cut: Cut::After,
        }
    }

    pub fn pattern(&self) -> String {
        self.pattern.iter().collect()
    }

    pub fn cut(&self) -> Cut {
        self.cut
    }
}

/// Separators tuned for constitutional text: article headings, then
/// paragraphs, lines, sentences and words.
pub fn constitution_separators() -> Vec<Separator> {
    vec![
        Separator::before("\n\nArticle "),
        Separator::before("\nArticle "),
        Separator::after("\n\n"),
        Separator::after("\n"),
        Separator::after(". "),
        Separator::after(" "),
    ]
}

/// A piece of the input produced by the splitter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextPiece {
    pub text: String,
    /// Offset of the first character in the input, in chars
    pub start: usize,
    /// No separator fit in the window; the piece was cut at the size limit
    pub hard_cut: bool,
}

/// Splits text into bounded, overlapping pieces on the best available boundary
#[derive(Debug, Clone)]
pub struct RecursiveSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<Separator>,
}

impl RecursiveSplitter {
    /// Create a splitter with the constitution separators
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if `chunk_size` is zero or
    /// `chunk_overlap >= chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::Configuration("chunk_size must be greater than zero".to_string()));
        }
        if chunk_overlap >= chunk_size {
            return Err(Error::Configuration(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }

        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators: constitution_separators(),
        })
    }

    /// Replace the separator list; earlier entries take priority
    pub fn with_separators(mut self, separators: Vec<Separator>) -> Self {
        self.separators = separators
            .into_iter()
            .filter(|s| !s.pattern.is_empty())
            .collect();
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split `text` into pieces. Blank input yields no pieces.
    pub fn split(&self, text: &str) -> Vec<TextPiece> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let chars: Vec<char> = text.chars().collect();
        let mut pieces = Vec::new();
        let mut start = 0;

        loop {
            if chars.len() - start <= self.chunk_size {
                pieces.push(piece(&chars, start, chars.len(), false));
                break;
            }

            let window_end = start + self.chunk_size;
            // The next chunk starts `chunk_overlap` before this one ends, so the
            // boundary must lie past that point for the walk to advance.
            let min_end = start + self.chunk_overlap + 1;

            let (end, hard_cut) = match self.find_boundary(&chars, min_end, window_end) {
                Some(end) => (end, false),
                None => {
                    warn!(
                        offset = start,
                        chunk_size = self.chunk_size,
                        "no separator inside window, cutting at size limit"
                    );
                    (window_end, true)
                }
            };

            pieces.push(piece(&chars, start, end, hard_cut));
            start = end - self.chunk_overlap;
        }

        pieces
    }

    /// Last boundary in `[min_end, window_end]` for the highest-priority
    /// separator that has one.
    fn find_boundary(&self, chars: &[char], min_end: usize, window_end: usize) -> Option<usize> {
        self.separators
            .iter()
            .find_map(|separator| last_boundary(chars, separator, min_end, window_end))
    }
}

fn last_boundary(chars: &[char], separator: &Separator, min_end: usize, window_end: usize) -> Option<usize> {
    let len = separator.pattern.len();
    if len > chars.len() {
        return None;
    }

    // Range of match positions whose boundary lands inside the window
    let (lowest, highest) = match separator.cut {
        Cut::Before => (min_end, window_end.min(chars.len() - len)),
        Cut::After => (min_end.saturating_sub(len), window_end.checked_sub(len)?),
    };
    if lowest > highest {
        return None;
    }

    (lowest..=highest)
        .rev()
        .find(|&at| chars[at..at + len] == separator.pattern[..])
        .map(|at| match separator.cut {
            Cut::Before => at,
            Cut::After => at + len,
        })
        .filter(|&end| end >= min_end && end <= window_end)
}

fn piece(chars: &[char], start: usize, end: usize, hard_cut: bool) -> TextPiece {
    TextPiece {
        text: chars[start..end].iter().collect(),
        start,
        hard_cut,
    }
}

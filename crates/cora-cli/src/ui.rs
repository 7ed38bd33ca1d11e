//! UI utilities for the CLI

use colored::*;
use crossterm::terminal::size;

const TITLE: &str = "CORA - Constitution RAG";

/// Plain banner lines fitted to `terminal_width`
fn banner_lines(terminal_width: usize, provider: &str, collection: &str) -> Vec<String> {
    let banner_width = terminal_width.saturating_sub(4).clamp(40, 67);
    let inner = banner_width - 2;

    let body = [
        String::new(),
        TITLE.to_string(),
        String::new(),
        "Ask questions about the Indian Constitution.".to_string(),
        "Answers are grounded in the indexed documents.".to_string(),
        String::new(),
        format!("provider: {} | collection: {}", provider, collection),
        String::new(),
    ];

    let mut lines = Vec::with_capacity(body.len() + 2);
    lines.push(format!("┌{}┐", "─".repeat(inner)));
    for text in body {
        let text: String = text.chars().take(inner - 2).collect();
        let padding = inner - 2 - text.chars().count();
        lines.push(format!("│  {}{}│", text, " ".repeat(padding)));
    }
    lines.push(format!("└{}┘", "─".repeat(inner)));
    lines
}

/// Display the startup banner
pub fn display_banner(provider: &str, collection: &str) {
    let terminal_width = size().map(|(w, _)| w as usize).unwrap_or(80);

    println!();
    for line in banner_lines(terminal_width, provider, collection) {
        if line.contains(TITLE) {
            println!("{}", line.blue().bold());
        } else {
            println!("{}", line.blue());
        }
    }
    println!();
    println!("{}", "Tip: type a question, or 'exit' to quit".dimmed());
    println!();
}

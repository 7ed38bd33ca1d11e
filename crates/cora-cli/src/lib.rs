//! Terminal interface for CORA

mod repl;
mod ui;

pub use repl::{PROMPT, is_exit_command, run_session};
pub use ui::display_banner;

// Re-export core types
pub use cora_core::{Error, Result};

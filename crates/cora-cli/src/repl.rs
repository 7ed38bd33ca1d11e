//! Interactive question loop

use colored::*;
use std::io::{BufRead, Write};
use tracing::{debug, error};

use cora_core::{QuestionAnswerer, Result};

pub const PROMPT: &str = "User: ";

const EXIT_COMMANDS: [&str; 3] = ["exit", "quit", "q"];

/// Whether the line ends the session (`exit`, `quit` or `q`, any case)
pub fn is_exit_command(line: &str) -> bool {
    let line = line.trim();
    EXIT_COMMANDS
        .iter()
        .any(|command| line.eq_ignore_ascii_case(command))
}

/// Read questions from `input` until an exit command or end of input,
/// writing answers to `output`. Returns the number of questions answered.
///
/// Errors from a single question are printed and the loop continues;
/// fatal errors end the session.
pub async fn run_session<A, R, W>(answerer: &A, mut input: R, mut output: W) -> Result<usize>
where
    A: QuestionAnswerer + ?Sized,
    R: BufRead,
    W: Write,
{
    let mut answered = 0;
    let mut line = String::new();

    loop {
        write!(output, "{}", PROMPT)?;
        output.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            writeln!(output)?;
            break;
        }

        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if is_exit_command(question) {
            debug!("Exit requested");
            break;
        }

        match answerer.answer(question).await {
            Ok(answer) => {
                writeln!(output, "Bot: {}", answer)?;
                answered += 1;
            }
            Err(e) if e.is_fatal() => {
                error!(error = %e, "Fatal error, ending session");
                return Err(e);
            }
            Err(e) => {
                error!(error = %e, "Failed to answer question");
                writeln!(output, "{} {}", "Error:".red().bold(), e)?;
            }
        }
    }

    Ok(answered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cora_core::Error;
    use std::io::Cursor;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingAnswerer {
        questions: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl QuestionAnswerer for RecordingAnswerer {
        async fn answer(&self, question: &str) -> Result<String> {
            self.questions.lock().unwrap().push(question.to_string());
            match question {
                "flaky" => Err(Error::provider("fake", "service unavailable")),
                "broken" => Err(Error::Authentication("bad key".to_string())),
                _ => Ok(format!("answer to {}", question)),
            }
        }
    }

    async fn run(answerer: &RecordingAnswerer, input: &str) -> (Result<usize>, String) {
        let mut output = Vec::new();
        let result = run_session(answerer, Cursor::new(input.to_string()), &mut output).await;
        (result, String::from_utf8(output).unwrap())
    }

    #[tokio::test]
    async fn test_exit_after_one_question() {
        let answerer = RecordingAnswerer::default();
        let (result, output) = run(&answerer, "hello\nexit\n").await;

        assert_eq!(result.unwrap(), 1);
        assert_eq!(output.matches(PROMPT).count(), 2);
        assert!(output.contains("Bot: answer to hello"));
        assert_eq!(*answerer.questions.lock().unwrap(), vec!["hello".to_string()]);
    }

    #[tokio::test]
    async fn test_blank_lines_and_eof() {
        let answerer = RecordingAnswerer::default();
        let (result, _) = run(&answerer, "\n   \nWhat is Article 21?").await;

        assert_eq!(result.unwrap(), 1);
        assert_eq!(
            *answerer.questions.lock().unwrap(),
            vec!["What is Article 21?".to_string()]
        );
    }

    #[tokio::test]
    async fn test_non_fatal_error_continues() {
        let answerer = RecordingAnswerer::default();
        let (result, output) = run(&answerer, "flaky\nsecond\n  QUIT \nignored\n").await;

        assert_eq!(result.unwrap(), 1);
        assert!(output.contains("service unavailable"));
        assert!(output.contains("Bot: answer to second"));
        assert_eq!(answerer.questions.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_fatal_error_ends_session() {
        let answerer = RecordingAnswerer::default();
        let (result, _) = run(&answerer, "broken\nnever asked\n").await;

        assert!(matches!(result, Err(Error::Authentication(_))));
        assert_eq!(answerer.questions.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_exit_commands() {
        for line in ["exit", "QUIT", " q ", "Exit\n"] {
            assert!(is_exit_command(line), "{line:?}");
        }
        for line in ["", "exit now", "quiet", "question"] {
            assert!(!is_exit_command(line), "{line:?}");
        }
    }
}

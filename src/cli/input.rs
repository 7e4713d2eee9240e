use std::io::{self, BufRead};
use std::thread;

use tokio::sync::mpsc;
use tracing::debug;

/// Words that end the interactive session (case-insensitive).
pub const QUIT_COMMANDS: &[&str] = &["quit", "exit", "q"];

/// One line typed at the prompt.
#[derive(Debug, PartialEq, Eq)]
pub enum Input {
    Quit,
    /// Blank line; the loop asks again.
    Empty,
    Question(String),
}

impl Input {
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            Self::Empty
        } else if QUIT_COMMANDS
            .iter()
            .any(|cmd| trimmed.eq_ignore_ascii_case(cmd))
        {
            Self::Quit
        } else {
            Self::Question(trimmed.to_string())
        }
    }

    /// Parse a `--question` argument. Quit words are ordinary questions here.
    #[must_use]
    pub fn one_shot(text: &str) -> Self {
        match text.trim() {
            "" => Self::Empty,
            question => Self::Question(question.to_string()),
        }
    }
}

/// Read stdin line by line on a dedicated thread.
///
/// The thread is detached: the process may exit while it is still blocked on
/// a read. The channel closes at end of input or on a read error.
pub fn stdin_lines() -> io::Result<mpsc::Receiver<String>> {
    let (tx, rx) = mpsc::channel(1);
    thread::Builder::new()
        .name("ragchat-stdin".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        debug!("stdin read failed: {e}");
                        break;
                    }
                };
                if tx.blocking_send(line).is_err() {
                    break;
                }
            }
        })?;
    Ok(rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quit_commands() {
        assert_eq!(Input::parse("quit"), Input::Quit);
        assert_eq!(Input::parse("  EXIT \n"), Input::Quit);
        assert_eq!(Input::parse("Q"), Input::Quit);
    }

    #[test]
    fn test_empty() {
        assert_eq!(Input::parse(""), Input::Empty);
        assert_eq!(Input::parse("   \t"), Input::Empty);
    }

    #[test]
    fn test_one_shot_accepts_quit_words() {
        assert_eq!(Input::one_shot(" q "), Input::Question("q".to_string()));
        assert_eq!(Input::one_shot("exit"), Input::Question("exit".to_string()));
        assert_eq!(Input::one_shot("  \n"), Input::Empty);
    }

    #[test]
    fn test_question_trimmed() {
        assert_eq!(
            Input::parse("  What is RAG?\n"),
            Input::Question("What is RAG?".to_string())
        );
        assert_eq!(
            Input::parse("quit smoking?"),
            Input::Question("quit smoking?".to_string())
        );
    }
}

/// The interactive question loop.
///
/// Lines arrive over a channel (see [`super::input::stdin_lines`]) and the
/// interrupt signal is an injected future factory, so the loop never blocks
/// the runtime on terminal I/O.
use std::future::Future;

use tokio::sync::mpsc;

use super::{Input, TerminalReporter, output};
use crate::chat::RagChat;
use crate::source::RetrievalSource;

/// Why the interactive loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// A quit command was entered.
    Quit,
    /// The line channel closed.
    EndOfInput,
    /// Interrupted while waiting at the prompt.
    Interrupted,
}

/// Prompt for questions until quit, end of input or an interrupt at the prompt.
///
/// An interrupt while an answer is pending drops that request and returns to
/// the prompt; the session stays usable.
pub async fn run_interactive<S, I, F>(
    chat: &RagChat<S>,
    lines: &mut mpsc::Receiver<String>,
    mut interrupt: I,
) -> SessionEnd
where
    S: RetrievalSource,
    I: FnMut() -> F,
    F: Future<Output = ()>,
{
    loop {
        output::prompt("Your question");
        let line = tokio::select! {
            line = lines.recv() => line,
            () = interrupt() => {
                println!();
                return SessionEnd::Interrupted;
            }
        };
        let Some(line) = line else {
            println!();
            return SessionEnd::EndOfInput;
        };

        let question = match Input::parse(&line) {
            Input::Quit => return SessionEnd::Quit,
            Input::Empty => {
                output::warning("Please enter a question.");
                continue;
            }
            Input::Question(q) => q,
        };

        output::separator();
        let reporter = TerminalReporter::new();
        let answer = tokio::select! {
            answer = chat.chat(&question, &reporter) => Some(answer),
            () = interrupt() => None,
        };
        reporter.finish();

        match answer {
            Some(answer) => output::answer(&answer),
            None => output::warning("Operation cancelled"),
        }
    }
}

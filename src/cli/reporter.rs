/// Turns [`ChatEvent`]s into terminal lines and a spinner.
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use super::output;
use crate::chat::{ChatEvent, Reporter};

const TICK: Duration = Duration::from_millis(80);

/// Reporter for one chat cycle. The spinner is purely cosmetic.
#[derive(Default)]
pub struct TerminalReporter {
    spinner: Mutex<Option<ProgressBar>>,
}

impl TerminalReporter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn start_spinner(&self, message: &'static str) {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "),
        );
        pb.set_message(message);
        pb.enable_steady_tick(TICK);

        let mut slot = self.spinner.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(old) = slot.replace(pb) {
            old.finish_and_clear();
        }
    }

    /// Stop and erase the spinner, if one is running.
    pub fn finish(&self) {
        let mut slot = self.spinner.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(pb) = slot.take() {
            pb.finish_and_clear();
        }
    }
}

impl Reporter for TerminalReporter {
    fn report(&self, event: ChatEvent) {
        self.finish();
        match event {
            ChatEvent::Retrieving { question } => {
                output::retrieving(&question);
                self.start_spinner("Searching knowledge base...");
            }
            ChatEvent::DocumentsFound(count) => output::document_count(count),
            ChatEvent::Generating => {
                output::generating();
                self.start_spinner("Thinking...");
            }
            ChatEvent::Error(message) => output::error(&message),
        }
    }
}

impl Drop for TerminalReporter {
    fn drop(&mut self) {
        self.finish();
    }
}

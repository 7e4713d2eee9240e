/// Command-line surface: arguments, terminal output and the event reporter.
pub mod input;
pub mod output;
pub mod reporter;
pub mod session;

use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::config::Config;
use crate::source::SourceKind;

pub use input::Input;
pub use reporter::TerminalReporter;
pub use session::{SessionEnd, run_interactive};

#[derive(Parser, Debug)]
#[command(name = "ragchat", version, about = "Retrieval-augmented chat in the terminal")]
pub struct Cli {
    /// Retrieval source (overrides the settings file and RAG_SOURCE)
    #[arg(short, long, value_enum)]
    pub source: Option<SourceKind>,

    /// Number of documents to retrieve per question
    #[arg(short, long)]
    pub num_results: Option<usize>,

    /// Ask a single question, print the answer and exit
    #[arg(short, long)]
    pub question: Option<String>,

    /// JSON settings file
    #[arg(short, long, default_value = "ragchat.json")]
    pub config: PathBuf,

    /// .env file to load instead of ./.env
    #[arg(long)]
    pub env_file: Option<PathBuf>,

    /// Retry once without certificate verification when TLS validation fails
    #[arg(long)]
    pub allow_insecure_tls: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Apply command-line overrides on top of loaded settings.
    pub fn apply(&self, config: &mut Config) {
        if let Some(source) = self.source {
            config.source = source;
        }
        if let Some(n) = self.num_results {
            config.num_results = n;
        }
        if self.allow_insecure_tls {
            config.allow_insecure_tls = true;
        }
    }

    /// Default log filter when `RUST_LOG` is unset.
    #[must_use]
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}

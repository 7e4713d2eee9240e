use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use ragchat::chat::RagChat;
use ragchat::cli::input::stdin_lines;
use ragchat::cli::{Cli, Input, TerminalReporter, output, run_interactive};
use ragchat::config::{Config, ConfigError, Env, EnvOrigin};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            output::error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    // 1. Load environment
    let env = Env::load(cli.env_file.as_deref()).context("failed to load environment")?;
    match env.origin() {
        EnvOrigin::File(path) => output::info(&format!(
            "Environment variables loaded from {}",
            path.display()
        )),
        EnvOrigin::Process => {
            output::info("No .env file found, using system environment variables");
        }
    }

    // 2. Resolve settings: file, then environment, then flags
    let mut config = Config::load(&cli.config)?;
    config.apply_env(&env)?;
    cli.apply(&mut config);
    config.validate()?;

    let statuses: Vec<(bool, String)> = config
        .required_env_vars()
        .into_iter()
        .map(|key| (env.get(key).is_some(), key.to_string()))
        .collect();

    // 3. Build the session; missing keys are reported all at once
    let chat = match RagChat::from_config(&config, &env) {
        Ok(chat) => chat,
        Err(ConfigError::MissingEnvVars(missing)) => {
            output::environment_error(&missing);
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => return Err(anyhow::Error::new(e).context("failed to initialize RAG chat")),
    };

    // 4. One-shot or interactive
    if let Some(question) = &cli.question {
        let Input::Question(question) = Input::one_shot(question) else {
            anyhow::bail!("--question must not be blank");
        };
        let reporter = TerminalReporter::new();
        let answer = chat.chat(&question, &reporter).await;
        reporter.finish();
        output::answer(&answer);
        return Ok(ExitCode::SUCCESS);
    }

    output::banner(config.source);
    output::section_header("Environment");
    output::status_box(&statuses);
    output::success("RAG Chat initialized successfully!");
    output::exit_instructions();

    let mut lines = stdin_lines().context("failed to start the input reader")?;
    let end = run_interactive(&chat, &mut lines, ctrl_c).await;
    debug!(?end, "Interactive session ended");

    output::goodbye();
    Ok(ExitCode::SUCCESS)
}

/// Resolves on Ctrl+C. Never resolves when the handler cannot be installed.
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
}

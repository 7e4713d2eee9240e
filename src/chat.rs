/// The chat orchestrator.
///
/// [`RagChat`] runs one full question cycle: optional retrieval, context
/// formatting, answer generation. Progress is emitted as [`ChatEvent`]s to a
/// caller-supplied [`Reporter`]; the presentation layer decides what to show.
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::config::{Config, ConfigError, Env};
use crate::document::{NO_KNOWLEDGE_BASE_CONTEXT, format_context};
use crate::http::HttpClient;
use crate::llm::AnswerGenerator;
use crate::llm::openai::OpenAiClient;
use crate::source::{RetrievalSource, Source};

/// Observable progress of a chat cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    /// Retrieval started for this question.
    Retrieving { question: String },
    /// Retrieval finished with this many documents (zero is not an error).
    DocumentsFound(usize),
    /// The completion request is about to be sent.
    Generating,
    /// A recovered failure.
    Error(String),
}

/// Receives [`ChatEvent`]s. Return values are never consulted.
pub trait Reporter: Send + Sync {
    fn report(&self, event: ChatEvent);
}

impl<F> Reporter for F
where
    F: Fn(ChatEvent) + Send + Sync,
{
    fn report(&self, event: ChatEvent) {
        self(event)
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl Reporter for Silent {
    fn report(&self, _event: ChatEvent) {}
}

/// Retrieval-augmented chat session.
///
/// `source` is `None` when no knowledge base is configured; answers then rely
/// on the model's general knowledge. No state is carried between questions.
pub struct RagChat<S = Source> {
    source: Option<S>,
    generator: AnswerGenerator,
    num_results: usize,
}

impl RagChat<Source> {
    /// Build a session from settings and environment.
    ///
    /// Every missing key (LLM credential and source keys) is reported in one
    /// [`ConfigError::MissingEnvVars`] before anything else is constructed.
    pub fn from_config(config: &Config, env: &Env) -> Result<Self, ConfigError> {
        config.check_env(env)?;

        let http = HttpClient::new(
            Duration::from_secs(config.request_timeout_secs),
            config.allow_insecure_tls,
        )
        .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        let source = Source::from_env(config.source, env, &http)?;
        let client = OpenAiClient::from_env(env, http, &config.openai_base_url)?;
        let generator = AnswerGenerator::new(Arc::new(client), config.model.clone());

        info!(
            source = %config.source,
            model = %config.model,
            "RAG chat initialized"
        );
        Ok(Self::new(
            source.into_knowledge_base(),
            generator,
            config.num_results,
        ))
    }
}

impl<S: RetrievalSource> RagChat<S> {
    pub fn new(source: Option<S>, generator: AnswerGenerator, num_results: usize) -> Self {
        Self {
            source,
            generator,
            num_results,
        }
    }

    #[must_use]
    pub fn has_knowledge_base(&self) -> bool {
        self.source.is_some()
    }

    /// Retrieve (when a source is configured) and format the context block.
    pub async fn build_context(
        &self,
        question: &str,
        num_results: usize,
        reporter: &dyn Reporter,
    ) -> String {
        let Some(source) = &self.source else {
            return NO_KNOWLEDGE_BASE_CONTEXT.to_string();
        };

        reporter.report(ChatEvent::Retrieving {
            question: question.to_string(),
        });
        let documents = source
            .retrieve_documents(question, num_results, reporter)
            .await;
        reporter.report(ChatEvent::DocumentsFound(documents.len()));

        format_context(&documents)
    }

    /// Answer `question` using the session's default result count.
    pub async fn chat(&self, question: &str, reporter: &dyn Reporter) -> String {
        self.chat_with_limit(question, self.num_results, reporter)
            .await
    }

    /// Answer `question`, retrieving at most `num_results` documents.
    ///
    /// Never fails: retrieval errors degrade to an empty context and
    /// generation errors come back as an error-describing answer.
    pub async fn chat_with_limit(
        &self,
        question: &str,
        num_results: usize,
        reporter: &dyn Reporter,
    ) -> String {
        let context = self.build_context(question, num_results, reporter).await;

        reporter.report(ChatEvent::Generating);
        self.generator.generate(question, &context).await
    }
}

/// Answer generation through a language-model completion endpoint.
///
/// [`AnswerGenerator`] is the fail-soft boundary: completion errors become an
/// answer-shaped string instead of propagating to the chat loop.
pub mod openai;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::http::HttpError;

/// Model used unless the settings file names another.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

pub const SYSTEM_PROMPT: &str = "You are a helpful assistant that answers questions based on the provided context. \
If the context doesn't contain relevant information, say so.";

/// Prefix of the answer returned when generation fails.
pub const ERROR_PREFIX: &str = "Error generating response:";

/// Errors reaching the completion endpoint.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("completion response contained no message content")]
    EmptyResponse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A chat-completion backend.
///
/// Implementations must be `Send + Sync` so one client can sit behind `Arc`.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Complete the conversation and return the generated text.
    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<String, GenerationError>;
}

/// Render the user turn for `question` and `context`.
#[must_use]
pub fn user_prompt(question: &str, context: &str) -> String {
    format!(
        "Context:\n{context}\n\nQuestion: {question}\n\nPlease provide a comprehensive answer based on the context above."
    )
}

/// The two turns sent for every question.
#[must_use]
pub fn build_messages(question: &str, context: &str) -> [ChatMessage; 2] {
    [
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user(user_prompt(question, context)),
    ]
}

#[derive(Clone)]
pub struct AnswerGenerator {
    client: Arc<dyn CompletionClient>,
    model: String,
}

impl AnswerGenerator {
    pub fn new(client: Arc<dyn CompletionClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    /// Generate an answer. Never fails: errors come back as
    /// `Error generating response: <cause>`.
    pub async fn generate(&self, question: &str, context: &str) -> String {
        let messages = build_messages(question, context);
        debug!(model = %self.model, "Requesting completion");
        match self.client.complete(&self.model, &messages).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!("Answer generation failed: {e}");
                format!("{ERROR_PREFIX} {e}")
            }
        }
    }
}

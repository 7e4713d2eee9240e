/// OpenAI-compatible chat completions client.
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ChatMessage, CompletionClient, GenerationError};
use crate::config::{ConfigError, Env};
use crate::http::HttpClient;

pub const API_KEY_VAR: &str = "OPENAI_API_KEY";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

pub struct OpenAiClient {
    http: HttpClient,
    url: String,
    headers: HeaderMap,
}

impl OpenAiClient {
    pub fn new(http: HttpClient, base_url: &str, api_key: &str) -> Result<Self, ConfigError> {
        let mut auth =
            HeaderValue::from_str(&format!("Bearer {}", api_key.trim())).map_err(|e| {
                ConfigError::InvalidValue {
                    key: API_KEY_VAR.to_string(),
                    message: e.to_string(),
                }
            })?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        Ok(Self {
            http,
            url: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            headers,
        })
    }

    /// Build the client from `OPENAI_API_KEY`.
    pub fn from_env(env: &Env, http: HttpClient, base_url: &str) -> Result<Self, ConfigError> {
        let [api_key] = env.require([API_KEY_VAR])?;
        Self::new(http, base_url, &api_key)
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<String, GenerationError> {
        let request = ChatCompletionRequest { model, messages };
        let response: ChatCompletionResponse = self
            .http
            .post_json(&self.url, self.headers.clone(), &request)
            .await?;

        if let Some(usage) = &response.usage {
            debug!(
                "Completion usage - prompt: {} tokens, completion: {} tokens, total: {} tokens",
                usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
            );
        }

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(GenerationError::EmptyResponse)
    }
}

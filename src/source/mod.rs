/// Retrieval sources: the pluggable backends that supply [`Document`]s.
///
/// A source is picked once at startup from [`SourceKind`] and held for the
/// whole session. The set of backends is closed, so [`Source`] dispatches
/// over an enum rather than a trait object.
pub mod none;
pub mod pinecone;
pub mod vectorize;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::chat::{ChatEvent, Reporter};
use crate::config::{ConfigError, Env};
use crate::document::Document;
use crate::http::{HttpClient, HttpError};

pub use none::NoSource;
pub use pinecone::PineconeSource;
pub use vectorize::VectorizeSource;

/// Errors reaching a remote retrieval endpoint. Never escapes
/// [`RetrievalSource::retrieve_documents`].
#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Capability shared by every retrieval backend.
#[async_trait]
pub trait RetrievalSource: Send + Sync {
    /// Short human-readable backend name.
    fn name(&self) -> &'static str;

    /// Environment keys this backend needs.
    fn required_env_vars(&self) -> &'static [&'static str];

    /// Query the backend, surfacing any failure.
    async fn try_retrieve(
        &self,
        question: &str,
        num_results: usize,
    ) -> Result<Vec<Document>, RetrievalError>;

    /// Query the backend; failures are logged, reported once through
    /// `reporter` and turned into an empty result.
    async fn retrieve_documents(
        &self,
        question: &str,
        num_results: usize,
        reporter: &dyn Reporter,
    ) -> Vec<Document> {
        match self.try_retrieve(question, num_results).await {
            Ok(documents) => documents,
            Err(e) => {
                warn!(source = self.name(), "Document retrieval failed: {e}");
                reporter.report(ChatEvent::Error(format!("Error retrieving documents: {e}")));
                Vec::new()
            }
        }
    }
}

// ── SourceKind ───────────────────────────────────────────────────────

/// Which backend to construct.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// No knowledge base; answers rely on the model's general knowledge.
    None,
    /// Vectorize retrieval pipeline.
    #[default]
    Vectorize,
    /// Pinecone index (placeholder documents without an index host).
    Pinecone,
}

impl SourceKind {
    /// Environment keys the backend needs, available before construction.
    #[must_use]
    pub fn required_env_vars(self) -> &'static [&'static str] {
        match self {
            Self::None => &[],
            Self::Vectorize => &VectorizeSource::REQUIRED_ENV_VARS,
            Self::Pinecone => &PineconeSource::REQUIRED_ENV_VARS,
        }
    }

    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::None => "no knowledge base",
            Self::Vectorize => "Vectorize",
            Self::Pinecone => "Pinecone",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::Vectorize => "vectorize",
            Self::Pinecone => "pinecone",
        })
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "vectorize" => Ok(Self::Vectorize),
            "pinecone" => Ok(Self::Pinecone),
            other => Err(format!(
                "unknown source {other:?} (expected none, vectorize or pinecone)"
            )),
        }
    }
}

// ── Source ───────────────────────────────────────────────────────────

/// The backend selected for this session.
pub enum Source {
    None(NoSource),
    Vectorize(VectorizeSource),
    Pinecone(PineconeSource),
}

impl Source {
    /// Construct the backend for `kind`, failing fast on missing configuration.
    pub fn from_env(kind: SourceKind, env: &Env, http: &HttpClient) -> Result<Self, ConfigError> {
        Ok(match kind {
            SourceKind::None => Self::None(NoSource),
            SourceKind::Vectorize => Self::Vectorize(VectorizeSource::from_env(env, http.clone())?),
            SourceKind::Pinecone => Self::Pinecone(PineconeSource::from_env(env, http.clone())?),
        })
    }

    #[must_use]
    pub fn kind(&self) -> SourceKind {
        match self {
            Self::None(_) => SourceKind::None,
            Self::Vectorize(_) => SourceKind::Vectorize,
            Self::Pinecone(_) => SourceKind::Pinecone,
        }
    }

    /// `None` when this source has no knowledge base behind it.
    #[must_use]
    pub fn into_knowledge_base(self) -> Option<Self> {
        match self {
            Self::None(_) => None,
            other => Some(other),
        }
    }
}

#[async_trait]
impl RetrievalSource for Source {
    fn name(&self) -> &'static str {
        match self {
            Self::None(s) => s.name(),
            Self::Vectorize(s) => s.name(),
            Self::Pinecone(s) => s.name(),
        }
    }

    fn required_env_vars(&self) -> &'static [&'static str] {
        self.kind().required_env_vars()
    }

    async fn try_retrieve(
        &self,
        question: &str,
        num_results: usize,
    ) -> Result<Vec<Document>, RetrievalError> {
        match self {
            Self::None(s) => s.try_retrieve(question, num_results).await,
            Self::Vectorize(s) => s.try_retrieve(question, num_results).await,
            Self::Pinecone(s) => s.try_retrieve(question, num_results).await,
        }
    }
}

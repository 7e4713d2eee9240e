/// Pinecone index retrieval.
///
/// With `PINECONE_INDEX_HOST` set, queries the index's integrated-inference
/// search endpoint. Without it the source runs in mock mode and synthesizes
/// placeholder documents, which is enough to exercise the whole chat flow.
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::{RetrievalError, RetrievalSource};
use crate::config::{ConfigError, Env};
use crate::document::Document;
use crate::http::HttpClient;

pub const API_KEY_VAR: &str = "PINECONE_API_KEY";
pub const ENVIRONMENT_VAR: &str = "PINECONE_ENVIRONMENT";
pub const INDEX_NAME_VAR: &str = "PINECONE_INDEX_NAME";
/// Optional; without it the source runs in mock mode.
pub const INDEX_HOST_VAR: &str = "PINECONE_INDEX_HOST";
pub const NAMESPACE_VAR: &str = "PINECONE_NAMESPACE";

pub const DEFAULT_NAMESPACE: &str = "__default__";
const API_VERSION: &str = "2025-04";
const MOCK_DOCUMENT_LIMIT: usize = 3;

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: SearchQuery<'a>,
}

#[derive(Serialize)]
struct SearchQuery<'a> {
    inputs: SearchInputs<'a>,
    top_k: usize,
}

#[derive(Serialize)]
struct SearchInputs<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    result: Option<SearchResult>,
}

#[derive(Deserialize)]
struct SearchResult {
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Deserialize)]
struct Hit {
    #[serde(rename = "_id", default)]
    id: Option<String>,
    #[serde(rename = "_score", default)]
    score: Option<f64>,
    #[serde(default)]
    fields: Map<String, Value>,
}

impl Hit {
    fn into_document(self) -> Document {
        let mut record = self.fields;
        if let Some(id) = self.id {
            record.entry("_id").or_insert(Value::String(id));
        }
        if let Some(score) = self.score.and_then(serde_json::Number::from_f64) {
            record.insert("_score".to_string(), Value::Number(score));
        }
        Document::from_record(&record)
    }
}

enum Mode {
    Hosted {
        http: HttpClient,
        url: String,
        headers: HeaderMap,
    },
    Mock,
}

pub struct PineconeSource {
    index_name: String,
    environment: String,
    mode: Mode,
}

impl PineconeSource {
    pub const REQUIRED_ENV_VARS: [&'static str; 3] = [API_KEY_VAR, ENVIRONMENT_VAR, INDEX_NAME_VAR];

    pub fn from_env(env: &Env, http: HttpClient) -> Result<Self, ConfigError> {
        let [api_key, environment, index_name] = env.require(Self::REQUIRED_ENV_VARS)?;

        let mode = match env.get(INDEX_HOST_VAR) {
            Some(host) => {
                let namespace = env.get(NAMESPACE_VAR).unwrap_or(DEFAULT_NAMESPACE);
                let mut key = HeaderValue::from_str(api_key.trim()).map_err(|e| {
                    ConfigError::InvalidValue {
                        key: API_KEY_VAR.to_string(),
                        message: e.to_string(),
                    }
                })?;
                key.set_sensitive(true);

                let mut headers = HeaderMap::new();
                headers.insert(HeaderName::from_static("api-key"), key);
                headers.insert(
                    HeaderName::from_static("x-pinecone-api-version"),
                    HeaderValue::from_static(API_VERSION),
                );

                info!("Pinecone source initialized with index: {index_name}");
                Mode::Hosted {
                    http,
                    url: search_url(host, namespace),
                    headers,
                }
            }
            None => {
                warn!(
                    "{INDEX_HOST_VAR} not set; Pinecone source for index {index_name} returns placeholder documents"
                );
                Mode::Mock
            }
        };

        Ok(Self {
            index_name,
            environment,
            mode,
        })
    }

    #[must_use]
    pub fn is_mock(&self) -> bool {
        matches!(self.mode, Mode::Mock)
    }

    fn mock_documents(&self, question: &str, num_results: usize) -> Vec<Document> {
        (1..=num_results.min(MOCK_DOCUMENT_LIMIT))
            .map(|i| {
                Document::default()
                    .with_text(format!(
                        "This is a mock document {i} retrieved from Pinecone for query: '{question}'. \
                         In a real implementation, this would contain actual content from your knowledge base."
                    ))
                    .with_source(format!("mock_source_{i}.txt"))
                    .with_relevancy(mock_relevancy(i))
                    .with_metadata("source", "pinecone_mock")
                    .with_metadata("index", self.index_name.clone())
                    .with_metadata("environment", self.environment.clone())
            })
            .collect()
    }
}

/// Score of the `rank`-th mock document (1-based): 0.95, 0.85, 0.75.
///
/// Computed in whole hundredths so the values print exactly.
fn mock_relevancy(rank: usize) -> f64 {
    let hundredths = 95_usize.saturating_sub(10 * rank.saturating_sub(1));
    hundredths as f64 / 100.0
}

fn search_url(host: &str, namespace: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    let base = if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{host}")
    };
    format!("{base}/records/namespaces/{namespace}/search")
}

#[async_trait]
impl RetrievalSource for PineconeSource {
    fn name(&self) -> &'static str {
        "pinecone"
    }

    fn required_env_vars(&self) -> &'static [&'static str] {
        &Self::REQUIRED_ENV_VARS
    }

    async fn try_retrieve(
        &self,
        question: &str,
        num_results: usize,
    ) -> Result<Vec<Document>, RetrievalError> {
        let (http, url, headers) = match &self.mode {
            Mode::Mock => return Ok(self.mock_documents(question, num_results)),
            Mode::Hosted { http, url, headers } => (http, url, headers),
        };

        let request = SearchRequest {
            query: SearchQuery {
                inputs: SearchInputs { text: question },
                top_k: num_results,
            },
        };
        let response: SearchResponse = http.post_json(url, headers.clone(), &request).await?;

        let documents: Vec<Document> = response
            .result
            .map(|r| r.hits)
            .unwrap_or_default()
            .into_iter()
            .map(Hit::into_document)
            .collect();
        debug!("Pinecone returned {} documents", documents.len());
        Ok(documents)
    }
}

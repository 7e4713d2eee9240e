/// Vectorize pipeline retrieval.
///
/// Calls the hosted `retrieval` endpoint of a single pipeline.
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use super::{RetrievalError, RetrievalSource};
use crate::config::{ConfigError, Env};
use crate::document::Document;
use crate::http::HttpClient;

pub const ACCESS_TOKEN_VAR: &str = "VECTORIZE_PIPELINE_ACCESS_TOKEN";
pub const ORGANIZATION_ID_VAR: &str = "VECTORIZE_ORGANIZATION_ID";
pub const PIPELINE_ID_VAR: &str = "VECTORIZE_PIPELINE_ID";
/// Optional override of the API host.
pub const API_HOST_VAR: &str = "VECTORIZE_API_HOST";

pub const DEFAULT_API_HOST: &str = "https://api.vectorize.io/v1";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RetrieveRequest<'a> {
    question: &'a str,
    num_results: usize,
}

#[derive(Deserialize)]
struct RetrieveResponse {
    #[serde(default)]
    documents: Option<Vec<Value>>,
}

pub struct VectorizeSource {
    http: HttpClient,
    url: String,
    headers: HeaderMap,
}

impl VectorizeSource {
    pub const REQUIRED_ENV_VARS: [&'static str; 3] =
        [ACCESS_TOKEN_VAR, ORGANIZATION_ID_VAR, PIPELINE_ID_VAR];

    pub fn from_env(env: &Env, http: HttpClient) -> Result<Self, ConfigError> {
        let [token, organization_id, pipeline_id] = env.require(Self::REQUIRED_ENV_VARS)?;
        let host = env.get(API_HOST_VAR).unwrap_or(DEFAULT_API_HOST);

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token.trim())).map_err(|e| {
            ConfigError::InvalidValue {
                key: ACCESS_TOKEN_VAR.to_string(),
                message: e.to_string(),
            }
        })?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let url = retrieval_url(host, &organization_id, &pipeline_id);
        info!("Vectorize source initialized (pipeline {pipeline_id})");

        Ok(Self { http, url, headers })
    }
}

fn retrieval_url(host: &str, organization_id: &str, pipeline_id: &str) -> String {
    format!(
        "{}/org/{}/pipelines/{}/retrieval",
        host.trim_end_matches('/'),
        organization_id.trim(),
        pipeline_id.trim()
    )
}

#[async_trait]
impl RetrievalSource for VectorizeSource {
    fn name(&self) -> &'static str {
        "vectorize"
    }

    fn required_env_vars(&self) -> &'static [&'static str] {
        &Self::REQUIRED_ENV_VARS
    }

    async fn try_retrieve(
        &self,
        question: &str,
        num_results: usize,
    ) -> Result<Vec<Document>, RetrievalError> {
        let request = RetrieveRequest {
            question,
            num_results,
        };
        let response: RetrieveResponse = self
            .http
            .post_json(&self.url, self.headers.clone(), &request)
            .await?;

        let documents: Vec<Document> = response
            .documents
            .unwrap_or_default()
            .iter()
            .map(Document::from_value)
            .collect();
        debug!("Vectorize returned {} documents", documents.len());
        Ok(documents)
    }
}

/// Shared HTTP client for the retrieval and completion endpoints.
///
/// When built with `allow_insecure_tls`, a request that fails certificate
/// validation is retried once on a second client with verification turned
/// off. Every such retry is logged at `warn` level under the `ragchat::tls`
/// target.
use std::error::Error as StdError;
use std::time::Duration;

use reqwest::Client;
use reqwest::header::HeaderMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

/// Longest response body excerpt kept in a status error.
const MAX_ERROR_BODY: usize = 512;

#[derive(Error, Debug)]
pub enum HttpError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response body: {0}")]
    Decode(String),
}

#[derive(Clone, Debug)]
pub struct HttpClient {
    strict: Client,
    relaxed: Option<Client>,
}

impl HttpClient {
    pub fn new(timeout: Duration, allow_insecure_tls: bool) -> Result<Self, reqwest::Error> {
        let strict = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("ragchat/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let relaxed = if allow_insecure_tls {
            warn!(
                target: "ragchat::tls",
                "Insecure TLS fallback enabled: requests failing certificate validation will be retried without verification"
            );
            Some(
                Client::builder()
                    .timeout(timeout)
                    .user_agent(concat!("ragchat/", env!("CARGO_PKG_VERSION")))
                    .danger_accept_invalid_certs(true)
                    .build()?,
            )
        } else {
            None
        };

        Ok(Self { strict, relaxed })
    }

    #[must_use]
    pub fn allows_insecure_tls(&self) -> bool {
        self.relaxed.is_some()
    }

    /// POST `body` as JSON and decode a JSON response.
    pub async fn post_json<B, T>(
        &self,
        url: &str,
        headers: HeaderMap,
        body: &B,
    ) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!("POST {url}");
        let response = match send(&self.strict, url, &headers, body).await {
            Ok(response) => response,
            Err(e) if is_certificate_error(&e) => {
                let Some(relaxed) = &self.relaxed else {
                    return Err(e.into());
                };
                warn!(
                    target: "ragchat::tls",
                    "TLS certificate validation failed for {url} ({e}); retrying with certificate verification DISABLED"
                );
                send(relaxed, url, &headers, body).await?
            }
            Err(e) => return Err(e.into()),
        };

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            truncate_on_char_boundary(&mut body, MAX_ERROR_BODY);
            return Err(HttpError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| HttpError::Decode(e.to_string()))
    }
}

async fn send<B: Serialize + ?Sized>(
    client: &Client,
    url: &str,
    headers: &HeaderMap,
    body: &B,
) -> Result<reqwest::Response, reqwest::Error> {
    client
        .post(url)
        .headers(headers.clone())
        .json(body)
        .send()
        .await
}

/// Whether any error in the chain looks like a certificate validation failure.
pub fn is_certificate_error(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        let msg = e.to_string().to_ascii_lowercase();
        if msg.contains("certificate") || msg.contains("unknownissuer") {
            return true;
        }
        current = e.source();
    }
    false
}

fn truncate_on_char_boundary(s: &mut String, max: usize) {
    if s.len() <= max {
        return;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s.truncate(end);
}

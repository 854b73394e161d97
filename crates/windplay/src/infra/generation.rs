//! HTTP client for the Aeolus generation service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use thiserror::Error;

use crate::domain::model::GenerationTarget;
use crate::infra::config::Endpoint;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("failed to build HTTP client")]
    Client(#[source] reqwest::Error),
    #[error("request to {url} failed")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Something that turns a windfile into the artifact for a target.
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// `Ok(None)` means the service answered without a usable `result`.
    async fn generate(
        &self,
        target: GenerationTarget,
        windfile: &str,
    ) -> Result<Option<String>, GenerationError>;
}

/// reqwest-backed [`GenerationService`] bound to one endpoint for its whole lifetime.
#[derive(Debug, Clone)]
pub struct HttpGenerationClient {
    base_url: String,
    http: reqwest::Client,
}

impl HttpGenerationClient {
    pub fn new(endpoint: &Endpoint, timeout: Duration) -> Result<Self, GenerationError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(GenerationError::Client)?;
        Ok(Self {
            base_url: endpoint.base_url().trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn url_for(&self, target: GenerationTarget) -> String {
        format!("{}/generate/{}/yaml", self.base_url, target.as_str())
    }
}

#[async_trait]
impl GenerationService for HttpGenerationClient {
    async fn generate(
        &self,
        target: GenerationTarget,
        windfile: &str,
    ) -> Result<Option<String>, GenerationError> {
        let url = self.url_for(target);
        let transport = |source| GenerationError::Transport {
            url: url.clone(),
            source,
        };

        let response = self
            .http
            .post(&url)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/x-yaml")
            .body(windfile.to_owned())
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        let body = response.bytes().await.map_err(transport)?;
        if !status.is_success() {
            tracing::debug!(%status, url = %url, "generation service returned an error status");
        }
        Ok(parse_result(&body))
    }
}

/// Extract the `result` field from a service response body.
pub fn parse_result(body: &[u8]) -> Option<String> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return None;
    }
    match serde_json::from_slice::<serde_json::Value>(body) {
        Ok(value) => value
            .get("result")
            .and_then(serde_json::Value::as_str)
            .filter(|result| !result.is_empty())
            .map(str::to_owned),
        Err(err) => {
            tracing::debug!(error = %err, "generation response is not JSON");
            None
        }
    }
}

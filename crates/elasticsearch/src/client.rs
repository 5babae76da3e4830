//! Bulk client - one HTTP call per bulk request

use std::time::Duration;

use contracts::ContractError;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, instrument};

use crate::request::BulkRequest;
use crate::response::BulkResponse;
use crate::WRITER_NAME;

/// Submits bulk requests.
///
/// Any error means nothing is known about the individual items; callers fail
/// every document of the request.
#[trait_variant::make(BulkClient: Send)]
pub trait LocalBulkClient {
    async fn bulk(&self, request: BulkRequest) -> Result<BulkResponse, ContractError>;
}

/// Connection settings
#[derive(Debug, Clone)]
pub struct ElasticsearchClientConfig {
    /// Base URL, e.g. `http://localhost:9200`
    pub url: String,
    /// Per-request timeout
    pub timeout: Duration,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for ElasticsearchClientConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9200".to_string(),
            timeout: Duration::from_secs(30),
            username: None,
            password: None,
        }
    }
}

/// `BulkClient` posting NDJSON to `{url}/_bulk`
#[derive(Debug, Clone)]
pub struct HttpBulkClient {
    client: reqwest::Client,
    config: ElasticsearchClientConfig,
}

impl HttpBulkClient {
    pub fn new(config: ElasticsearchClientConfig) -> Result<Self, ContractError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ContractError::transport_from(WRITER_NAME, e))?;

        Ok(Self { client, config })
    }

    pub fn bulk_url(&self) -> String {
        format!("{}/_bulk", self.config.url.trim_end_matches('/'))
    }
}

impl BulkClient for HttpBulkClient {
    #[instrument(
        name = "es_bulk_request",
        skip_all,
        fields(url = %self.config.url, items = request.len())
    )]
    async fn bulk(&self, request: BulkRequest) -> Result<BulkResponse, ContractError> {
        let mut builder = self
            .client
            .post(self.bulk_url())
            .header(CONTENT_TYPE, "application/x-ndjson")
            .body(request.into_body());
        if let Some(username) = &self.config.username {
            builder = builder.basic_auth(username, self.config.password.as_ref());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ContractError::transport_from(WRITER_NAME, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ContractError::transport(
                WRITER_NAME,
                format!("bulk request returned {status}: {body}"),
            ));
        }

        let parsed: BulkResponse = response
            .json()
            .await
            .map_err(|e| ContractError::transport_from(WRITER_NAME, e))?;
        debug!(
            took_ms = parsed.took,
            errors = parsed.errors,
            items = parsed.items.len(),
            "Bulk response received"
        );
        Ok(parsed)
    }
}

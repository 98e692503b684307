//! Search Service Client
//!
//! HTTP client that submits serialized queries to the search service.

use crate::config::ClientConfig;
use crate::query::{Query, QueryError};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value as Json;
use thiserror::Error;
use uuid::Uuid;

/// Header carrying the per-request correlation id
const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Search service REST client
pub struct SearchClient {
    client: Client,
    config: ClientConfig,
}

/// Records returned for one query
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub records: Vec<Json>,
}

impl SearchResponse {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl SearchClient {
    /// Create a new client with the given configuration
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self { client, config })
    }

    /// Get the current configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.url.trim_end_matches('/'), path)
    }

    /// Check if the search service is available
    pub async fn health_check(&self) -> Result<(), ClientError> {
        let url = self.endpoint("/health");

        let response = self.client.get(&url).send().await.map_err(classify)?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(ClientError::Unavailable)
        }
    }

    /// Submit a query and collect the matching records
    ///
    /// The query is serialized before anything is sent, so a malformed query
    /// fails with [`ClientError::Query`] without touching the network.
    pub async fn search(&self, query: &Query) -> Result<SearchResponse, ClientError> {
        let document = query.to_json()?;
        let url = self.endpoint("/v1/search");
        let request_id = Uuid::new_v4();

        tracing::debug!(%request_id, %url, "Submitting search");

        let response = self
            .client
            .post(&url)
            .header(REQUEST_ID_HEADER, request_id.to_string())
            .json(&document)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::warn!(%request_id, status = status.as_u16(), "Search rejected");
            return Err(ClientError::Api {
                status: status.as_u16(),
                message: text,
            });
        }

        let body = response.text().await.map_err(classify)?;
        let records = parse_records(&body)?;
        tracing::debug!(%request_id, records = records.len(), "Search complete");

        Ok(SearchResponse { records })
    }
}

fn classify(e: reqwest::Error) -> ClientError {
    if e.is_timeout() {
        ClientError::Timeout
    } else if e.is_connect() {
        ClientError::Unavailable
    } else {
        ClientError::Request(e)
    }
}

/// Decode a response body
///
/// Accepts a `{"records": [...]}` envelope, a bare JSON array, a single
/// object, or line-delimited JSON with one record per line. Every record
/// must be a JSON object.
pub fn parse_records(body: &str) -> Result<Vec<Json>, ClientError> {
    let body = body.trim();
    if body.is_empty() {
        return Ok(Vec::new());
    }

    match serde_json::from_str::<Json>(body) {
        Ok(Json::Array(records)) => ensure_objects(records),
        Ok(Json::Object(map)) if map.contains_key("records") => {
            let response: SearchResponse = serde_json::from_value(Json::Object(map))
                .map_err(|e| ClientError::Decode(e.to_string()))?;
            ensure_objects(response.records)
        }
        Ok(record @ Json::Object(_)) => Ok(vec![record]),
        Ok(other) => Err(not_a_record(&other)),
        Err(_) => body
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(n, line)| match serde_json::from_str::<Json>(line) {
                Ok(record @ Json::Object(_)) => Ok(record),
                Ok(other) => Err(ClientError::Decode(format!(
                    "line {}: expected a record object, found {}",
                    n + 1,
                    other
                ))),
                Err(e) => Err(ClientError::Decode(format!("line {}: {}", n + 1, e))),
            })
            .collect(),
    }
}

fn ensure_objects(records: Vec<Json>) -> Result<Vec<Json>, ClientError> {
    match records.iter().find(|r| !r.is_object()) {
        Some(other) => Err(not_a_record(other)),
        None => Ok(records),
    }
}

fn not_a_record(value: &Json) -> ClientError {
    ClientError::Decode(format!("expected a record object, found {}", value))
}

// ============================================================================
// Errors
// ============================================================================

/// Errors that can occur when communicating with the search service
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Search service unavailable")]
    Unavailable,

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Request timeout")]
    Timeout,

    #[error("Invalid query: {0}")]
    Query(#[from] QueryError),

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

//! Search backend contract and the Elasticsearch HTTP implementation

use crate::config::BackendConfig;
use crate::search::dsl::SearchBody;
use crate::search::error::{SearchError, SearchResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::{debug, warn};

/// Longest backend error body carried into an error message
const MAX_ERROR_BODY: usize = 512;

/// External search engine: one request in, hits and buckets out
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Execute one search round trip
    async fn search(&self, body: &SearchBody) -> SearchResult<RawSearchResponse>;

    /// Short backend name for logs
    fn name(&self) -> &str;
}

/// Raw backend response, as much of it as projection needs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSearchResponse {
    #[serde(default)]
    pub took: Option<u64>,

    #[serde(default)]
    pub hits: RawHits,

    #[serde(default)]
    pub aggregations: Option<BTreeMap<String, RawAggregation>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawHits {
    #[serde(default)]
    pub hits: Vec<RawHit>,
}

/// One ranked hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawHit {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,

    #[serde(rename = "_score", default)]
    pub score: Option<f64>,

    #[serde(rename = "_source", default)]
    pub source: Value,

    #[serde(default)]
    pub highlight: Option<HashMap<String, Vec<String>>>,
}

/// Aggregation result; only bucketed aggregations are projected
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawAggregation {
    #[serde(default)]
    pub buckets: Option<Vec<RawBucket>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBucket {
    pub key: Value,

    #[serde(default)]
    pub key_as_string: Option<String>,

    pub doc_count: u64,
}

impl RawBucket {
    /// Bucket key as text, whatever JSON type the backend used
    pub fn key_text(&self) -> String {
        if let Some(key) = &self.key_as_string {
            return key.clone();
        }
        match &self.key {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Elasticsearch `_search` endpoint over HTTP
#[derive(Clone)]
pub struct ElasticsearchBackend {
    client: Client,
    base_url: String,
    index: String,
    username: Option<String>,
    password: Option<String>,
    timeout_secs: u64,
}

impl ElasticsearchBackend {
    /// Create a backend client from configuration
    pub fn new(config: &BackendConfig) -> SearchResult<Self> {
        if config.url.trim().is_empty() {
            return Err(SearchError::InvalidConfiguration(
                "backend url is empty".to_string(),
            ));
        }
        if config.index.trim().is_empty() {
            return Err(SearchError::InvalidConfiguration(
                "backend index is empty".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                SearchError::InvalidConfiguration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            index: config.index.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
            timeout_secs: config.timeout_secs,
        })
    }

    fn search_url(&self) -> String {
        format!("{}/{}/_search", self.base_url, self.index)
    }
}

#[async_trait]
impl SearchBackend for ElasticsearchBackend {
    async fn search(&self, body: &SearchBody) -> SearchResult<RawSearchResponse> {
        let url = self.search_url();
        let payload = body.to_dsl();
        debug!(url = %url, body = %payload, "Sending search request");

        let mut request = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&payload);
        if let Some(username) = &self.username {
            request = request.basic_auth(username, self.password.as_ref());
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                SearchError::Timeout(format!(
                    "no response from {} within {} seconds",
                    url, self.timeout_secs
                ))
            } else {
                SearchError::from(e)
            }
        })?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            warn!(status = status.as_u16(), index = %self.index, "Search backend rejected request");
            let mut message = if text.is_empty() {
                "No response body".to_string()
            } else {
                text
            };
            if message.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !message.is_char_boundary(cut) {
                    cut -= 1;
                }
                message.truncate(cut);
            }
            return Err(SearchError::Backend {
                status: status.as_u16(),
                message,
            });
        }

        Ok(serde_json::from_str(&text)?)
    }

    fn name(&self) -> &str {
        "elasticsearch"
    }
}

//! Search execution and result projection

use crate::search::backend::{RawSearchResponse, SearchBackend};
use crate::search::builder::QueryBuilder;
use crate::search::catalog::FieldCatalog;
use crate::search::config::SearchSettings;
use crate::search::dsl::{AggregationDirective, HighlightDirective, SearchBody};
use crate::search::error::SearchResult;
use crate::search::query::SearchRequest;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info};

/// Document count of one facet bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetCount {
    pub key: String,
    pub count: u64,
}

/// Caller-facing search result
///
/// `error` is set when the backend round trip failed; `records` and
/// `aggregations` are empty in that case.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseData {
    /// Stored documents in relevance order
    pub records: Vec<Value>,

    /// Per-record highlight fragments, aligned with `records`
    pub highlights: Vec<BTreeMap<String, Vec<String>>>,

    /// Facet name to buckets, in backend order
    pub aggregations: BTreeMap<String, Vec<FacetCount>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Wall time of the backend round trip
    #[serde(default)]
    pub search_time_ms: u64,
}

impl ResponseData {
    /// Response for a failed round trip
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Runs searches against a backend
pub struct SearchExecutor {
    builder: QueryBuilder,
    backend: Arc<dyn SearchBackend>,
    highlight: HighlightDirective,
    aggregations: AggregationDirective,
    max_results: usize,
}

impl SearchExecutor {
    /// Create an executor; directives are derived once from the catalog
    pub fn new(
        catalog: Arc<FieldCatalog>,
        settings: &SearchSettings,
        backend: Arc<dyn SearchBackend>,
    ) -> Self {
        Self {
            highlight: HighlightDirective::from_catalog(&catalog, settings),
            aggregations: AggregationDirective::from_catalog(&catalog, settings),
            builder: QueryBuilder::with_settings(catalog, settings),
            backend,
            max_results: settings.max_results,
        }
    }

    pub fn catalog(&self) -> &FieldCatalog {
        self.builder.catalog()
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Assemble the full backend request for `request`
    pub fn prepare(&self, request: &SearchRequest) -> SearchResult<SearchBody> {
        Ok(SearchBody {
            query: self.builder.assemble(request)?,
            highlight: self.highlight.clone(),
            aggregations: self.aggregations.clone(),
            size: self.max_results,
        })
    }

    /// Run one search.
    ///
    /// Only unknown or ill-typed field names fail the call. Backend failures
    /// are logged and reported through [`ResponseData::error`].
    pub async fn search(&self, request: &SearchRequest) -> SearchResult<ResponseData> {
        let body = self.prepare(request)?;

        info!(
            term_len = request.term.len(),
            match_type = %request.match_type,
            filters = request.active_filter_count(),
            date_filters = request.dates.len(),
            backend = self.backend.name(),
            "Starting global search"
        );

        let start_time = std::time::Instant::now();
        let outcome = self.backend.search(&body).await;
        let search_time_ms = start_time.elapsed().as_millis() as u64;

        match outcome {
            Ok(raw) => {
                let mut response = self.project(raw);
                response.search_time_ms = search_time_ms;
                info!(
                    hits = response.records.len(),
                    facets = response.aggregations.len(),
                    search_time_ms,
                    "Search completed"
                );
                Ok(response)
            }
            Err(e) => {
                error!(
                    backend = self.backend.name(),
                    error = %e,
                    search_time_ms,
                    "Search failed"
                );
                let mut response = ResponseData::failed(format!("Search failed: {}", e));
                response.search_time_ms = search_time_ms;
                Ok(response)
            }
        }
    }

    /// Map a raw backend response into the caller-facing shape
    pub fn project(&self, raw: RawSearchResponse) -> ResponseData {
        let mut records = Vec::new();
        let mut highlights = Vec::new();

        for hit in raw.hits.hits.into_iter().take(self.max_results) {
            let mut fragments = hit.highlight.unwrap_or_default();
            let aligned: BTreeMap<String, Vec<String>> = self
                .highlight
                .fields
                .iter()
                .map(|field| (field.clone(), fragments.remove(field).unwrap_or_default()))
                .collect();

            records.push(hit.source);
            highlights.push(aligned);
        }

        let mut raw_aggs = raw.aggregations.unwrap_or_default();
        let aggregations = self
            .aggregations
            .facet_names()
            .map(|name| {
                let buckets = raw_aggs
                    .remove(name)
                    .and_then(|agg| agg.buckets)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|bucket| FacetCount {
                        key: bucket.key_text(),
                        count: bucket.doc_count,
                    })
                    .collect();
                (name.to_string(), buckets)
            })
            .collect();

        ResponseData {
            records,
            highlights,
            aggregations,
            error: None,
            search_time_ms: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::backend::{RawAggregation, RawBucket, RawHit, RawHits};
    use crate::search::error::SearchError;
    use crate::search::memory::InMemoryBackend;
    use crate::search::query::AccessControl;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;

    struct FailingBackend;

    #[async_trait]
    impl SearchBackend for FailingBackend {
        async fn search(&self, _body: &SearchBody) -> SearchResult<RawSearchResponse> {
            Err(SearchError::Transport("connection refused".to_string()))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    fn executor(backend: Arc<dyn SearchBackend>) -> SearchExecutor {
        SearchExecutor::new(
            Arc::new(FieldCatalog::order_details()),
            &SearchSettings::default(),
            backend,
        )
    }

    #[tokio::test]
    async fn test_transport_failure_is_reported_not_raised() {
        let executor = executor(Arc::new(FailingBackend));
        let response = executor
            .search(&SearchRequest::new("ORD-1009"))
            .await
            .unwrap();

        assert!(response.is_error());
        assert!(response.error.unwrap().contains("connection refused"));
        assert!(response.records.is_empty());
        assert!(response.aggregations.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_field_fails_before_backend() {
        let executor = executor(Arc::new(FailingBackend));
        let request = SearchRequest::new("").with_filter("notAField", ["x"]);
        assert!(matches!(
            executor.search(&request).await,
            Err(SearchError::UnknownField(_))
        ));
    }

    #[tokio::test]
    async fn test_search_against_memory_backend() {
        let backend = InMemoryBackend::new(vec![
            json!({ "id": "1", "orderNumber": "ORD-1009", "workType": "INSTALL" }),
            json!({ "id": "2", "orderNumber": "ORD-2000", "workType": "REPAIR" }),
        ]);
        let executor = executor(Arc::new(backend));
        let request = SearchRequest::new("ORD-1009")
            .exact()
            .with_access(AccessControl::unrestricted());

        let response = executor.search(&request).await.unwrap();
        assert!(!response.is_error());
        assert_eq!(response.records.len(), 1);
        assert_eq!(response.records[0]["id"], "1");
        assert_eq!(response.highlights.len(), 1);
        assert_eq!(
            response.aggregations["workType"],
            vec![FacetCount {
                key: "INSTALL".to_string(),
                count: 1
            }]
        );
    }

    #[test]
    fn test_projection_aligns_highlights_and_keeps_bucket_order() {
        let executor = executor(Arc::new(InMemoryBackend::default()));
        let mut highlight = HashMap::new();
        highlight.insert("orderNumber".to_string(), vec!["ORD-1009".to_string()]);

        let mut aggs = BTreeMap::new();
        aggs.insert(
            "crStatus".to_string(),
            RawAggregation {
                buckets: Some(vec![
                    RawBucket {
                        key: json!("OPEN"),
                        key_as_string: None,
                        doc_count: 7,
                    },
                    RawBucket {
                        key: json!("CLOSED"),
                        key_as_string: None,
                        doc_count: 9,
                    },
                ]),
            },
        );
        aggs.insert("unrequested".to_string(), RawAggregation::default());

        let raw = RawSearchResponse {
            took: Some(1),
            hits: RawHits {
                hits: vec![
                    RawHit {
                        id: Some("1".into()),
                        score: Some(2.0),
                        source: json!({ "orderNumber": "ORD-1009" }),
                        highlight: Some(highlight),
                    },
                    RawHit {
                        id: Some("2".into()),
                        score: Some(1.0),
                        source: json!({ "orderNumber": "ORD-2000" }),
                        highlight: None,
                    },
                ],
            },
            aggregations: Some(aggs),
        };

        let response = executor.project(raw);
        assert_eq!(response.records.len(), 2);
        assert_eq!(response.highlights.len(), 2);
        assert_eq!(response.highlights[0]["orderNumber"], vec!["ORD-1009"]);
        assert!(response.highlights[0]["orderNumber.keyword"].is_empty());
        assert!(response.highlights[1].values().all(Vec::is_empty));
        assert_eq!(
            response.highlights[1].len(),
            executor.highlight.fields.len()
        );

        let buckets = &response.aggregations["crStatus"];
        assert_eq!(buckets[0].key, "OPEN");
        assert_eq!(buckets[1].count, 9);
        assert!(!response.aggregations.contains_key("unrequested"));
        assert!(response.aggregations["workType"].is_empty());
    }

    #[test]
    fn test_projection_caps_records() {
        let settings = crate::search::config::SearchSettingsBuilder::new()
            .max_results(1)
            .build();
        let executor = SearchExecutor::new(
            Arc::new(FieldCatalog::order_details()),
            &settings,
            Arc::new(InMemoryBackend::default()),
        );
        let hit = RawHit {
            id: None,
            score: None,
            source: json!({}),
            highlight: None,
        };
        let raw = RawSearchResponse {
            hits: RawHits {
                hits: vec![hit.clone(), hit],
            },
            ..Default::default()
        };
        assert_eq!(executor.project(raw).records.len(), 1);
    }
}

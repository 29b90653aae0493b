//! Dynamic search-query construction over the order-details index
//!
//! This module turns a caller's [`SearchRequest`] into a boolean query for an
//! Elasticsearch-compatible backend and projects the response back into a
//! [`ResponseData`]:
//!
//! - **Free text**: exact keyword matching or a fuzzy OR of term, phrase-prefix,
//!   wildcard and edit-distance clauses across every searchable field
//! - **Filters**: categorical value sets and inclusive date ranges
//! - **Ownership**: restrict results to one owner's records
//! - **Access control**: federal-flag exclusion and sensitivity-level gating
//! - **Highlighting & aggregations**: fragments per hit, bucket counts per facet
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │           SearchExecutor                         │
//! ├─────────────────────────────────────────────────┤
//! │  - search()        - project()                  │
//! └─────────────────────────────────────────────────┘
//!           │                          │
//!           ▼                          ▼
//! ┌──────────────────────┐  ┌──────────────────────┐
//! │     QueryBuilder      │  │    SearchBackend     │
//! ├──────────────────────┤  ├──────────────────────┤
//! │  - FieldCatalog       │  │  - Elasticsearch     │
//! │  - BooleanQuery tree  │  │  - InMemory          │
//! └──────────────────────┘  └──────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use global_search::search::{
//!     AccessControl, FieldCatalog, InMemoryBackend, SearchExecutor, SearchRequest,
//!     SearchSettings,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let executor = SearchExecutor::new(
//!         Arc::new(FieldCatalog::order_details()),
//!         &SearchSettings::default(),
//!         Arc::new(InMemoryBackend::from_file("orders.json")?),
//!     );
//!
//!     let request = SearchRequest::new("ORD-1009")
//!         .with_filter("crStatus", ["OPEN"])
//!         .with_access(AccessControl::default().with_sensitivity_levels(["1"]));
//!
//!     let response = executor.search(&request).await?;
//!     println!("Found {} orders", response.records.len());
//!
//!     Ok(())
//! }
//! ```

mod backend;
mod builder;
mod catalog;
mod config;
mod dsl;
mod error;
mod memory;
mod query;
mod service;
mod text;

pub use backend::{
    ElasticsearchBackend, RawAggregation, RawBucket, RawHit, RawHits, RawSearchResponse,
    SearchBackend,
};
pub use builder::QueryBuilder;
pub use catalog::{
    AccessFields, FieldCatalog, FieldDescriptor, FieldKind, KEYWORD_SUFFIX, NORMALIZED_SUFFIX,
};
pub use config::{SearchSettings, SearchSettingsBuilder};
pub use dsl::{
    clause_to_dsl, query_to_dsl, AggregationDirective, HighlightDirective, SearchBody,
    DATE_FORMAT,
};
pub use error::{SearchError, SearchResult};
pub use memory::InMemoryBackend;
pub use query::{
    AccessControl, BooleanQuery, Clause, DateRange, Fuzziness, MatchType, SearchRequest,
};
pub use service::{FacetCount, ResponseData, SearchExecutor};
pub use text::{escape_query_term, has_special_chars, normalize, split_levels};

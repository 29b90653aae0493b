//! Global search over order-detail indices
//!
//! Builds boolean queries from loosely structured search requests, runs them
//! against an Elasticsearch-compatible backend and projects hits, highlights
//! and facet counts into a caller-facing response.

pub mod api;
pub mod config;
pub mod error;
pub mod search;

pub use config::Config;
pub use error::{AppError, Result};

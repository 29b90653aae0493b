pub mod handlers;
pub mod routes;

pub use routes::*;

use crate::search::SearchExecutor;
use std::sync::Arc;
use std::time::Instant;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub executor: Arc<SearchExecutor>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(executor: Arc<SearchExecutor>) -> Self {
        Self {
            executor,
            started_at: Instant::now(),
        }
    }
}

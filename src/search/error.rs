//! Error types for search operations

use crate::error::AppError;

/// Result type for search operations
pub type SearchResult<T> = std::result::Result<T, SearchError>;

/// Errors that can occur while assembling or executing a search
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// Field name is not part of the field catalog
    #[error("Unknown field: {0}")]
    UnknownField(String),

    /// Field exists but is not marked filterable
    #[error("Field is not filterable: {0}")]
    FieldNotFilterable(String),

    /// Field exists but does not hold dates
    #[error("Field is not a date field: {0}")]
    FieldNotDate(String),

    /// Field catalog failed validation at load time
    #[error("Invalid field catalog: {0}")]
    InvalidCatalog(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Connection-level failure talking to the backend
    #[error("Search transport failed: {0}")]
    Transport(String),

    /// Backend request exceeded the client timeout
    #[error("Search request timed out: {0}")]
    Timeout(String),

    /// Backend answered with a non-success status
    #[error("Search backend returned status {status}: {message}")]
    Backend { status: u16, message: String },

    /// Backend body could not be decoded
    #[error("Malformed search response: {0}")]
    MalformedResponse(String),
}

impl SearchError {
    /// Whether this error is caller misuse, raised before any backend call
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            SearchError::UnknownField(_)
                | SearchError::FieldNotFilterable(_)
                | SearchError::FieldNotDate(_)
                | SearchError::InvalidCatalog(_)
                | SearchError::InvalidConfiguration(_)
        )
    }
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SearchError::Timeout(err.to_string())
        } else if err.is_decode() {
            SearchError::MalformedResponse(err.to_string())
        } else {
            SearchError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SearchError {
    fn from(err: serde_json::Error) -> Self {
        SearchError::MalformedResponse(err.to_string())
    }
}

impl From<SearchError> for AppError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::UnknownField(_)
            | SearchError::FieldNotFilterable(_)
            | SearchError::FieldNotDate(_) => AppError::Validation(err.to_string()),
            SearchError::InvalidCatalog(msg) | SearchError::InvalidConfiguration(msg) => {
                AppError::Configuration(msg)
            }
            SearchError::Timeout(msg) => AppError::Timeout(msg),
            SearchError::Transport(_) | SearchError::Backend { .. } => {
                AppError::Network(err.to_string())
            }
            SearchError::MalformedResponse(_) => AppError::Internal(err.to_string()),
        }
    }
}

use std::time::Duration;

use thiserror::Error;

/// Application-wide error types for Bazaar.
///
/// Only conditions that abort a search live here. Degraded outcomes such as
/// an incomplete product card or an unreachable exchange-rate service are
/// plain values elsewhere in the crate.
#[derive(Error, Debug)]
pub enum AppError {
    /// HTTP request failed or returned a non-success status.
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Request timed out.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Search input rejected before any request was made.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// A CSS selector in a strategy failed to compile.
    #[error("Selector error: {0}")]
    SelectorError(String),

    /// Configuration value missing or malformed.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// Returns true if this error means a page could not be retrieved.
    ///
    /// Callers use this to tell "could not reach the search page" apart from
    /// bad input or configuration.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            AppError::HttpError(_) | AppError::Timeout(_) | AppError::NetworkError(_)
        )
    }
}

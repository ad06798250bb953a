//! BinaryLane client errors

use thiserror::Error;

/// Errors that can occur when interacting with the BinaryLane API
#[derive(Debug, Error)]
pub enum BinaryLaneError {
    /// HTTP request/response error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// BinaryLane API returned a non-success status other than 404
    #[error("BinaryLane API error: {0}")]
    Api(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Authentication failed (invalid or revoked token)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Resource not found (HTTP 404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request (e.g., malformed base URL)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl BinaryLaneError {
    /// Returns true when the API reported that the addressed resource does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

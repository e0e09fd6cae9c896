//! Backend error types.

use common::{ProductId, Size};
use thiserror::Error;

/// Errors that can occur when talking to the remote backend.
///
/// This is a closed set of tagged kinds so callers branch on failure type
/// instead of parsing message strings.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The transport failed before a response was received.
    #[error("Network error: {0}")]
    Network(String),

    /// The operation did not complete within its deadline.
    #[error("Operation '{op}' timed out")]
    Timeout { op: &'static str },

    /// No authenticated session is present.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// The session token was rejected; the user must re-authenticate.
    #[error("Session expired")]
    SessionExpired,

    /// The requested row does not exist.
    #[error("Not found: {what}")]
    NotFound { what: String },

    /// The backend refused a stock decrement that would go negative.
    #[error("Out of stock: product {product} size {size}")]
    OutOfStock { product: ProductId, size: Size },

    /// The backend rejected the request.
    #[error("Backend error: {message}")]
    Api { message: String },

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BackendError {
    /// Returns true for failures that mean the session is no longer usable.
    pub fn is_session_error(&self) -> bool {
        matches!(
            self,
            BackendError::NotAuthenticated | BackendError::SessionExpired
        )
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            BackendError::Timeout { op: "http request" }
        } else {
            BackendError::Network(e.to_string())
        }
    }
}

/// Result type for backend operations.
pub type Result<T> = std::result::Result<T, BackendError>;

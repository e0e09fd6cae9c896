use thiserror::Error;

/// Errors that can occur when reading or writing local storage.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An I/O error occurred on the underlying storage medium.
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for local storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

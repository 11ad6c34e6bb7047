//! Error types for the cellbook server.

/// Server error type.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Cellbook core error.
    #[error("Core error: {0}")]
    Core(#[from] cellbook_core::Error),

    /// The session task has stopped and no longer accepts requests.
    #[error("Session closed")]
    SessionClosed,

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid listen address.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

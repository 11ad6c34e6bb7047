//! Error types for cellbook-core.

use thiserror::Error;

/// Result type for cellbook-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in cellbook-core.
#[derive(Debug, Error)]
pub enum Error {
    /// The namespace of a call is not in the registry.
    #[error("Unknown namespace: {0}")]
    UnknownNamespace(String),

    /// The namespace exists but does not expose the function.
    #[error("Unknown function: {namespace}.{function}")]
    UnknownFunction { namespace: String, function: String },

    /// A library function failed. The message is passed through verbatim.
    #[error("{0}")]
    FunctionThrow(String),

    /// The execution deadline elapsed before the unit responded.
    #[error("Execution timed out ({0})")]
    Timeout(String),

    /// The execution unit died underneath a request.
    #[error("Execution unit crashed: {0}")]
    UnitCrash(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// IPC communication error with a worker process.
    #[error("IPC error: {0}")]
    Ipc(String),

    /// An IPC frame exceeds the size limit.
    #[error("IPC message too large: {0} bytes")]
    FrameTooLarge(usize),

    /// The peer closed the IPC stream between frames.
    #[error("IPC stream closed")]
    Disconnected,
}

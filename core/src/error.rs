//! Error types for the portdisco-core library.

use thiserror::Error;

/// Result type alias for portdisco operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while enumerating ports or running a session.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to execute a system command.
    #[error("Command execution failed: {0}")]
    CommandFailed(String),

    /// Failed to parse command or procfs output.
    #[error("Failed to parse output: {0}")]
    ParseError(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Platform not supported.
    #[error("Platform not supported: {0}")]
    UnsupportedPlatform(String),

    /// A blocking job on the runtime's worker pool panicked or was cancelled.
    #[error("Background task failed: {0}")]
    Task(String),

    /// Failed to deliver a notification to the client.
    #[error("Failed to notify client: {0}")]
    Notify(String),
}

//! Error definitions shared by all node subsystems

use thiserror::Error;

/// Errors raised by the controller node
#[derive(Debug, Error)]
pub enum NodeError {
    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Inbound payload is missing expected keys or is not valid JSON
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// Inter-task channel closed or full
    #[error("Channel error: {0}")]
    Channel(String),

    /// Board input could not be opened or read
    #[error("Board error: {0}")]
    Board(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

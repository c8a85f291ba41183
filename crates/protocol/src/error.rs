//! Protocol error types.

use thiserror::Error;

/// Errors that can occur while decoding or encoding messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Malformed message: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Expected a text frame")]
    NonText,

    #[error("Invalid color: {0:?}")]
    InvalidColor(String),
}

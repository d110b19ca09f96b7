//! Protocol error types.

use thiserror::Error;

/// Errors that can occur while encoding or decoding wire messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Empty frame")]
    EmptyFrame,

    #[error("Malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Face must be {expected} characters long, got {actual}")]
    InvalidFace { expected: usize, actual: usize },
}

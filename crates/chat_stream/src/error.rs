use serde_json::Error as JsonError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatStreamError {
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("failed to encode request: {0}")]
    Encode(#[from] CodecError),

    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    /// A response line (or the raw error text) grew past the framing limit.
    #[error("stream line exceeds {limit} bytes")]
    LineTooLong { limit: usize },

    #[error("request was cancelled")]
    Cancelled,
}

/// Failure to encode a request or decode an event payload.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("json codec error: {0}")]
    Json(#[from] JsonError),

    #[error("invalid payload: {0}")]
    Invalid(String),
}

impl ChatStreamError {
    /// Returns true when the error only reports cancellation of the call.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

use chat_stream::ChatStreamError;
use thiserror::Error;

/// Substring backends use to report that the prompt exceeds the model's input budget.
pub const TOKEN_LIMIT_SIGNATURE: &str = "context_length_exceeded";

#[derive(Debug, Error)]
pub enum ChatError {
    #[error(transparent)]
    Stream(#[from] ChatStreamError),

    #[error("backend error{}: {message}", backend_label(.kind, .code))]
    Backend {
        kind: String,
        code: String,
        message: String,
    },

    #[error("{source}\n\nShrink the message history to reduce the tokens and try again")]
    TokenLimitManual { source: Box<ChatError> },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl ChatError {
    #[must_use]
    pub fn backend(
        kind: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Backend {
            kind: kind.into(),
            code: code.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

/// Default token-limit predicate: the structured backend code, or the
/// signature anywhere in the rendered error text.
pub fn is_token_limit_exceeded(error: &ChatError) -> bool {
    if let ChatError::Backend { code, .. } = error {
        if code == TOKEN_LIMIT_SIGNATURE {
            return true;
        }
    }
    error.to_string().contains(TOKEN_LIMIT_SIGNATURE)
}

fn backend_label(kind: &str, code: &str) -> String {
    match (kind.is_empty(), code.is_empty()) {
        (true, true) => String::new(),
        (false, true) => format!(" ({kind})"),
        (true, false) => format!(" ({code})"),
        (false, false) => format!(" ({kind}, {code})"),
    }
}

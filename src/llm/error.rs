//! Model gateway errors and their HTTP classification

use std::time::Duration;
use thiserror::Error;

/// A failed model call, classified so the retry layer knows what to do
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct LlmError {
    pub kind: LlmErrorKind,
    pub message: String,
    /// Server-requested delay (`Retry-After`) before the next attempt
    pub retry_after: Option<Duration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmErrorKind {
    Network,
    RateLimit,
    ServerError,
    Auth,
    InvalidRequest,
    Unknown,
}

impl LlmErrorKind {
    /// Kind for a non-success HTTP status from the completions endpoint
    pub fn for_status(status: u16) -> Self {
        match status {
            401 | 403 => Self::Auth,
            429 => Self::RateLimit,
            400 | 404 | 422 => Self::InvalidRequest,
            500..=599 => Self::ServerError,
            _ => Self::Unknown,
        }
    }

    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Network | Self::RateLimit | Self::ServerError)
    }

    fn label(self) -> &'static str {
        match self {
            Self::Network => "Network error",
            Self::RateLimit => "Rate limit exceeded",
            Self::ServerError => "Server error",
            Self::Auth => "Authentication failed",
            Self::InvalidRequest => "Invalid request",
            Self::Unknown => "Request failed",
        }
    }
}

impl LlmError {
    pub fn new(kind: LlmErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Network, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Unknown, message)
    }

    #[cfg(test)]
    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Auth, message)
    }

    #[cfg(test)]
    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::ServerError, message)
    }

    /// Error for a non-success response; `detail` is the provider's message
    pub fn from_status(status: u16, detail: &str, retry_after: Option<Duration>) -> Self {
        let kind = LlmErrorKind::for_status(status);
        let message = match kind {
            LlmErrorKind::Unknown => format!("HTTP {status}: {detail}"),
            _ => format!("{}: {detail}", kind.label()),
        };
        Self {
            kind,
            message,
            retry_after,
        }
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::network(format!("Request timeout: {e}"))
        } else if e.is_connect() || e.is_body() {
            Self::network(format!("Connection failed: {e}"))
        } else {
            Self::unknown(format!("{}: {e}", LlmErrorKind::Unknown.label()))
        }
    }
}

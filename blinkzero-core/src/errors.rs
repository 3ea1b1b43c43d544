// blinkzero-core/src/errors.rs
use thiserror::Error;

/// Errors returned by the chat-completion client.
#[derive(Error, Debug)]
pub enum LlmError {
    /// The server could not be reached (refused, DNS failure, no route).
    #[error("Connection Error: {0}")]
    Connection(#[source] reqwest::Error),

    /// The request was sent but no response arrived within the client timeout.
    #[error("Timeout: {0}")]
    Timeout(#[source] reqwest::Error),

    /// Any other transport failure while sending the request.
    #[error("Request Error: {0}")]
    Request(#[source] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("API error: {status} - {body}")]
    Http {
        status: reqwest::StatusCode,
        body: String,
    },

    /// The response body was not the expected JSON shape.
    #[error("Decode Error: {0}")]
    Decode(String),
}

impl LlmError {
    /// Classifies a transport error from reqwest.
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_connect() {
            LlmError::Connection(err)
        } else if err.is_timeout() {
            LlmError::Timeout(err)
        } else {
            LlmError::Request(err)
        }
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        LlmError::Decode(msg.into())
    }

    pub fn is_connection(&self) -> bool {
        matches!(self, LlmError::Connection(_))
    }

    /// Canonical status text (e.g. "Internal Server Error") for HTTP failures.
    pub fn status_text(&self) -> Option<&'static str> {
        match self {
            LlmError::Http { status, .. } => status.canonical_reason(),
            _ => None,
        }
    }
}

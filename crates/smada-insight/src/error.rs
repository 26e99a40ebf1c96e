//! Error types for smada-insight

use thiserror::Error;

/// Errors that can occur while producing a behavior summary
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InsightError {
    /// Provider is missing configuration (e.g. no API key)
    #[error("insight provider is not configured: {0}")]
    NotConfigured(String),

    /// Transport failure talking to the provider
    #[error("HTTP error: {0}")]
    Http(String),

    /// Provider answered with a non-success status
    #[error("provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Provider answered without any text
    #[error("provider returned an empty response")]
    EmptyResponse,

    /// Text did not match the expected schema
    #[error("invalid insight response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for InsightError {
    fn from(err: reqwest::Error) -> Self {
        InsightError::Http(err.to_string())
    }
}

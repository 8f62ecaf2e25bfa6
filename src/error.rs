//! Error types for the Joke Operator

use thiserror::Error;

use crate::crd::State;

/// Result type alias using the operator's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Operator error types
#[derive(Error, Debug)]
pub enum Error {
    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// HTTP transport error talking to the joke API
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Joke API returned a payload we cannot use
    #[error("Malformed joke API response: {0}")]
    MalformedResponse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Status state machine rejected a transition
    #[error("Invalid status transition from {from} on {event}")]
    InvalidTransition { from: State, event: String },

    /// Watch error while waiting on a resource
    #[error("Wait error: {0}")]
    Wait(#[from] kube_runtime::wait::Error),

    /// Bounded wait expired
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Undecodable JSON payload
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL parse error
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    /// Create a malformed response error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Error::MalformedResponse(msg.into())
    }
}

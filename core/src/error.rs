//! Error types for the API handler.
//!
//! # Design
//! Every failure a call can hit has its own variant so it can travel through
//! the `error` slot of a `CallOutcome`. Payloads are owned strings, which
//! keeps `ApiError` `Clone` and lets it cross the FFI boundary as a message.

use thiserror::Error;

/// Errors reported through `CallOutcome::error`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Base URL plus endpoint did not form an absolute http(s) URL.
    #[error("invalid URL `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The request never produced a response (DNS, connect, TLS, timeout).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The parameters could not be serialized into the request body.
    #[error("request encoding failed: {0}")]
    EncodingFailed(String),

    /// The response body was not valid JSON.
    #[error("response decoding failed: {0}")]
    DecodingFailed(String),
}

/// Broad category of a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Timeout,
    Connect,
    Other,
}

/// A failure below HTTP: no status code was received.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("transport error ({kind:?}): {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            TransportErrorKind::Timeout
        } else if err.is_connect() {
            TransportErrorKind::Connect
        } else {
            TransportErrorKind::Other
        };
        Self::new(kind, err.to_string())
    }
}

/// Errors raised while loading a `ClientConfig`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

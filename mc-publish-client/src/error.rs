//! Client-side error types.
//!
//! This module provides [`ClientError`], the error type of every dispatcher
//! call, and [`ClientBuildError`] for configuration failures.

use std::time::Duration;

use mc_publish_core::{Classify, Recoverability, SoftError};

use crate::classify::ResponseError;
use crate::response::HttpResponse;

/// Errors produced while dispatching a request.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The server answered with a non-2xx status.
    #[error(transparent)]
    Response(Box<ResponseError>),

    /// Transport-level failure (connection refused, reset, TLS failure).
    #[error("transport error: {0}")]
    Transport(String),

    /// The request did not complete in time.
    #[error("request timed out after {}ms", .after.as_millis())]
    Timeout {
        after: Duration,
        recoverability: Recoverability,
    },

    /// The URL could not be parsed or resolved against the base URL.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// A header name or value was rejected.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// The request body could not be encoded.
    #[error("encode error: {0}")]
    Encode(String),

    /// The response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// Local I/O failure, e.g. reading an attachment.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// An error carrying an explicit soft/hard marker.
    #[error(transparent)]
    Marked(#[from] SoftError),
}

impl ClientError {
    /// Create a timeout error that must not be retried.
    pub fn timeout(after: Duration) -> Self {
        ClientError::Timeout {
            after,
            recoverability: Recoverability::Fatal,
        }
    }

    /// The response behind an HTTP failure.
    pub fn response(&self) -> Option<&HttpResponse> {
        match self {
            ClientError::Response(err) => Some(err.response()),
            _ => None,
        }
    }

    /// The HTTP status behind an HTTP failure.
    pub fn status(&self) -> Option<http::StatusCode> {
        self.response().map(HttpResponse::status)
    }
}

impl Classify for ClientError {
    /// Recoverability per variant:
    /// - `Response`: 429 and 5xx are recoverable
    /// - `Transport`: recoverable
    /// - `Timeout`: as configured (fatal by default)
    /// - `InvalidUrl`/`InvalidHeader`/`Encode`/`Decode`: fatal
    /// - `Io`: unmarked
    /// - `Marked`: its own marker
    fn recoverability(&self) -> Option<Recoverability> {
        match self {
            ClientError::Response(err) => Some(ResponseError::recoverability(err)),
            ClientError::Transport(_) => Some(Recoverability::Recoverable),
            ClientError::Timeout { recoverability, .. } => Some(*recoverability),
            ClientError::InvalidUrl(_)
            | ClientError::InvalidHeader(_)
            | ClientError::Encode(_)
            | ClientError::Decode(_) => Some(Recoverability::Fatal),
            ClientError::Io(_) => None,
            ClientError::Marked(err) => err.recoverability(),
        }
    }
}

impl From<ResponseError> for ClientError {
    fn from(err: ResponseError) -> Self {
        ClientError::Response(Box::new(err))
    }
}

impl From<url::ParseError> for ClientError {
    fn from(err: url::ParseError) -> Self {
        ClientError::InvalidUrl(err.to_string())
    }
}

/// Errors produced while building a [`Dispatcher`](crate::Dispatcher).
#[derive(Debug, thiserror::Error)]
pub enum ClientBuildError {
    /// The base URL is not an absolute URL.
    #[error("invalid base url: {0}")]
    BaseUrl(#[from] url::ParseError),

    /// A default header name or value was rejected.
    #[error("invalid default header: {0}")]
    Header(String),

    /// The default transport could not be created.
    #[error("failed to create HTTP transport: {0}")]
    Transport(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_recoverability() {
        assert!(ClientError::Transport("connection reset".into()).is_soft());
        assert!(!ClientError::timeout(Duration::from_secs(1)).is_soft());
        assert!(!ClientError::InvalidUrl("nope".into()).is_soft());
        assert!(!ClientError::Decode("bad json".into()).is_soft());
        assert_eq!(
            ClientError::Io(std::io::Error::other("eof")).recoverability(),
            None
        );

        let soft_timeout = ClientError::Timeout {
            after: Duration::from_secs(1),
            recoverability: Recoverability::Recoverable,
        };
        assert!(soft_timeout.is_soft());
    }

    #[test]
    fn test_marked_error_keeps_marker() {
        let err: ClientError = SoftError::recoverable("platform busy").into();
        assert!(err.is_soft());
        assert_eq!(err.to_string(), "platform busy");

        let err: ClientError = SoftError::fatal("file rejected").into();
        assert!(!err.is_soft());
    }

    #[test]
    fn test_timeout_message() {
        let err = ClientError::timeout(Duration::from_millis(1500));
        assert_eq!(err.to_string(), "request timed out after 1500ms");
        assert!(err.status().is_none());
    }
}

//! Response type for the dispatcher.
//!
//! This module provides [`HttpResponse`], whose body can be read any number
//! of times. The first read drains the transport body into a buffer shared by
//! the response and all of its clones; every later read replays that buffer.
//! Library diagnostics (see [`ResponseError`](crate::ResponseError)) read
//! through a clone, so they never consume the caller's body.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http::header::{self, HeaderMap, HeaderName, HeaderValue};
use http_body::Body;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Full};
use hyper::ext::ReasonPhrase;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;

use crate::ClientError;
use crate::classify::ResponseError;

type BoxedBody = UnsyncBoxBody<Bytes, ClientError>;

enum BodyState {
    /// Not read yet.
    Pending(BoxedBody),
    /// Fully read.
    Buffered(Bytes),
    /// Reading failed; the message is replayed on every later read.
    Failed(String),
}

/// Shared, replayable response body.
#[derive(Clone)]
struct ReplayBody {
    state: Arc<Mutex<BodyState>>,
}

impl ReplayBody {
    fn buffered(bytes: Bytes) -> Self {
        Self {
            state: Arc::new(Mutex::new(BodyState::Buffered(bytes))),
        }
    }

    fn pending(body: BoxedBody) -> Self {
        Self {
            state: Arc::new(Mutex::new(BodyState::Pending(body))),
        }
    }

    async fn bytes(&self) -> Result<Bytes, ClientError> {
        let mut state = self.state.lock().await;

        if let BodyState::Pending(body) = &mut *state {
            let next = match body.collect().await {
                Ok(collected) => BodyState::Buffered(collected.to_bytes()),
                Err(e) => BodyState::Failed(format!("failed to read response body: {}", e)),
            };
            *state = next;
        }

        match &*state {
            BodyState::Buffered(bytes) => Ok(bytes.clone()),
            BodyState::Failed(message) => Err(ClientError::Transport(message.clone())),
            BodyState::Pending(_) => Err(ClientError::Transport(
                "response body was not buffered".into(),
            )),
        }
    }
}

/// An HTTP response with a re-readable body.
///
/// Cloning is cheap: clones share the body buffer, so reading through one
/// clone makes the content available to all of them.
///
/// # Example
///
/// ```ignore
/// let response = dispatcher.get("/project/fabric-api").await?;
///
/// // Both reads see the full body.
/// let raw = response.text().await?;
/// let project: Project = response.json().await?;
/// ```
#[derive(Clone)]
pub struct HttpResponse {
    status: StatusCode,
    status_text: String,
    headers: HeaderMap,
    body: ReplayBody,
}

impl HttpResponse {
    /// Create a response with a fully buffered body.
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            status_text: default_status_text(status),
            headers,
            body: ReplayBody::buffered(body.into()),
        }
    }

    /// Wrap a transport response. The body is read lazily on first access.
    ///
    /// The reason phrase the server sent is kept when hyper recorded one,
    /// otherwise the canonical phrase of the status is used.
    pub fn from_http<B>(response: http::Response<B>) -> Self
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: fmt::Display,
    {
        let (parts, body) = response.into_parts();
        let body = body
            .map_err(|e| ClientError::Transport(e.to_string()))
            .boxed_unsync();

        let status_text = match parts.extensions.get::<ReasonPhrase>() {
            Some(reason) => String::from_utf8_lossy(reason.as_bytes()).into_owned(),
            None => default_status_text(parts.status),
        };

        Self {
            status: parts.status,
            status_text,
            headers: parts.headers,
            body: ReplayBody::pending(body),
        }
    }

    /// Create a response with raw bytes and no headers.
    pub fn from_bytes(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self::new(status, HeaderMap::new(), body)
    }

    /// Create a `text/plain` response, e.g. from a synthetic transport.
    pub fn from_text(status: StatusCode, body: impl Into<String>) -> Self {
        Self::with_content_type(status, "text/plain;charset=UTF-8", body.into())
    }

    /// Create an `application/json` response from a JSON value.
    pub fn from_json(status: StatusCode, value: &serde_json::Value) -> Self {
        Self::with_content_type(status, "application/json", value.to_string())
    }

    /// Create a `text/html` response.
    pub fn from_html(status: StatusCode, body: impl Into<String>) -> Self {
        Self::with_content_type(status, "text/html;charset=UTF-8", body.into())
    }

    fn with_content_type(status: StatusCode, content_type: &'static str, body: String) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        Self::new(status, headers, body)
    }

    /// Wrap a streaming body, e.g. for tests of lazy reads.
    pub fn from_body<B>(status: StatusCode, headers: HeaderMap, body: B) -> Self
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: fmt::Display,
    {
        let mut response = http::Response::new(body);
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Self::from_http(response)
    }

    /// Replace the status text.
    pub fn with_status_text(mut self, status_text: impl Into<String>) -> Self {
        self.status_text = status_text.into();
        self
    }

    /// Set a header, replacing existing values.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The reason phrase, e.g. `"Not Found"`.
    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The declared `Content-Type`, if present and valid UTF-8.
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Read the body as bytes.
    pub async fn bytes(&self) -> Result<Bytes, ClientError> {
        self.body.bytes().await
    }

    /// Read the body as text. Invalid UTF-8 sequences are replaced.
    pub async fn text(&self) -> Result<String, ClientError> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Read the body as JSON.
    pub async fn json<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        let bytes = self.bytes().await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| ClientError::Decode(format!("JSON decoding failed: {}", e)))
    }

    /// Return the response on 2xx, the classified failure otherwise.
    pub async fn error_for_status(self) -> Result<Self, ClientError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ResponseError::from_response(&self, true).await.into())
        }
    }
}

impl fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("status_text", &self.status_text)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

impl From<http::Response<Full<Bytes>>> for HttpResponse {
    fn from(response: http::Response<Full<Bytes>>) -> Self {
        Self::from_http(response)
    }
}

fn default_status_text(status: StatusCode) -> String {
    status.canonical_reason().unwrap_or_default().to_owned()
}

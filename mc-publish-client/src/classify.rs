//! Failure classification for non-2xx responses.
//!
//! [`ResponseError`] turns a failed [`HttpResponse`] into an error whose
//! message is safe to log and whose [`Recoverability`] drives the retry
//! engine:
//!
//! | Status        | Recoverability |
//! |---------------|----------------|
//! | 429           | Recoverable    |
//! | 500-599       | Recoverable    |
//! | anything else | Fatal          |

use http::StatusCode;
use mc_publish_core::{Classify, Recoverability};

use crate::response::HttpResponse;

/// A classified HTTP failure.
///
/// Holds a clone of the failed response. Clones share the body buffer, so
/// building the message never consumes the body the caller reads later.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct ResponseError {
    response: HttpResponse,
    message: String,
    recoverability: Recoverability,
}

impl ResponseError {
    /// Classify `response`.
    ///
    /// The message is `"{status} ({status text})"`. With `include_body`, a
    /// non-empty textual or JSON body is appended verbatim:
    /// `"{status} ({status text}, {body})"`. HTML and XML bodies, and bodies
    /// with no declared content type, are never embedded.
    pub async fn from_response(response: &HttpResponse, include_body: bool) -> Self {
        let response = response.clone();
        let status = response.status();

        let mut message = format!("{} ({}", status.as_u16(), response.status_text());
        if include_body && response.content_type().is_some_and(is_embeddable) {
            // A body that cannot be read is left out of the message.
            if let Ok(text) = response.text().await
                && !text.is_empty()
            {
                message.push_str(", ");
                message.push_str(&text);
            }
        }
        message.push(')');

        Self {
            recoverability: recoverability_of(status),
            response,
            message,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.response.status()
    }

    /// The failed response. Its body is still fully readable.
    pub fn response(&self) -> &HttpResponse {
        &self.response
    }

    pub fn into_response(self) -> HttpResponse {
        self.response
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn recoverability(&self) -> Recoverability {
        self.recoverability
    }

    pub fn is_soft(&self) -> bool {
        self.recoverability.is_recoverable()
    }
}

impl Classify for ResponseError {
    fn recoverability(&self) -> Option<Recoverability> {
        Some(self.recoverability)
    }
}

/// Recoverability of a failed status: 429 and 5xx may succeed later.
pub fn recoverability_of(status: StatusCode) -> Recoverability {
    Recoverability::from_soft(status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error())
}

/// Whether a body with `content_type` may be embedded in a message.
///
/// Accepts `text/*` except `text/html`, and any type whose subtype is `json`
/// or ends with it (`application/json`, `application/problem+json`,
/// `application/x-json`).
pub fn is_embeddable(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    let Some((kind, subtype)) = essence.split_once('/') else {
        return false;
    };

    if subtype.ends_with("json") {
        return true;
    }
    kind == "text" && subtype != "html" && subtype != "xml"
}

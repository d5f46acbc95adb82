//! Request body types for HTTP transport.
//!
//! This module provides [`TransportBody`], the body type handed to hyper, and
//! the encoding step that turns a [`RequestBody`] into one.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::{Stream, TryStreamExt};
use http::HeaderValue;
use http_body::{Body, Frame};
use mc_publish_core::{MultiPartForm, RequestBody};
use pin_project_lite::pin_project;

use crate::ClientError;

pin_project! {
    /// A request body on the wire.
    ///
    /// This type can represent:
    /// - Empty bodies (GET requests)
    /// - Full bodies (text, URL-encoded and multi-part payloads)
    /// - Streaming bodies (passed through from [`RequestBody::Stream`])
    #[project = TransportBodyProj]
    pub enum TransportBody {
        Empty,
        Full {
            data: Option<Bytes>,
        },
        Streaming {
            #[pin]
            stream: Pin<Box<dyn Stream<Item = Result<Bytes, ClientError>> + Send>>,
        },
    }
}

/// An encoded body with the content type its shape implies.
#[derive(Debug)]
pub struct EncodedBody {
    pub body: TransportBody,
    /// Sent when the caller set no `Content-Type` of its own.
    pub content_type: Option<HeaderValue>,
}

impl TransportBody {
    pub fn empty() -> Self {
        TransportBody::Empty
    }

    pub fn full(data: Bytes) -> Self {
        TransportBody::Full { data: Some(data) }
    }

    pub fn streaming<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, ClientError>> + Send + 'static,
    {
        TransportBody::Streaming {
            stream: Box::pin(stream),
        }
    }

    /// Encode a request body.
    ///
    /// Binary and stream bodies pass through unbuffered. Text is sent as
    /// UTF-8, pairs as `application/x-www-form-urlencoded`, and forms as
    /// `multipart/form-data` with a random boundary. Form files are read here.
    pub async fn from_request_body(body: RequestBody) -> Result<EncodedBody, ClientError> {
        let content_type = body.default_content_type().map(HeaderValue::from_static);

        let body = match body {
            RequestBody::Empty => TransportBody::empty(),
            RequestBody::Text(text) => TransportBody::full(Bytes::from(text)),
            RequestBody::Binary(data) => TransportBody::full(data),
            RequestBody::Stream(stream) => {
                TransportBody::streaming(stream.map_err(ClientError::from))
            }
            RequestBody::UrlEncoded(pairs) => {
                let encoded = url::form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
                    .finish();
                TransportBody::full(Bytes::from(encoded))
            }
            RequestBody::MultiPart(form) => return encode_multipart(&form).await,
        };

        Ok(EncodedBody { body, content_type })
    }
}

async fn encode_multipart(form: &MultiPartForm) -> Result<EncodedBody, ClientError> {
    let boundary = format!("----mc-publish-{:016x}", rand::random::<u64>());
    let data = form.encode(&boundary).await?;
    let value = format!("multipart/form-data; boundary={}", boundary);
    let content_type = HeaderValue::from_str(&value)
        .map_err(|e| ClientError::Encode(format!("invalid multipart boundary: {}", e)))?;

    Ok(EncodedBody {
        body: TransportBody::full(data),
        content_type: Some(content_type),
    })
}

impl Body for TransportBody {
    type Data = Bytes;
    type Error = ClientError;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match self.project() {
            TransportBodyProj::Empty => Poll::Ready(None),
            TransportBodyProj::Full { data } => {
                Poll::Ready(data.take().map(|d| Ok(Frame::data(d))))
            }
            TransportBodyProj::Streaming { stream } => match stream.poll_next(cx) {
                Poll::Ready(Some(Ok(data))) => Poll::Ready(Some(Ok(Frame::data(data)))),
                Poll::Ready(Some(Err(e))) => Poll::Ready(Some(Err(e))),
                Poll::Ready(None) => Poll::Ready(None),
                Poll::Pending => Poll::Pending,
            },
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            TransportBody::Empty => true,
            TransportBody::Full { data } => data.is_none(),
            TransportBody::Streaming { .. } => false,
        }
    }

    fn size_hint(&self) -> http_body::SizeHint {
        match self {
            TransportBody::Empty => http_body::SizeHint::with_exact(0),
            TransportBody::Full { data } => {
                http_body::SizeHint::with_exact(data.as_ref().map_or(0, |d| d.len() as u64))
            }
            TransportBody::Streaming { .. } => http_body::SizeHint::default(),
        }
    }
}

impl Default for TransportBody {
    fn default() -> Self {
        TransportBody::Empty
    }
}

impl std::fmt::Debug for TransportBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportBody::Empty => write!(f, "TransportBody::Empty"),
            TransportBody::Full { data } => f
                .debug_struct("TransportBody::Full")
                .field("data_len", &data.as_ref().map(|d| d.len()))
                .finish(),
            TransportBody::Streaming { .. } => write!(f, "TransportBody::Streaming"),
        }
    }
}

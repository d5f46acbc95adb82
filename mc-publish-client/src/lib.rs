//! Resilient HTTP client for mc-publish platform uploaders.
//!
//! This crate provides the HTTP layer that Modrinth, CurseForge and GitHub
//! uploaders are built on, designed around the shared types of
//! `mc-publish-core`.
//!
//! ## Features
//!
//! - A [`Dispatcher`] with base URL resolution, default headers and a
//!   middleware pipeline
//! - Responses whose body can be read any number of times
//! - Classification of failed responses into soft (retryable) and hard errors
//! - An upload template ([`Uploader`]) that retries soft failures
//!
//! ## Example
//!
//! ```ignore
//! use mc_publish_client::{Dispatcher, RequestInit};
//! use http::Method;
//!
//! let dispatcher = Dispatcher::builder()
//!     .base_url("https://api.modrinth.com/v2/")
//!     .default_header("user-agent", "mc-publish/3.3")
//!     .build()?;
//!
//! let init = RequestInit::new()
//!     .method(Method::POST)
//!     .try_header("authorization", token.unwrap())?
//!     .body(form);
//!
//! let response = dispatcher.dispatch("version", init).await?;
//! let version: Version = response.error_for_status().await?.json().await?;
//! ```
//!
//! ## Middleware
//!
//! Middleware wrap every dispatch of one dispatcher. They run in registration
//! order on the way in and in reverse order on the way out:
//!
//! ```ignore
//! use mc_publish_client::middleware::{from_fn, HttpNext, TimeoutMiddleware, TraceMiddleware};
//!
//! let mut dispatcher = Dispatcher::builder()
//!     .with_middleware(TraceMiddleware::new())
//!     .with_middleware(TimeoutMiddleware::new(Duration::from_secs(30)).soft())
//!     .build()?;
//!
//! dispatcher.use_middleware(from_fn(|request: HttpRequest, next: HttpNext| async move {
//!     let response = next.call(request).await?;
//!     tracing::info!(remaining = ?response.headers().get("x-ratelimit-remaining"));
//!     Ok(response)
//! }));
//! ```
//!
//! ## Errors and Retries
//!
//! Every dispatcher call returns [`ClientError`]. Errors report whether a
//! retry may help through [`Classify`]:
//!
//! | Error | Recoverable |
//! |-------|-------------|
//! | 429 or 5xx response | yes |
//! | Other non-2xx response | no |
//! | Transport failure | yes |
//! | Timeout | no, unless the middleware is `soft()` |
//! | Invalid URL, header or body | no |
//!
//! ```ignore
//! use mc_publish_client::{retry_with, RetryOptions};
//!
//! let options = RetryOptions::new()
//!     .max_attempts(3)
//!     .delay(Duration::from_secs(5));
//!
//! let response = retry_with(options, || async {
//!     dispatcher.get("project/fabric-api").await?.error_for_status().await
//! }).await?;
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `tls` (default) | `tls-ring` + `tls-native-roots` |
//! | `tls-ring` | ring crypto provider |
//! | `tls-native-roots` | System root certificates |
//! | `tls-webpki-roots` | Bundled Mozilla root certificates |
//!
//! ## Logging
//!
//! The crate logs through `tracing` and never installs a subscriber.
//! [`TraceMiddleware`](middleware::TraceMiddleware) opens one `http.request`
//! span per dispatch; the retry engine emits a `debug` event per retry.

mod classify;
mod dispatcher;
mod error;
mod log;
pub mod middleware;
mod request;
mod response;
pub mod transport;
mod upload;

pub use classify::{ResponseError, is_embeddable, recoverability_of};
pub use dispatcher::{
    Destination, Dispatcher, DispatcherBuilder, DispatcherOptions, destinations_equal,
};
pub use error::{ClientBuildError, ClientError};
pub use log::{Logger, NullLogger, TracingLogger};
pub use middleware::{HttpNext, HttpResult, Middleware, Pipeline};
pub use request::{HttpRequest, RequestInit};
pub use response::HttpResponse;
pub use transport::{HyperTransport, Transport, transport_fn};
pub use upload::{Platform, UnknownPlatform, UploadRequest, Uploader};

// Re-export the core crate so uploaders need a single dependency.
pub use mc_publish_core::{
    Classify, FileRef, FormValue, MultiPartForm, Part, Recoverability, RequestBody, RetryOptions,
    RetrySettings, Secret, SoftError, retry, retry_with,
};

// Re-export commonly used HTTP types
pub use http::{HeaderMap, HeaderValue, Method, StatusCode};
pub use url::Url;

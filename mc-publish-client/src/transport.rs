//! HTTP transport layer.
//!
//! A [`Transport`] performs the actual network call at the end of a
//! dispatcher pipeline. [`HyperTransport`] is the default, using
//! hyper_util's legacy client. It supports:
//!
//! - HTTP/1.1 and HTTP/2 with automatic protocol negotiation
//! - TLS with rustls (feature-gated)
//! - Connection pooling
//!
//! Tests and offline tools can plug in any async function with
//! [`transport_fn`].
//!
//! # Feature Flags
//!
//! - `tls` (default) - Enables `tls-ring` + `tls-native-roots`
//! - `tls-ring` - Crypto provider
//! - `tls-native-roots` / `tls-webpki-roots` - Root certificates
//!
//! # Example
//!
//! ```ignore
//! use mc_publish_client::transport::{transport_fn, HyperTransport};
//! use std::time::Duration;
//!
//! let transport = HyperTransport::builder()
//!     .pool_idle_timeout(Duration::from_secs(60))
//!     .build()?;
//!
//! let offline = transport_fn(|request: HttpRequest| async move {
//!     Ok(HttpResponse::from_text(StatusCode::OK, request.url.to_string()))
//! });
//! ```

mod body;
mod connector;
mod hyper;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

pub use body::{EncodedBody, TransportBody};
pub use connector::{build_https_connector, has_tls_support};
#[cfg(any(feature = "tls-native-roots", feature = "tls-webpki-roots"))]
pub use connector::default_tls_config;
pub use hyper::{HyperTransport, HyperTransportBuilder};

// Re-export the rustls config type used by `HyperTransportBuilder::tls_config`.
pub use rustls::ClientConfig as TlsClientConfig;

use crate::middleware::{BoxFuture, HttpResult};
use crate::request::HttpRequest;

/// Performs the network call for a resolved request.
pub trait Transport: Send + Sync {
    fn send(&self, request: HttpRequest) -> BoxFuture<'static, HttpResult>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send(&self, request: HttpRequest) -> BoxFuture<'static, HttpResult> {
        (**self).send(request)
    }
}

/// A transport built from a closure. See [`transport_fn`].
#[derive(Clone)]
pub struct FnTransport<F> {
    func: F,
}

impl<F> fmt::Debug for FnTransport<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTransport").finish_non_exhaustive()
    }
}

/// Adapt an async closure into a [`Transport`].
pub fn transport_fn<F, Fut>(func: F) -> FnTransport<F>
where
    F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HttpResult> + Send + 'static,
{
    FnTransport { func }
}

impl<F, Fut> Transport for FnTransport<F>
where
    F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HttpResult> + Send + 'static,
{
    fn send(&self, request: HttpRequest) -> BoxFuture<'static, HttpResult> {
        Box::pin((self.func)(request))
    }
}

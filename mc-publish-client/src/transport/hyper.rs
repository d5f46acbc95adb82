//! Hyper-based HTTP transport.

use std::time::Duration;

use http::header::CONTENT_TYPE;
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::{Client, connect::HttpConnector};
use hyper_util::rt::{TokioExecutor, TokioTimer};
use rustls::ClientConfig;

use super::Transport;
use super::body::{EncodedBody, TransportBody};
use super::connector::build_https_connector;
use crate::middleware::{BoxFuture, HttpResult};
use crate::request::HttpRequest;
use crate::response::HttpResponse;
use crate::{ClientBuildError, ClientError};

type HyperClient = Client<HttpsConnector<HttpConnector>, TransportBody>;

/// HTTP transport using hyper_util's legacy client.
///
/// Cloning is cheap and clones share the connection pool.
///
/// # Example
///
/// ```ignore
/// use mc_publish_client::{Dispatcher, transport::HyperTransport};
///
/// let transport = HyperTransport::builder()
///     .pool_max_idle_per_host(4)
///     .build()?;
///
/// let dispatcher = Dispatcher::builder()
///     .transport(transport)
///     .base_url("https://api.modrinth.com/v2/")
///     .build()?;
/// ```
#[derive(Clone)]
pub struct HyperTransport {
    client: HyperClient,
    http2_only: bool,
}

impl std::fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransport")
            .field("http2_only", &self.http2_only)
            .finish_non_exhaustive()
    }
}

impl HyperTransport {
    pub fn builder() -> HyperTransportBuilder {
        HyperTransportBuilder::new()
    }

    /// Create a transport with default settings.
    pub fn new() -> Result<Self, ClientBuildError> {
        Self::builder().build()
    }

    pub fn is_http2_only(&self) -> bool {
        self.http2_only
    }
}

impl Transport for HyperTransport {
    fn send(&self, request: HttpRequest) -> BoxFuture<'static, HttpResult> {
        let client = self.client.clone();
        Box::pin(async move {
            let request = into_http_request(request).await?;
            let response = client
                .request(request)
                .await
                .map_err(|e| ClientError::Transport(format!("request failed: {}", e)))?;
            Ok(HttpResponse::from_http(response))
        })
    }
}

/// Encode the body and build the hyper request.
async fn into_http_request(
    request: HttpRequest,
) -> Result<http::Request<TransportBody>, ClientError> {
    let HttpRequest {
        method,
        url,
        mut headers,
        body,
        extensions,
    } = request;

    let uri: http::Uri = url
        .as_str()
        .parse()
        .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", url, e)))?;

    let EncodedBody { body, content_type } = TransportBody::from_request_body(body).await?;
    if let Some(content_type) = content_type
        && !headers.contains_key(CONTENT_TYPE)
    {
        headers.insert(CONTENT_TYPE, content_type);
    }

    let mut http_request = http::Request::new(body);
    *http_request.method_mut() = method;
    *http_request.uri_mut() = uri;
    *http_request.headers_mut() = headers;
    *http_request.extensions_mut() = extensions;
    Ok(http_request)
}

/// Builder for [`HyperTransport`].
pub struct HyperTransportBuilder {
    tls_config: Option<ClientConfig>,
    http2_only: bool,
    pool_idle_timeout: Option<Duration>,
    pool_max_idle_per_host: usize,
}

impl Default for HyperTransportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HyperTransportBuilder {
    pub fn new() -> Self {
        Self {
            tls_config: None,
            http2_only: false,
            pool_idle_timeout: Some(Duration::from_secs(90)),
            pool_max_idle_per_host: 32,
        }
    }

    /// Set a custom TLS configuration, e.g. with private root certificates.
    pub fn tls_config(mut self, config: ClientConfig) -> Self {
        self.tls_config = Some(config);
        self
    }

    /// Speak HTTP/2 without negotiation.
    pub fn http2_only(mut self, enabled: bool) -> Self {
        self.http2_only = enabled;
        self
    }

    /// Close pooled connections idle for longer than `timeout`.
    ///
    /// Default: 90 seconds.
    pub fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = Some(timeout);
        self
    }

    /// Keep idle connections open indefinitely.
    pub fn pool_idle_timeout_none(mut self) -> Self {
        self.pool_idle_timeout = None;
        self
    }

    /// Default: 32.
    pub fn pool_max_idle_per_host(mut self, max: usize) -> Self {
        self.pool_max_idle_per_host = max;
        self
    }

    pub fn build(self) -> Result<HyperTransport, ClientBuildError> {
        let https_connector = build_https_connector(self.tls_config)?;

        let mut builder = Client::builder(TokioExecutor::new());
        // Required for pool_idle_timeout to take effect.
        builder.pool_timer(TokioTimer::new());

        if let Some(timeout) = self.pool_idle_timeout {
            builder.pool_idle_timeout(timeout);
        }
        builder.pool_max_idle_per_host(self.pool_max_idle_per_host);

        if self.http2_only {
            builder.http2_only(true);
        }

        Ok(HyperTransport {
            client: builder.build(https_connector),
            http2_only: self.http2_only,
        })
    }
}

impl std::fmt::Debug for HyperTransportBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransportBuilder")
            .field("tls_config", &self.tls_config.is_some())
            .field("http2_only", &self.http2_only)
            .field("pool_idle_timeout", &self.pool_idle_timeout)
            .field("pool_max_idle_per_host", &self.pool_max_idle_per_host)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{HeaderValue, Method};
    use mc_publish_core::{RequestBody, TEXT_CONTENT_TYPE};
    use url::Url;

    #[test]
    fn test_builder_defaults() {
        let builder = HyperTransportBuilder::new();
        assert!(!builder.http2_only);
        assert_eq!(builder.pool_max_idle_per_host, 32);
        assert_eq!(builder.pool_idle_timeout, Some(Duration::from_secs(90)));
    }

    #[test]
    fn test_builder_pool_settings() {
        let builder = HyperTransportBuilder::new()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(10);
        assert_eq!(builder.pool_idle_timeout, Some(Duration::from_secs(60)));
        assert_eq!(builder.pool_max_idle_per_host, 10);

        let builder = builder.pool_idle_timeout_none();
        assert_eq!(builder.pool_idle_timeout, None);
    }

    #[cfg(feature = "tls")]
    #[test]
    fn test_build_transport_http2_only() {
        let transport = HyperTransportBuilder::new().http2_only(true).build().unwrap();
        assert!(transport.is_http2_only());
    }

    #[tokio::test]
    async fn test_into_http_request_sets_default_content_type() {
        let url = Url::parse("https://api.modrinth.com/v2/version?featured=true").unwrap();
        let mut request = HttpRequest::new(Method::POST, url);
        request.body = RequestBody::from("changelog");

        let http_request = into_http_request(request).await.unwrap();
        assert_eq!(http_request.method(), Method::POST);
        assert_eq!(
            http_request.uri(),
            "https://api.modrinth.com/v2/version?featured=true"
        );
        assert_eq!(http_request.headers()[CONTENT_TYPE], TEXT_CONTENT_TYPE);
    }

    #[tokio::test]
    async fn test_into_http_request_keeps_caller_content_type() {
        let url =
            Url::parse("https://minecraft.curseforge.com/api/projects/1/upload-file").unwrap();
        let mut request = HttpRequest::new(Method::POST, url);
        request
            .headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        request.body = RequestBody::from("{}");

        let http_request = into_http_request(request).await.unwrap();
        assert_eq!(http_request.headers()[CONTENT_TYPE], "application/json");
    }
}

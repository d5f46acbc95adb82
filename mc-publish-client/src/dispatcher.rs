//! The request dispatcher.
//!
//! A [`Dispatcher`] owns a base URL, default headers and a middleware
//! [`Pipeline`] ending in a [`Transport`]. Every instance is independent:
//! middleware registered on one never affects another.
//!
//! # Example
//!
//! ```ignore
//! use mc_publish_client::{Dispatcher, RequestInit};
//! use mc_publish_client::middleware::TimeoutMiddleware;
//!
//! let dispatcher = Dispatcher::builder()
//!     .base_url("https://api.modrinth.com/v2/")
//!     .default_header("user-agent", "mc-publish/3.3")
//!     .with_middleware(TimeoutMiddleware::new(Duration::from_secs(30)))
//!     .build()?;
//!
//! let response = dispatcher.get("project/fabric-api").await?;
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use http::Method;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use url::Url;

use crate::middleware::{HttpResult, Middleware, Pipeline};
use crate::request::{HttpRequest, RequestInit};
use crate::transport::{HyperTransport, Transport};
use crate::{ClientBuildError, ClientError};

type DispatchMiddleware = Arc<dyn Middleware<HttpRequest, HttpResult>>;

/// Dispatches requests through a middleware pipeline to a transport.
pub struct Dispatcher {
    base_url: Option<Url>,
    default_headers: HeaderMap,
    pipeline: Pipeline<HttpRequest, HttpResult>,
}

impl Dispatcher {
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    /// Create a dispatcher from options.
    pub fn new(options: DispatcherOptions) -> Result<Self, ClientBuildError> {
        let DispatcherOptions {
            transport,
            base_url,
            default_headers,
            middleware,
        } = options;

        let transport = match transport {
            Some(transport) => transport,
            None => Arc::new(HyperTransport::new()?),
        };

        let base_url = base_url.as_deref().map(Url::parse).transpose()?;

        let mut pipeline = Pipeline::new(Arc::new(move |request: HttpRequest| {
            transport.send(request)
        }));
        for middleware in middleware {
            pipeline.push_arc(middleware);
        }

        Ok(Self {
            base_url,
            default_headers,
            pipeline,
        })
    }

    /// The process-wide dispatcher, built on first use with default settings.
    ///
    /// It has no base URL, no default headers and no middleware, and is
    /// never modified. Create a dedicated dispatcher to customize any of
    /// those.
    ///
    /// # Panics
    ///
    /// Panics if the default transport cannot be created, which only
    /// happens when the crate is built without TLS support.
    pub fn shared() -> &'static Dispatcher {
        static SHARED: OnceLock<Dispatcher> = OnceLock::new();
        SHARED.get_or_init(|| {
            Dispatcher::builder()
                .build()
                .expect("failed to build the shared dispatcher")
        })
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    pub fn set_base_url(&mut self, base_url: Option<Url>) {
        self.base_url = base_url;
    }

    /// Headers sent with every request unless the call overrides them.
    pub fn default_headers(&self) -> &HeaderMap {
        &self.default_headers
    }

    pub fn default_headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.default_headers
    }

    /// Register a middleware. It runs after every middleware already
    /// registered, starting with the next dispatch.
    pub fn use_middleware<M>(&mut self, middleware: M) -> &mut Self
    where
        M: Middleware<HttpRequest, HttpResult> + 'static,
    {
        self.pipeline.push(middleware);
        self
    }

    pub fn middleware_count(&self) -> usize {
        self.pipeline.len()
    }

    /// Resolve `url` against the base URL, if any.
    pub fn resolve(&self, url: &str) -> Result<Url, ClientError> {
        let resolved = match &self.base_url {
            Some(base) => base.join(url),
            None => Url::parse(url),
        };
        resolved.map_err(|e| ClientError::InvalidUrl(format!("{}: {}", url, e)))
    }

    /// Send a request.
    ///
    /// Default headers are applied first; a header set in `init` replaces
    /// every default value of the same name. Non-2xx responses are returned
    /// as responses, see
    /// [`HttpResponse::error_for_status`](crate::HttpResponse::error_for_status).
    pub async fn dispatch(&self, url: &str, init: RequestInit) -> HttpResult {
        let url = self.resolve(url)?;
        let RequestInit {
            method,
            headers,
            body,
            extensions,
        } = init;

        let mut merged = self.default_headers.clone();
        merged.extend(headers);

        let request = HttpRequest {
            method: method.unwrap_or(Method::GET),
            url,
            headers: merged,
            body,
            extensions,
        };
        self.pipeline.call(request).await
    }

    /// Send a `GET` request.
    pub async fn get(&self, url: &str) -> HttpResult {
        self.dispatch(url, RequestInit::new()).await
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("base_url", &self.base_url.as_ref().map(Url::as_str))
            .field("default_headers", &self.default_headers)
            .field("pipeline", &self.pipeline)
            .finish()
    }
}

/// Options for [`Dispatcher::new`].
#[derive(Default)]
pub struct DispatcherOptions {
    /// Defaults to a [`HyperTransport`].
    pub transport: Option<Arc<dyn Transport>>,
    /// Absolute URL that relative request URLs are resolved against.
    pub base_url: Option<String>,
    pub default_headers: HeaderMap,
    /// Registered in order.
    pub middleware: Vec<DispatchMiddleware>,
}

impl fmt::Debug for DispatcherOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatcherOptions")
            .field("transport", &self.transport.is_some())
            .field("base_url", &self.base_url)
            .field("default_headers", &self.default_headers)
            .field("middleware_count", &self.middleware.len())
            .finish()
    }
}

/// Builder for [`Dispatcher`].
#[derive(Default)]
pub struct DispatcherBuilder {
    options: DispatcherOptions,
    /// Unparsed `default_header` pairs, validated by `build`.
    raw_headers: Vec<(String, String)>,
}

impl DispatcherBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transport<T: Transport + 'static>(mut self, transport: T) -> Self {
        self.options.transport = Some(Arc::new(transport));
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.options.base_url = Some(base_url.into());
        self
    }

    /// Add a default header. Invalid names or values fail `build`.
    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.raw_headers.push((name.into(), value.into()));
        self
    }

    /// Add pre-parsed default headers.
    pub fn default_headers(mut self, headers: HeaderMap) -> Self {
        self.options.default_headers.extend(headers);
        self
    }

    pub fn with_middleware<M>(mut self, middleware: M) -> Self
    where
        M: Middleware<HttpRequest, HttpResult> + 'static,
    {
        self.options.middleware.push(Arc::new(middleware));
        self
    }

    pub fn build(mut self) -> Result<Dispatcher, ClientBuildError> {
        for (name, value) in self.raw_headers {
            let name = HeaderName::from_str(&name)
                .map_err(|_| ClientBuildError::Header(format!("invalid header name: {}", name)))?;
            let value = HeaderValue::from_str(&value)
                .map_err(|_| ClientBuildError::Header(format!("invalid value for {}", name)))?;
            self.options.default_headers.append(name, value);
        }
        Dispatcher::new(self.options)
    }
}

impl fmt::Debug for DispatcherBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatcherBuilder")
            .field("options", &self.options)
            .field("raw_headers", &self.raw_headers.len())
            .finish()
    }
}

/// Where a request goes: its URL and method.
#[derive(Clone, Copy, Debug)]
pub struct Destination<'a> {
    pub url: &'a str,
    /// `None` means `GET`.
    pub method: Option<&'a Method>,
}

impl<'a> Destination<'a> {
    pub fn new(url: &'a str, method: Option<&'a Method>) -> Self {
        Self { url, method }
    }
}

impl PartialEq for Destination<'_> {
    fn eq(&self, other: &Self) -> bool {
        destinations_equal(*self, *other)
    }
}

/// Whether two requests target the same URL with the same method.
///
/// URLs are compared as strings. A missing method counts as `GET`.
pub fn destinations_equal(a: Destination<'_>, b: Destination<'_>) -> bool {
    a.url == b.url && a.method.unwrap_or(&Method::GET) == b.method.unwrap_or(&Method::GET)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::{HttpNext, from_fn};
    use crate::response::HttpResponse;
    use crate::transport::transport_fn;
    use http::StatusCode;
    use http::header::{ACCEPT, USER_AGENT};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// A transport answering with `"{METHOD} {url}"`.
    fn echo() -> impl Transport + 'static {
        transport_fn(|request: HttpRequest| async move {
            Ok(HttpResponse::from_text(
                StatusCode::OK,
                format!("{} {}", request.method, request.url),
            ))
        })
    }

    fn capture(slot: &Arc<Mutex<Option<HeaderMap>>>) -> impl Transport + 'static {
        let slot = slot.clone();
        transport_fn(move |request: HttpRequest| {
            *slot.lock().unwrap() = Some(request.headers.clone());
            async { Ok(HttpResponse::from_bytes(StatusCode::NO_CONTENT, "")) }
        })
    }

    #[test]
    fn test_builder_defaults() {
        let dispatcher = Dispatcher::builder().transport(echo()).build().unwrap();
        assert!(dispatcher.base_url().is_none());
        assert!(dispatcher.default_headers().is_empty());
        assert_eq!(dispatcher.middleware_count(), 0);
    }

    #[cfg(feature = "tls")]
    #[test]
    fn test_shared_is_distinct_from_built_instances() {
        let shared = Dispatcher::shared();
        assert!(std::ptr::eq(shared, Dispatcher::shared()));
        assert!(shared.base_url().is_none());

        let a = Dispatcher::builder().build().unwrap();
        let b = Dispatcher::builder().build().unwrap();
        assert!(!std::ptr::eq(&a, shared));
        assert!(!std::ptr::eq(&a, &b));
    }

    #[test]
    fn test_invalid_base_url() {
        let err = Dispatcher::builder()
            .transport(echo())
            .base_url("not a url")
            .build()
            .unwrap_err();
        assert!(matches!(err, ClientBuildError::BaseUrl(_)));
    }

    #[test]
    fn test_invalid_default_header() {
        let err = Dispatcher::builder()
            .transport(echo())
            .default_header("bad header", "x")
            .build()
            .unwrap_err();
        assert!(matches!(err, ClientBuildError::Header(_)));
    }

    #[tokio::test]
    async fn test_resolve_against_base_url() {
        let mut dispatcher = Dispatcher::builder()
            .transport(echo())
            .base_url("https://api.modrinth.com/v2/")
            .build()
            .unwrap();

        let response = dispatcher.get("project/fabric-api").await.unwrap();
        assert_eq!(
            response.text().await.unwrap(),
            "GET https://api.modrinth.com/v2/project/fabric-api"
        );

        // Absolute URLs ignore the base.
        let response = dispatcher
            .dispatch(
                "https://api.github.com/repos/o/r/releases",
                RequestInit::new().method(Method::POST),
            )
            .await
            .unwrap();
        assert_eq!(
            response.text().await.unwrap(),
            "POST https://api.github.com/repos/o/r/releases"
        );

        dispatcher.set_base_url(None);
        let err = dispatcher.get("project/fabric-api").await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn test_header_merge() {
        let slot = Arc::new(Mutex::new(None));
        let mut dispatcher = Dispatcher::builder()
            .transport(capture(&slot))
            .default_header("user-agent", "mc-publish")
            .default_header("accept", "text/plain")
            .default_header("accept", "application/json")
            .build()
            .unwrap();
        dispatcher
            .default_headers_mut()
            .insert("x-default", HeaderValue::from_static("1"));

        let init = RequestInit::new()
            .header(ACCEPT, HeaderValue::from_static("*/*"));
        dispatcher.dispatch("http://localhost/", init).await.unwrap();

        let headers = slot.lock().unwrap().take().unwrap();
        assert_eq!(headers[USER_AGENT], "mc-publish");
        assert_eq!(headers["x-default"], "1");
        let accept: Vec<_> = headers.get_all(ACCEPT).iter().collect();
        assert_eq!(accept, ["*/*"]);

        // Defaults are not modified by a call.
        assert_eq!(
            dispatcher.default_headers().get_all(ACCEPT).iter().count(),
            2
        );
    }

    #[tokio::test]
    async fn test_middleware_order_and_single_transport_call() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let calls = Arc::new(AtomicU32::new(0));

        let transport = {
            let calls = calls.clone();
            let log = log.clone();
            transport_fn(move |_: HttpRequest| {
                calls.fetch_add(1, Ordering::SeqCst);
                log.lock().unwrap().push("transport");
                async { Ok(HttpResponse::from_text(StatusCode::OK, "ok")) }
            })
        };

        let step = |name: &'static str| {
            let log = log.clone();
            from_fn(move |request: HttpRequest, next: HttpNext| {
                log.lock().unwrap().push(name);
                next.call(request)
            })
        };

        let mut dispatcher = Dispatcher::builder()
            .transport(transport)
            .with_middleware(step("first"))
            .build()
            .unwrap();
        dispatcher.use_middleware(step("second"));
        assert_eq!(dispatcher.middleware_count(), 2);

        dispatcher.get("http://localhost/").await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(*log.lock().unwrap(), ["first", "second", "transport"]);

        // A middleware added later takes effect on the next dispatch.
        dispatcher.use_middleware(step("third"));
        log.lock().unwrap().clear();
        dispatcher.get("http://localhost/").await.unwrap();
        assert_eq!(
            *log.lock().unwrap(),
            ["first", "second", "third", "transport"]
        );
    }

    #[tokio::test]
    async fn test_instances_do_not_share_middleware() {
        let hits = Arc::new(AtomicU32::new(0));
        let counting = {
            let hits = hits.clone();
            from_fn(move |request: HttpRequest, next: HttpNext| {
                hits.fetch_add(1, Ordering::SeqCst);
                next.call(request)
            })
        };

        let mut a = Dispatcher::builder().transport(echo()).build().unwrap();
        let b = Dispatcher::builder().transport(echo()).build().unwrap();
        a.use_middleware(counting);

        b.get("http://localhost/").await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        a.get("http://localhost/").await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_new_with_options() {
        let options = DispatcherOptions {
            transport: Some(Arc::new(echo())),
            base_url: Some("https://minecraft.curseforge.com/api/".into()),
            ..Default::default()
        };
        let dispatcher = Dispatcher::new(options).unwrap();
        let response = dispatcher.get("game/versions").await.unwrap();
        assert_eq!(
            response.text().await.unwrap(),
            "GET https://minecraft.curseforge.com/api/game/versions"
        );
    }

    #[tokio::test]
    async fn test_non_success_is_returned_as_response() {
        let dispatcher = Dispatcher::builder()
            .transport(transport_fn(|_: HttpRequest| async {
                Ok(HttpResponse::from_text(StatusCode::NOT_FOUND, "missing"))
            }))
            .build()
            .unwrap();

        let response = dispatcher.get("http://localhost/").await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.error_for_status().await.is_err());
    }

    #[test]
    fn test_destinations_equal() {
        let post = Method::POST;
        let get = Method::GET;
        let url = "https://api.modrinth.com/v2/version";

        assert!(destinations_equal(
            Destination::new(url, None),
            Destination::new(url, Some(&get))
        ));
        assert!(!destinations_equal(
            Destination::new(url, None),
            Destination::new(url, Some(&post))
        ));
        assert!(!destinations_equal(
            Destination::new(url, Some(&post)),
            Destination::new("https://api.modrinth.com/v2/version/", Some(&post))
        ));
        assert_eq!(
            Destination::new(url, Some(&post)),
            Destination::new(url, Some(&post))
        );
    }
}

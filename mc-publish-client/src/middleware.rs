//! Middleware pipeline.
//!
//! A [`Pipeline`] wraps a terminal target (the transport call) with an
//! ordered list of [`Middleware`]. Each middleware receives the request and a
//! [`Next`] continuation; it may change the request, call `next` any number
//! of times, inspect or replace the result, or return without calling `next`
//! at all.
//!
//! Middleware run in registration order on the way in and in reverse order
//! on the way out.
//!
//! # Example
//!
//! ```ignore
//! use mc_publish_client::middleware::{from_fn, HttpNext};
//!
//! dispatcher.use_middleware(from_fn(|mut request: HttpRequest, next: HttpNext| async move {
//!     request.headers.insert("x-attempt", HeaderValue::from_static("1"));
//!     next.call(request).await
//! }));
//! ```

mod header;
mod timeout;
mod trace;

pub use header::HeaderMiddleware;
pub use timeout::TimeoutMiddleware;
pub use trace::TraceMiddleware;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, OnceLock};

use crate::ClientError;
use crate::request::HttpRequest;
use crate::response::HttpResponse;

/// Type alias for a boxed future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// An async function from request to result.
pub type Handler<Req, Res> = Arc<dyn Fn(Req) -> BoxFuture<'static, Res> + Send + Sync>;

/// Result of a dispatched request.
pub type HttpResult = Result<HttpResponse, ClientError>;

/// Continuation handed to dispatcher middleware.
pub type HttpNext = Next<HttpRequest, HttpResult>;

/// Handler type of a dispatcher pipeline.
pub type HttpHandler = Handler<HttpRequest, HttpResult>;

/// The rest of the chain, from the point of view of one middleware.
pub struct Next<Req, Res> {
    inner: Handler<Req, Res>,
}

impl<Req, Res> Next<Req, Res> {
    pub(crate) fn new(inner: Handler<Req, Res>) -> Self {
        Self { inner }
    }

    /// Run the rest of the chain. May be called more than once.
    pub fn call(&self, request: Req) -> BoxFuture<'static, Res> {
        (self.inner)(request)
    }
}

impl<Req, Res> Clone for Next<Req, Res> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<Req, Res> fmt::Debug for Next<Req, Res> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next").finish_non_exhaustive()
    }
}

/// A stage of a [`Pipeline`].
pub trait Middleware<Req, Res>: Send + Sync {
    fn handle(&self, request: Req, next: Next<Req, Res>) -> BoxFuture<'static, Res>;
}

/// A middleware built from a closure. See [`from_fn`].
#[derive(Clone)]
pub struct FnMiddleware<F> {
    func: F,
}

/// Adapt an async closure into a [`Middleware`].
pub fn from_fn<Req, Res, F, Fut>(func: F) -> FnMiddleware<F>
where
    F: Fn(Req, Next<Req, Res>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Res> + Send + 'static,
{
    FnMiddleware { func }
}

impl<Req, Res, F, Fut> Middleware<Req, Res> for FnMiddleware<F>
where
    F: Fn(Req, Next<Req, Res>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Res> + Send + 'static,
{
    fn handle(&self, request: Req, next: Next<Req, Res>) -> BoxFuture<'static, Res> {
        Box::pin((self.func)(request, next))
    }
}

/// A terminal target wrapped by an ordered list of middleware.
///
/// The composed chain is built lazily on first use and cached; registering
/// more middleware drops the cache.
pub struct Pipeline<Req, Res> {
    target: Handler<Req, Res>,
    middleware: Vec<Arc<dyn Middleware<Req, Res>>>,
    compiled: OnceLock<Handler<Req, Res>>,
}

impl<Req, Res> Pipeline<Req, Res>
where
    Req: Send + 'static,
    Res: Send + 'static,
{
    /// Create a pipeline with no middleware.
    pub fn new(target: Handler<Req, Res>) -> Self {
        Self {
            target,
            middleware: Vec::new(),
            compiled: OnceLock::new(),
        }
    }

    /// Create a pipeline around an async closure.
    pub fn from_target<F, Fut>(target: F) -> Self
    where
        F: Fn(Req) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Res> + Send + 'static,
    {
        Self::new(Arc::new(move |request: Req| -> BoxFuture<'static, Res> {
            Box::pin(target(request))
        }))
    }

    /// Append a middleware. It runs after every middleware already registered.
    pub fn push<M>(&mut self, middleware: M)
    where
        M: Middleware<Req, Res> + 'static,
    {
        self.push_arc(Arc::new(middleware));
    }

    /// Append a shared middleware.
    pub fn push_arc(&mut self, middleware: Arc<dyn Middleware<Req, Res>>) {
        self.middleware.push(middleware);
        self.compiled = OnceLock::new();
    }

    pub fn len(&self) -> usize {
        self.middleware.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
    }

    pub fn target(&self) -> &Handler<Req, Res> {
        &self.target
    }

    /// The composed chain, built on first call and cached.
    ///
    /// With no middleware this is the target itself.
    pub fn compile(&self) -> Handler<Req, Res> {
        self.compiled.get_or_init(|| self.build()).clone()
    }

    fn build(&self) -> Handler<Req, Res> {
        let mut handler = self.target.clone();
        // Wrap from the target outward so the first registered runs first.
        for middleware in self.middleware.iter().rev() {
            let middleware = middleware.clone();
            let next = Next::new(handler);
            handler = Arc::new(move |request: Req| middleware.handle(request, next.clone()));
        }
        handler
    }

    /// Run a request through the chain.
    pub fn call(&self, request: Req) -> BoxFuture<'static, Res> {
        (self.compile())(request)
    }
}

impl<Req, Res> fmt::Debug for Pipeline<Req, Res> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("middleware", &self.middleware.len())
            .field("compiled", &self.compiled.get().is_some())
            .finish()
    }
}

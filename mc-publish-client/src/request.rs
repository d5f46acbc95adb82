//! Request types for the dispatcher.
//!
//! - [`RequestInit`]: What a caller passes to
//!   [`Dispatcher::dispatch`](crate::Dispatcher::dispatch)
//! - [`HttpRequest`]: The resolved request seen by middleware and transports

use std::str::FromStr;

use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::{Extensions, Method};
use mc_publish_core::RequestBody;
use url::Url;

use crate::ClientError;

/// Per-call request options.
///
/// # Example
///
/// ```ignore
/// let init = RequestInit::new()
///     .method(Method::POST)
///     .header(AUTHORIZATION, HeaderValue::from_str(token.unwrap())?)
///     .body(form);
///
/// let response = dispatcher.dispatch("version", init).await?;
/// ```
#[derive(Debug, Default)]
pub struct RequestInit {
    /// HTTP method. `None` means `GET`.
    pub method: Option<Method>,
    pub headers: HeaderMap,
    pub body: RequestBody,
    /// Typed values for middleware, never sent on the wire.
    pub extensions: Extensions,
}

impl RequestInit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Append a header.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Append a header given as strings, validating both.
    pub fn try_header(self, name: &str, value: &str) -> Result<Self, ClientError> {
        let name = HeaderName::from_str(name)
            .map_err(|e| ClientError::InvalidHeader(format!("{}: {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ClientError::InvalidHeader(format!("{}: {}", name, e)))?;
        Ok(self.header(name, value))
    }

    /// Append every header of `headers`.
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        let mut current = None;
        for (name, value) in headers {
            if let Some(name) = name {
                current = Some(name);
            }
            if let Some(name) = &current {
                self.headers.append(name.clone(), value);
            }
        }
        self
    }

    pub fn body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = body.into();
        self
    }

    /// Attach a typed value for middleware.
    pub fn extension<T>(mut self, value: T) -> Self
    where
        T: Clone + Send + Sync + 'static,
    {
        self.extensions.insert(value);
        self
    }

    /// The effective method.
    pub fn effective_method(&self) -> &Method {
        static GET: Method = Method::GET;
        self.method.as_ref().unwrap_or(&GET)
    }
}

/// A fully resolved request.
#[derive(Debug)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: RequestBody,
    pub extensions: Extensions,
}

impl HttpRequest {
    /// Create a bodiless request.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
            extensions: Extensions::new(),
        }
    }

    /// Copy the request, if its body can be replayed.
    pub fn try_clone(&self) -> Option<Self> {
        Some(Self {
            method: self.method.clone(),
            url: self.url.clone(),
            headers: self.headers.clone(),
            body: self.body.try_clone()?,
            extensions: self.extensions.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::{AUTHORIZATION, USER_AGENT};

    #[derive(Clone, Debug, PartialEq)]
    struct Attempt(u32);

    #[test]
    fn test_request_init_builder() {
        let init = RequestInit::new()
            .method(Method::POST)
            .header(USER_AGENT, HeaderValue::from_static("mc-publish"))
            .try_header("X-Api-Key", "abc")
            .unwrap()
            .body("payload")
            .extension(Attempt(1));

        assert_eq!(*init.effective_method(), Method::POST);
        assert_eq!(init.headers[USER_AGENT], "mc-publish");
        assert_eq!(init.headers["x-api-key"], "abc");
        assert!(matches!(init.body, RequestBody::Text(ref t) if t == "payload"));
        assert_eq!(init.extensions.get::<Attempt>(), Some(&Attempt(1)));
    }

    #[test]
    fn test_default_method_is_get() {
        assert_eq!(*RequestInit::new().effective_method(), Method::GET);
    }

    #[test]
    fn test_try_header_rejects_invalid() {
        let err = RequestInit::new().try_header("bad header", "x").unwrap_err();
        assert!(matches!(err, ClientError::InvalidHeader(_)));

        let err = RequestInit::new()
            .try_header("x-ok", "line\nbreak")
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidHeader(_)));
    }

    #[test]
    fn test_headers_keep_multiple_values() {
        let mut extra = HeaderMap::new();
        extra.append("x-tag", HeaderValue::from_static("a"));
        extra.append("x-tag", HeaderValue::from_static("b"));

        let init = RequestInit::new().headers(extra);
        let tags: Vec<_> = init.headers.get_all("x-tag").iter().collect();
        assert_eq!(tags, ["a", "b"]);
    }

    #[test]
    fn test_try_clone() {
        let url = Url::parse("https://api.modrinth.com/v2/version").unwrap();
        let mut request = HttpRequest::new(Method::POST, url);
        request
            .headers
            .insert(AUTHORIZATION, HeaderValue::from_static("token"));
        request.body = RequestBody::from("{}");

        let copy = request.try_clone().unwrap();
        assert_eq!(copy.method, Method::POST);
        assert_eq!(copy.url.as_str(), "https://api.modrinth.com/v2/version");
        assert_eq!(copy.headers[AUTHORIZATION], "token");

        request.body = RequestBody::stream(futures::stream::empty());
        assert!(request.try_clone().is_none());
    }
}

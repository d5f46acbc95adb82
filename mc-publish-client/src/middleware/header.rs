use std::str::FromStr;

use http::header::{HeaderName, HeaderValue};

use super::{BoxFuture, HttpNext, HttpResult, Middleware};
use crate::ClientError;
use crate::request::HttpRequest;

/// Sets a header on every request that does not already carry it.
///
/// # Example
///
/// ```ignore
/// use mc_publish_client::middleware::HeaderMiddleware;
///
/// dispatcher.use_middleware(HeaderMiddleware::try_new("user-agent", "mc-publish/3.3")?);
/// ```
#[derive(Clone, Debug)]
pub struct HeaderMiddleware {
    name: HeaderName,
    value: HeaderValue,
}

impl HeaderMiddleware {
    /// Create a header middleware from pre-parsed values.
    pub fn from_parts(name: HeaderName, value: HeaderValue) -> Self {
        Self { name, value }
    }

    /// Create a header middleware, validating name and value.
    pub fn try_new(name: &str, value: &str) -> Result<Self, ClientError> {
        let name = HeaderName::from_str(name)
            .map_err(|_| ClientError::InvalidHeader(format!("invalid header name: {}", name)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| ClientError::InvalidHeader(format!("invalid value for {}", name)))?;
        Ok(Self { name, value })
    }
}

impl Middleware<HttpRequest, HttpResult> for HeaderMiddleware {
    fn handle(&self, mut request: HttpRequest, next: HttpNext) -> BoxFuture<'static, HttpResult> {
        if !request.headers.contains_key(&self.name) {
            request
                .headers
                .insert(self.name.clone(), self.value.clone());
        }
        next.call(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::Pipeline;
    use crate::response::HttpResponse;
    use http::{Method, StatusCode};
    use url::Url;

    fn echo_header(name: &'static str) -> Pipeline<HttpRequest, HttpResult> {
        Pipeline::from_target(move |request: HttpRequest| async move {
            let value = request
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_owned();
            Ok(HttpResponse::from_text(StatusCode::OK, value))
        })
    }

    fn request() -> HttpRequest {
        HttpRequest::new(Method::GET, Url::parse("http://localhost/").unwrap())
    }

    #[tokio::test]
    async fn test_header_added_when_missing() {
        let mut pipeline = echo_header("x-client");
        pipeline.push(HeaderMiddleware::try_new("x-client", "mc-publish").unwrap());

        let response = pipeline.call(request()).await.unwrap();
        assert_eq!(response.text().await.unwrap(), "mc-publish");
    }

    #[tokio::test]
    async fn test_existing_header_kept() {
        let mut pipeline = echo_header("x-client");
        pipeline.push(HeaderMiddleware::try_new("x-client", "mc-publish").unwrap());

        let mut request = request();
        request
            .headers
            .insert("x-client", HeaderValue::from_static("custom"));
        let response = pipeline.call(request).await.unwrap();
        assert_eq!(response.text().await.unwrap(), "custom");
    }

    #[test]
    fn test_try_new_invalid() {
        assert!(HeaderMiddleware::try_new("bad name", "x").is_err());
        assert!(HeaderMiddleware::try_new("x-ok", "bad\r\nvalue").is_err());
    }
}

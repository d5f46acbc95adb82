use std::time::Duration;

use mc_publish_core::Recoverability;

use super::{BoxFuture, HttpNext, HttpResult, Middleware};
use crate::ClientError;
use crate::request::HttpRequest;

/// Fails a request that does not complete within a deadline.
///
/// The deadline covers the rest of the chain, including any later middleware.
/// Timeouts are hard errors unless [`soft`](Self::soft) is set, in which case
/// the retry engine treats them as recoverable.
#[derive(Clone, Copy, Debug)]
pub struct TimeoutMiddleware {
    after: Duration,
    recoverability: Recoverability,
}

impl TimeoutMiddleware {
    pub fn new(after: Duration) -> Self {
        Self {
            after,
            recoverability: Recoverability::Fatal,
        }
    }

    /// Mark timeouts as recoverable.
    pub fn soft(mut self) -> Self {
        self.recoverability = Recoverability::Recoverable;
        self
    }

    pub fn duration(&self) -> Duration {
        self.after
    }
}

impl Middleware<HttpRequest, HttpResult> for TimeoutMiddleware {
    fn handle(&self, request: HttpRequest, next: HttpNext) -> BoxFuture<'static, HttpResult> {
        let Self {
            after,
            recoverability,
        } = *self;

        Box::pin(async move {
            match tokio::time::timeout(after, next.call(request)).await {
                Ok(result) => result,
                Err(_) => Err(ClientError::Timeout {
                    after,
                    recoverability,
                }),
            }
        })
    }
}

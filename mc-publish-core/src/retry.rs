//! Bounded retry loop for async operations.
//!
//! [`retry_with`] turns any fallible async operation into a sequential retry
//! loop with a fixed delay between attempts.
//!
//! # Recoverability
//!
//! After a failed attempt the loop asks, in order:
//! 1. Is the attempt budget exhausted? Then the error is returned unchanged.
//! 2. Does the `on_error` hook return a verdict? Then that verdict decides.
//! 3. Otherwise the error's own marker ([`Classify::recoverability`]) decides.
//!    Errors without a marker are not retried.
//!
//! # Example
//!
//! ```ignore
//! use mc_publish_core::{RetryOptions, retry_with};
//! use std::time::Duration;
//!
//! let options = RetryOptions::new()
//!     .max_attempts(3)
//!     .delay(Duration::from_secs(5));
//!
//! let version = retry_with(options, || api.create_version(&request)).await?;
//! ```

use std::fmt;
use std::future::Future;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Classify, Recoverability};

/// Default configuration values.
pub mod defaults {
    use std::time::Duration;

    /// Default delay between attempts.
    pub const DELAY: Duration = Duration::ZERO;

    /// Default attempt budget for uploads.
    pub const UPLOAD_ATTEMPTS: u32 = 2;

    /// Default delay between upload attempts.
    pub const UPLOAD_DELAY: Duration = Duration::from_secs(10);
}

/// Hook called with every error that is still within the attempt budget.
///
/// Returning `Some` overrides the error's own marker; `None` defers to it.
pub type OnError<'a, E> = Box<dyn FnMut(&E, u32) -> Option<Recoverability> + Send + 'a>;

/// Configuration for [`retry_with`].
pub struct RetryOptions<'a, E> {
    /// Delay between a failed attempt and the next one.
    pub delay: Duration,
    /// Maximum number of attempts, counting the first. `None` is unbounded.
    pub max_attempts: Option<u32>,
    on_error: Option<OnError<'a, E>>,
}

impl<E> Default for RetryOptions<'_, E> {
    fn default() -> Self {
        Self {
            delay: defaults::DELAY,
            max_attempts: None,
            on_error: None,
        }
    }
}

impl<E> fmt::Debug for RetryOptions<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryOptions")
            .field("delay", &self.delay)
            .field("max_attempts", &self.max_attempts)
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

impl<'a, E> RetryOptions<'a, E> {
    /// Create options with no delay and no attempt limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the delay between attempts.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Limit the number of attempts. `1` means a single attempt, no retries.
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Retry until a non-recoverable error occurs.
    pub fn unbounded(mut self) -> Self {
        self.max_attempts = None;
        self
    }

    /// Install the error hook.
    pub fn on_error<F>(mut self, hook: F) -> Self
    where
        F: FnMut(&E, u32) -> Option<Recoverability> + Send + 'a,
    {
        self.on_error = Some(Box::new(hook));
        self
    }

    fn has_attempts_left(&self, attempts: u32) -> bool {
        self.max_attempts.is_none_or(|max| attempts < max)
    }
}

/// Serializable retry configuration, e.g. loaded from a workflow file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Maximum number of attempts. Negative values mean unbounded.
    pub attempts: i64,
    /// Delay between attempts, in milliseconds.
    pub delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            attempts: i64::from(defaults::UPLOAD_ATTEMPTS),
            delay_ms: defaults::UPLOAD_DELAY.as_millis() as u64,
        }
    }
}

impl RetrySettings {
    /// The attempt limit, `None` when unbounded.
    pub fn max_attempts(&self) -> Option<u32> {
        u32::try_from(self.attempts).ok()
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Convert into [`RetryOptions`].
    pub fn options<'a, E>(&self) -> RetryOptions<'a, E> {
        RetryOptions {
            delay: self.delay(),
            max_attempts: self.max_attempts(),
            on_error: None,
        }
    }
}

/// Retry `operation` with default options: no delay, unbounded attempts,
/// recoverability taken from the error itself.
pub async fn retry<F, Fut, T, E>(operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Classify + fmt::Display,
{
    retry_with(RetryOptions::default(), operation).await
}

/// Retry `operation` according to `options`.
///
/// Attempts run strictly one after another. A successful attempt returns
/// immediately; a non-recoverable error is returned as-is, without wrapping.
pub async fn retry_with<F, Fut, T, E>(
    mut options: RetryOptions<'_, E>,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Classify + fmt::Display,
{
    let mut attempts: u32 = 0;

    loop {
        attempts = attempts.saturating_add(1);

        let error = match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        if !options.has_attempts_left(attempts) {
            return Err(error);
        }

        let verdict = options
            .on_error
            .as_mut()
            .and_then(|hook| hook(&error, attempts))
            .or_else(|| error.recoverability());

        if verdict != Some(Recoverability::Recoverable) {
            return Err(error);
        }

        tracing::debug!(
            error = %error,
            attempt = attempts,
            delay_ms = options.delay.as_millis() as u64,
            "retrying after recoverable error"
        );

        if !options.delay.is_zero() {
            tokio::time::sleep(options.delay).await;
        }
    }
}

//! Soft/hard error tagging.
//!
//! This module provides the recoverability vocabulary shared by every layer:
//! - [`Recoverability`]: Whether retrying a failed operation may help
//! - [`Classify`]: Implemented by errors that know their own recoverability
//! - [`SoftError`]: A general-purpose error carrying an explicit marker

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

/// Whether a failure is transient ("soft") or permanent ("hard").
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Recoverability {
    /// Retrying may succeed (rate limits, server errors, dropped connections).
    Recoverable,
    /// Retrying is futile (bad request, missing permissions, invalid input).
    Fatal,
}

impl Recoverability {
    /// Build from a plain `is_soft` flag.
    pub fn from_soft(is_soft: bool) -> Self {
        if is_soft {
            Recoverability::Recoverable
        } else {
            Recoverability::Fatal
        }
    }

    pub fn is_recoverable(&self) -> bool {
        matches!(self, Recoverability::Recoverable)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Recoverability::Recoverable => "recoverable",
            Recoverability::Fatal => "fatal",
        }
    }
}

impl fmt::Display for Recoverability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can report whether retrying them is worthwhile.
///
/// `None` means the error carries no marker at all. Such "plain" errors are
/// treated as hard by the retry engine.
pub trait Classify {
    fn recoverability(&self) -> Option<Recoverability>;

    /// Returns true only for errors explicitly marked recoverable.
    fn is_soft(&self) -> bool {
        matches!(self.recoverability(), Some(Recoverability::Recoverable))
    }
}

impl<T: Classify + ?Sized> Classify for &T {
    fn recoverability(&self) -> Option<Recoverability> {
        (**self).recoverability()
    }
}

impl<T: Classify + ?Sized> Classify for Box<T> {
    fn recoverability(&self) -> Option<Recoverability> {
        (**self).recoverability()
    }
}

impl Classify for std::io::Error {
    fn recoverability(&self) -> Option<Recoverability> {
        None
    }
}

/// An error with an explicit soft/hard marker.
///
/// Used for failures that are not HTTP responses but still need to steer the
/// retry engine, e.g. a platform rejecting a file before any request is made.
#[derive(Clone, Debug, thiserror::Error)]
#[error("{message}")]
pub struct SoftError {
    message: String,
    recoverability: Recoverability,
    #[source]
    source: Option<Arc<dyn StdError + Send + Sync>>,
}

impl SoftError {
    pub fn new<S: Into<String>>(message: S, recoverability: Recoverability) -> Self {
        Self {
            message: message.into(),
            recoverability,
            source: None,
        }
    }

    /// Create an error that is worth retrying.
    pub fn recoverable<S: Into<String>>(message: S) -> Self {
        Self::new(message, Recoverability::Recoverable)
    }

    /// Create an error that must not be retried.
    pub fn fatal<S: Into<String>>(message: S) -> Self {
        Self::new(message, Recoverability::Fatal)
    }

    /// Attach the underlying cause.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        self.source = Some(Arc::new(source));
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Classify for SoftError {
    fn recoverability(&self) -> Option<Recoverability> {
        Some(self.recoverability)
    }
}

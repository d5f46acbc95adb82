//! Leveled logging seam for uploaders.
//!
//! Uploaders report progress through a [`Logger`] so that the host (a CI
//! action, a CLI, a test) decides where messages go. [`TracingLogger`]
//! forwards every level to `tracing`.

use std::sync::Arc;

/// A leveled message sink.
pub trait Logger: Send + Sync {
    /// An unrecoverable failure of the whole run.
    fn fatal(&self, message: &str);
    fn error(&self, message: &str);
    fn warn(&self, message: &str);
    fn info(&self, message: &str);
    fn debug(&self, message: &str);
}

impl<T: Logger + ?Sized> Logger for &T {
    fn fatal(&self, message: &str) {
        (**self).fatal(message)
    }

    fn error(&self, message: &str) {
        (**self).error(message)
    }

    fn warn(&self, message: &str) {
        (**self).warn(message)
    }

    fn info(&self, message: &str) {
        (**self).info(message)
    }

    fn debug(&self, message: &str) {
        (**self).debug(message)
    }
}

impl<T: Logger + ?Sized> Logger for Arc<T> {
    fn fatal(&self, message: &str) {
        (**self).fatal(message)
    }

    fn error(&self, message: &str) {
        (**self).error(message)
    }

    fn warn(&self, message: &str) {
        (**self).warn(message)
    }

    fn info(&self, message: &str) {
        (**self).info(message)
    }

    fn debug(&self, message: &str) {
        (**self).debug(message)
    }
}

/// Forwards messages to the `tracing` macros of the same level.
///
/// `tracing` has no fatal level; fatal messages become errors with a
/// `fatal = true` field.
#[derive(Clone, Debug, Default)]
pub struct TracingLogger {
    source: Option<&'static str>,
}

impl TracingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag every event with a `source` field, e.g. the platform name.
    pub fn with_source(source: &'static str) -> Self {
        Self {
            source: Some(source),
        }
    }

    fn source(&self) -> &'static str {
        self.source.unwrap_or("mc-publish")
    }
}

impl Logger for TracingLogger {
    fn fatal(&self, message: &str) {
        tracing::error!(source = self.source(), fatal = true, "{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!(source = self.source(), "{}", message);
    }

    fn warn(&self, message: &str) {
        tracing::warn!(source = self.source(), "{}", message);
    }

    fn info(&self, message: &str) {
        tracing::info!(source = self.source(), "{}", message);
    }

    fn debug(&self, message: &str) {
        tracing::debug!(source = self.source(), "{}", message);
    }
}

/// Discards every message.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullLogger;

impl Logger for NullLogger {
    fn fatal(&self, _: &str) {}
    fn error(&self, _: &str) {}
    fn warn(&self, _: &str) {}
    fn info(&self, _: &str) {}
    fn debug(&self, _: &str) {}
}

/// A logger that keeps every message, for tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingLogger {
    entries: std::sync::Mutex<Vec<(&'static str, String)>>,
}

#[cfg(test)]
impl RecordingLogger {
    fn push(&self, level: &'static str, message: &str) {
        self.entries
            .lock()
            .unwrap()
            .push((level, message.to_owned()));
    }

    /// Every `(level, message)` pair in order.
    pub(crate) fn entries(&self) -> Vec<(&'static str, String)> {
        self.entries.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, level: &str) -> usize {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, _)| *l == level)
            .count()
    }
}

#[cfg(test)]
impl Logger for RecordingLogger {
    fn fatal(&self, message: &str) {
        self.push("fatal", message);
    }
    fn error(&self, message: &str) {
        self.push("error", message);
    }
    fn warn(&self, message: &str) {
        self.push("warn", message);
    }
    fn info(&self, message: &str) {
        self.push("info", message);
    }
    fn debug(&self, message: &str) {
        self.push("debug", message);
    }
}

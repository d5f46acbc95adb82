//! File references used as multi-part attachments.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use serde::Deserialize;

/// A file on disk, optionally carrying the name it should be published under.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct FileRef {
    path: PathBuf,
    #[serde(default)]
    name: Option<String>,
}

impl FileRef {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            name: None,
        }
    }

    /// Publish the file under `name` instead of its on-disk file name.
    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The human-readable file name: the explicit name when set, otherwise
    /// the last path component.
    pub fn name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .or_else(|| self.path.file_name().and_then(|n| n.to_str()))
    }

    /// Guess the media type from the file extension.
    pub fn content_type(&self) -> &'static str {
        let ext = self
            .name()
            .and_then(|n| Path::new(n).extension())
            .or_else(|| self.path.extension())
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("jar") => "application/java-archive",
            Some("zip") => "application/zip",
            Some("json") => "application/json",
            Some("txt") => "text/plain",
            Some("md") => "text/markdown",
            _ => "application/octet-stream",
        }
    }

    /// Read the whole file.
    pub async fn read(&self) -> std::io::Result<Bytes> {
        tokio::fs::read(&self.path).await.map(Bytes::from)
    }
}

impl From<PathBuf> for FileRef {
    fn from(path: PathBuf) -> Self {
        Self::new(path)
    }
}

impl From<&Path> for FileRef {
    fn from(path: &Path) -> Self {
        Self::new(path)
    }
}

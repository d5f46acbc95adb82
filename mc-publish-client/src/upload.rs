//! Upload template shared by platform uploaders.
//!
//! A platform implements [`Uploader::upload_core`] for a single attempt;
//! [`Uploader::upload`] wraps it in the retry engine, logs each failure and
//! retries recoverable ones.
//!
//! # Example
//!
//! ```ignore
//! struct ModrinthUploader { dispatcher: Dispatcher, logger: TracingLogger }
//!
//! impl Uploader for ModrinthUploader {
//!     type Report = VersionReport;
//!     type Error = ClientError;
//!
//!     fn platform(&self) -> Platform { Platform::Modrinth }
//!     fn logger(&self) -> &dyn Logger { &self.logger }
//!
//!     async fn upload_core(&self, request: &UploadRequest) -> Result<VersionReport, ClientError> {
//!         let response = self.dispatcher.dispatch("version", init).await?;
//!         response.error_for_status().await?.json().await
//!     }
//! }
//!
//! let report = uploader.upload(&request).await?;
//! ```

use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use mc_publish_core::{Classify, FileRef, RetrySettings, Secret, defaults, retry_with};
use serde::{Deserialize, Deserializer};

use crate::log::Logger;

/// A publishing target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Modrinth,
    CurseForge,
    GitHub,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Modrinth, Platform::CurseForge, Platform::GitHub];

    /// The lowercase identifier used in configuration, e.g. `"curseforge"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Modrinth => "modrinth",
            Platform::CurseForge => "curseforge",
            Platform::GitHub => "github",
        }
    }

    /// The human-readable name, e.g. `"CurseForge"`.
    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::Modrinth => "Modrinth",
            Platform::CurseForge => "CurseForge",
            Platform::GitHub => "GitHub",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown platform: {0}")]
pub struct UnknownPlatform(pub String);

impl FromStr for Platform {
    type Err = UnknownPlatform;

    /// Parse an identifier, ignoring ASCII case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Platform::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownPlatform(s.to_owned()))
    }
}

/// Everything an upload needs besides platform-specific metadata.
#[derive(Clone, Debug, Deserialize)]
pub struct UploadRequest {
    /// API token for the platform.
    pub credentials: Secret,
    #[serde(default)]
    pub files: Vec<FileRef>,
    /// Attempts for the whole upload, counting the first. Defaults to 2;
    /// a negative value retries until a hard failure.
    #[serde(default)]
    pub retry_attempts: Option<i64>,
    /// Delay between attempts. Deserialized from `retry_delay_ms`.
    #[serde(
        rename = "retry_delay_ms",
        default = "default_retry_delay",
        deserialize_with = "deserialize_millis"
    )]
    pub retry_delay: Duration,
}

impl UploadRequest {
    pub fn new(credentials: impl Into<Secret>) -> Self {
        Self {
            credentials: credentials.into(),
            files: Vec::new(),
            retry_attempts: None,
            retry_delay: defaults::UPLOAD_DELAY,
        }
    }

    pub fn files(mut self, files: impl IntoIterator<Item = FileRef>) -> Self {
        self.files.extend(files);
        self
    }

    pub fn retry_attempts(mut self, attempts: i64) -> Self {
        self.retry_attempts = Some(attempts);
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// The attempt budget, with the default applied. `None` is unbounded.
    pub fn max_attempts(&self) -> Option<u32> {
        self.retry_settings().max_attempts()
    }

    /// The retry configuration of this upload.
    pub fn retry_settings(&self) -> RetrySettings {
        let default_attempts = i64::from(defaults::UPLOAD_ATTEMPTS);
        let attempts = self.retry_attempts.unwrap_or(default_attempts);
        let delay_ms: u64 = self.retry_delay.as_millis().try_into().unwrap_or(u64::MAX);
        RetrySettings { attempts, delay_ms }
    }
}

fn default_retry_delay() -> Duration {
    defaults::UPLOAD_DELAY
}

fn deserialize_millis<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    u64::deserialize(deserializer).map(Duration::from_millis)
}

/// A platform uploader.
pub trait Uploader: Sync {
    /// What a successful upload reports back.
    type Report: Send;
    type Error: Classify + fmt::Display + Send;

    fn platform(&self) -> Platform;

    fn logger(&self) -> &dyn Logger;

    /// Perform one upload attempt.
    fn upload_core(
        &self,
        request: &UploadRequest,
    ) -> impl Future<Output = Result<Self::Report, Self::Error>> + Send;

    /// Upload with retries.
    ///
    /// Every failed attempt is logged at error level. A recoverable failure
    /// with attempts left is retried after `request.retry_delay`, with an
    /// info line announcing the retry; any other failure is returned as-is.
    fn upload(
        &self,
        request: &UploadRequest,
    ) -> impl Future<Output = Result<Self::Report, Self::Error>> + Send {
        async move {
            let logger = self.logger();
            let platform = self.platform();

            let options = request
                .retry_settings()
                .options()
                .delay(request.retry_delay)
                .on_error(move |error: &Self::Error, _| {
                    if error.is_soft() {
                        logger.info(&format!("Retrying to upload assets to {}", platform));
                    }
                    None
                });

            retry_with(options, move || async move {
                let result = self.upload_core(request).await;
                if let Err(error) = &result {
                    logger.error(&error.to_string());
                }
                result
            })
            .await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::RecordingLogger;
    use mc_publish_core::SoftError;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails with the scripted errors in order, then succeeds.
    struct Scripted {
        failures: Vec<SoftError>,
        calls: AtomicU32,
        logger: RecordingLogger,
    }

    impl Scripted {
        fn new(failures: Vec<SoftError>) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
                logger: RecordingLogger::default(),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Uploader for Scripted {
        type Report = &'static str;
        type Error = SoftError;

        fn platform(&self) -> Platform {
            Platform::Modrinth
        }

        fn logger(&self) -> &dyn Logger {
            &self.logger
        }

        async fn upload_core(&self, _: &UploadRequest) -> Result<&'static str, SoftError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
            match self.failures.get(n) {
                Some(error) => Err(error.clone()),
                None => Ok("uploaded"),
            }
        }
    }

    fn request(attempts: i64) -> UploadRequest {
        UploadRequest::new("token")
            .retry_attempts(attempts)
            .retry_delay(Duration::ZERO)
    }

    #[tokio::test]
    async fn test_soft_failures_then_success() {
        let uploader = Scripted::new(vec![
            SoftError::recoverable("503 (Service Unavailable)"),
            SoftError::recoverable("502 (Bad Gateway)"),
        ]);

        let report = uploader.upload(&request(3)).await.unwrap();
        assert_eq!(report, "uploaded");
        assert_eq!(uploader.calls(), 3);
        assert!(uploader.logger.count("error") >= 2);
        assert_eq!(uploader.logger.count("info"), 2);

        let entries = uploader.logger.entries();
        assert_eq!(entries[0].1, "503 (Service Unavailable)");
        assert_eq!(entries[1].1, "Retrying to upload assets to Modrinth");
    }

    #[tokio::test]
    async fn test_hard_failure_aborts() {
        let uploader = Scripted::new(vec![SoftError::fatal("401 (Unauthorized)")]);

        let err = uploader.upload(&request(5)).await.unwrap_err();
        assert_eq!(err.message(), "401 (Unauthorized)");
        assert_eq!(uploader.calls(), 1);
        assert_eq!(uploader.logger.count("error"), 1);
        assert_eq!(uploader.logger.count("info"), 0);
    }

    #[tokio::test]
    async fn test_exhausted_returns_last_error() {
        let uploader = Scripted::new(vec![
            SoftError::recoverable("first"),
            SoftError::recoverable("second"),
        ]);

        let err = uploader.upload(&request(2)).await.unwrap_err();
        assert_eq!(err.message(), "second");
        assert_eq!(uploader.calls(), 2);
        assert_eq!(uploader.logger.count("error"), 2);
        assert_eq!(uploader.logger.count("info"), 1);
    }

    #[tokio::test]
    async fn test_unbounded_retries_until_hard_failure() {
        let mut failures = vec![SoftError::recoverable("502 (Bad Gateway)"); 5];
        failures.push(SoftError::fatal("400 (Bad Request)"));
        let uploader = Scripted::new(failures);

        let err = uploader.upload(&request(-1)).await.unwrap_err();
        assert_eq!(err.message(), "400 (Bad Request)");
        assert_eq!(uploader.calls(), 6);
        assert_eq!(uploader.logger.count("error"), 6);
        assert_eq!(uploader.logger.count("info"), 5);
    }

    #[test]
    fn test_platform_names() {
        assert_eq!(Platform::CurseForge.as_str(), "curseforge");
        assert_eq!(Platform::GitHub.to_string(), "GitHub");
        assert_eq!("Modrinth".parse::<Platform>().unwrap(), Platform::Modrinth);
        assert_eq!("github".parse::<Platform>().unwrap(), Platform::GitHub);
        assert!("hangar".parse::<Platform>().is_err());

        let platform: Platform = serde_json::from_str(r#""curseforge""#).unwrap();
        assert_eq!(platform, Platform::CurseForge);
    }

    #[test]
    fn test_upload_request_from_json() {
        let request: UploadRequest = serde_json::from_str(
            r#"{
                "credentials": "secret-token",
                "files": [{ "path": "build/libs/mod.jar" }],
                "retry_attempts": 4,
                "retry_delay_ms": 1500
            }"#,
        )
        .unwrap();

        assert_eq!(request.credentials.unwrap(), "secret-token");
        assert_eq!(request.files[0].name(), Some("mod.jar"));
        assert_eq!(request.max_attempts(), Some(4));
        assert_eq!(request.retry_delay, Duration::from_millis(1500));
        assert!(!format!("{:?}", request).contains("secret-token"));
    }

    #[test]
    fn test_upload_request_defaults() {
        let request: UploadRequest = serde_json::from_str(r#"{ "credentials": "t" }"#).unwrap();
        assert!(request.files.is_empty());
        assert_eq!(request.max_attempts(), Some(2));
        assert_eq!(request.retry_delay, Duration::from_secs(10));
    }

    #[test]
    fn test_negative_attempts_are_unbounded() {
        let json = r#"{ "credentials": "t", "retry_attempts": -1 }"#;
        let request: UploadRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.retry_attempts, Some(-1));
        assert_eq!(request.max_attempts(), None);

        let settings = request.retry_settings();
        assert_eq!(settings.attempts, -1);
        assert_eq!(settings.delay_ms, 10_000);
    }
}

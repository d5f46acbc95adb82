//! TLS connector setup for the hyper client.
//!
//! TLS needs both a crypto provider and root certificates:
//!
//! - `tls-ring` selects the ring provider. Without it, a provider installed
//!   via `CryptoProvider::install_default()` is used.
//! - `tls-native-roots` loads the system store, `tls-webpki-roots` the bundled
//!   Mozilla roots. Native roots win when both are enabled.

use std::sync::Arc;

use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::HttpConnector;
use rustls::ClientConfig;

use crate::ClientBuildError;

/// Returns true if both a crypto provider and root certificates are compiled in.
#[inline]
pub const fn has_tls_support() -> bool {
    cfg!(feature = "tls-ring")
        && cfg!(any(feature = "tls-native-roots", feature = "tls-webpki-roots"))
}

/// Config builder for the feature-selected provider, falling back to the
/// process-wide default.
#[cfg_attr(
    not(any(feature = "tls-native-roots", feature = "tls-webpki-roots")),
    allow(dead_code)
)]
fn crypto_provider_builder() -> Option<rustls::ConfigBuilder<ClientConfig, rustls::WantsVerifier>> {
    #[cfg(feature = "tls-ring")]
    let provider = Some(Arc::new(rustls::crypto::ring::default_provider()));

    #[cfg(not(feature = "tls-ring"))]
    let provider = rustls::crypto::CryptoProvider::get_default().cloned();

    ClientConfig::builder_with_provider(provider?)
        .with_safe_default_protocol_versions()
        .ok()
}

/// Build the default TLS configuration.
///
/// Returns `None` if no crypto provider is available.
#[cfg(any(feature = "tls-native-roots", feature = "tls-webpki-roots"))]
pub fn default_tls_config() -> Option<ClientConfig> {
    let builder = crypto_provider_builder()?;
    Some(
        builder
            .with_root_certificates(build_root_store())
            .with_no_client_auth(),
    )
}

#[cfg(any(feature = "tls-native-roots", feature = "tls-webpki-roots"))]
fn build_root_store() -> rustls::RootCertStore {
    let mut roots = rustls::RootCertStore::empty();

    #[cfg(feature = "tls-native-roots")]
    {
        let native_certs = rustls_native_certs::load_native_certs();
        if !native_certs.errors.is_empty() {
            // Some certificates may still have loaded.
            tracing::debug!("errors loading native certs: {:?}", native_certs.errors);
        }
        roots.add_parsable_certificates(native_certs.certs);
    }

    #[cfg(all(feature = "tls-webpki-roots", not(feature = "tls-native-roots")))]
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    roots
}

/// Build a connector for both `https` and plain `http` URLs.
///
/// Without `tls_config`, the default configuration is used; this fails when
/// no root certificate feature is enabled or no crypto provider is available.
pub fn build_https_connector(
    tls_config: Option<ClientConfig>,
) -> Result<HttpsConnector<HttpConnector>, ClientBuildError> {
    let config = match tls_config {
        Some(config) => config,
        None => default_config()?,
    };

    Ok(HttpsConnectorBuilder::new()
        .with_tls_config(config)
        .https_or_http()
        .enable_all_versions()
        .build())
}

#[cfg(any(feature = "tls-native-roots", feature = "tls-webpki-roots"))]
fn default_config() -> Result<ClientConfig, ClientBuildError> {
    default_tls_config().ok_or_else(|| {
        ClientBuildError::Transport(
            "HTTPS requires a crypto provider: enable `tls-ring` or install a global \
             provider via `CryptoProvider::install_default()`"
                .into(),
        )
    })
}

#[cfg(not(any(feature = "tls-native-roots", feature = "tls-webpki-roots")))]
fn default_config() -> Result<ClientConfig, ClientBuildError> {
    Err(ClientBuildError::Transport(
        "HTTPS requires root certificates: enable `tls-native-roots` or `tls-webpki-roots`, \
         or pass a TLS config"
            .into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(all(
        feature = "tls-ring",
        any(feature = "tls-native-roots", feature = "tls-webpki-roots")
    ))]
    #[test]
    fn test_default_tls_config() {
        assert!(has_tls_support());
        let config = default_tls_config().expect("should build with features enabled");
        assert!(config.alpn_protocols.is_empty());
    }

    #[cfg(all(
        feature = "tls-ring",
        any(feature = "tls-native-roots", feature = "tls-webpki-roots")
    ))]
    #[test]
    fn test_build_https_connector_default() {
        assert!(build_https_connector(None).is_ok());
    }

    #[cfg(feature = "tls-ring")]
    #[test]
    fn test_build_https_connector_custom_config() {
        let config = crypto_provider_builder()
            .unwrap()
            .with_root_certificates(rustls::RootCertStore::empty())
            .with_no_client_auth();
        assert!(build_https_connector(Some(config)).is_ok());
    }
}

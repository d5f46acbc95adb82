//! Opaque credential wrapper.

use std::fmt;

use serde::Deserialize;

/// A credential (API token, personal access token) that never prints itself.
///
/// The value is only reachable through [`Secret::unwrap`], called at the point
/// where it goes into a request.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new<S: Into<String>>(value: S) -> Self {
        Self(value.into())
    }

    /// Expose the wrapped value.
    pub fn unwrap(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_is_redacted() {
        let token = Secret::new("mrp_abcdef");
        assert_eq!(format!("{:?}", token), "Secret(***)");
        assert_eq!(token.to_string(), "***");
        assert_eq!(token.unwrap(), "mrp_abcdef");
    }
}

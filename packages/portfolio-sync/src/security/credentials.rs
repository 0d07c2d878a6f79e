//! Credential handling with secure memory.
//!
//! Uses the `secrecy` crate so access tokens and API keys never end up in
//! logs, `Debug` output or error messages.

use secrecy::{ExposeSecret, SecretBox};
use std::fmt;

use crate::error::{Result, SyncError};

/// A secret string that won't be logged or displayed.
pub struct SecretString(SecretBox<str>);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretBox::new(Box::from(value.into().as_str())))
    }

    /// Expose the secret value for use.
    ///
    /// Only call this when building the request that needs it.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// Blank secrets are treated as missing configuration.
    pub fn is_blank(&self) -> bool {
        self.expose().trim().is_empty()
    }

    /// A required secret read from the variable `name`.
    ///
    /// Missing and blank values are both configuration errors.
    pub fn required(name: &str, value: Option<String>) -> Result<Self> {
        let secret = Self::from(value.unwrap_or_default());
        if secret.is_blank() {
            return Err(SyncError::Config(format!("{} must be set", name)));
        }
        Ok(secret)
    }

    /// `Authorization` header value.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.expose())
    }
}

impl Clone for SecretString {
    fn clone(&self) -> Self {
        Self::new(self.expose())
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// API key and model for a chat-completion summarizer.
#[derive(Clone)]
pub struct SummarizerCredentials {
    pub api_key: SecretString,
    pub model: String,

    /// Overrides the provider's default endpoint (proxies, Azure)
    pub base_url: Option<String>,
}

impl SummarizerCredentials {
    pub fn new(api_key: impl Into<SecretString>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }
}

impl fmt::Debug for SummarizerCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SummarizerCredentials")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_is_redacted() {
        let secret = SecretString::new("ya29.super-secret-token");
        assert_eq!(format!("{:?}", secret), "[REDACTED]");
        assert_eq!(format!("{}", secret), "[REDACTED]");
        assert_eq!(secret.expose(), "ya29.super-secret-token");
    }

    #[test]
    fn test_bearer_header() {
        let secret = SecretString::from("abc");
        assert_eq!(secret.bearer(), "Bearer abc");
        assert!(SecretString::from("  ").is_blank());
    }

    #[test]
    fn test_required_rejects_missing_and_blank() {
        let missing = SecretString::required("OPENAI_API_KEY", None).unwrap_err();
        assert!(matches!(missing, SyncError::Config(ref m) if m == "OPENAI_API_KEY must be set"));
        assert!(matches!(
            SecretString::required("OPENAI_API_KEY", Some(" \n".into())),
            Err(SyncError::Config(_))
        ));
        let key = SecretString::required("OPENAI_API_KEY", Some("sk-1".into())).unwrap();
        assert_eq!(key.expose(), "sk-1");
    }

    #[test]
    fn test_summarizer_credentials_debug() {
        let creds = SummarizerCredentials::new("sk-secret", "gpt-4o-mini");
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("gpt-4o-mini"));
    }
}

//! Configuration and wire types for the notary protocol.

use serde::{Deserialize, Serialize};

/// A transparency-log entry as returned by the log authority.
///
/// The document is kept as a raw JSON object: the log has used more than one
/// field-naming scheme over time and normalization is the verifier's job.
pub type EntryDocument = serde_json::Map<String, serde_json::Value>;

/// Notary client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotaryConfig {
    /// Base URL of the log authority (e.g. `http://127.0.0.1:8000`).
    pub url: String,

    /// Bearer token for non-public logs.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: f64,
}

fn default_timeout() -> f64 {
    5.0
}

impl NotaryConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: None,
            timeout_secs: default_timeout(),
        }
    }

    /// Create config from environment variables.
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `OORD_NOTARY_URL` | Log base URL (falls back to `OORD_TL_URL`) |
    /// | `OORD_TL_API_KEY` | Bearer token |
    /// | `OORD_TL_TIMEOUT_SECS` | Request timeout (default: 5) |
    ///
    /// Returns `None` when no URL is configured.
    pub fn from_env() -> Option<Self> {
        let url = std::env::var("OORD_NOTARY_URL")
            .or_else(|_| std::env::var("OORD_TL_URL"))
            .ok()
            .filter(|u| !u.trim().is_empty())?;

        Some(Self {
            url,
            api_key: std::env::var("OORD_TL_API_KEY").ok(),
            timeout_secs: std::env::var("OORD_TL_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_timeout),
        })
    }

    /// Set the API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the request timeout.
    pub fn with_timeout_secs(mut self, secs: f64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for var in [
            "OORD_NOTARY_URL",
            "OORD_TL_URL",
            "OORD_TL_API_KEY",
            "OORD_TL_TIMEOUT_SECS",
        ] {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn from_env_without_url_is_none() {
        clear_env();
        assert!(NotaryConfig::from_env().is_none());
    }

    #[test]
    #[serial]
    fn from_env_reads_legacy_alias_and_timeout() {
        clear_env();
        std::env::set_var("OORD_TL_URL", "http://log.example");
        std::env::set_var("OORD_TL_TIMEOUT_SECS", "1.5");

        let config = NotaryConfig::from_env().unwrap();
        assert_eq!(config.url, "http://log.example");
        assert_eq!(config.timeout_secs, 1.5);
        assert!(config.api_key.is_none());
        clear_env();
    }

    #[test]
    fn deserialize_applies_defaults() {
        let config: NotaryConfig = serde_json::from_str(r#"{"url":"http://x"}"#).unwrap();
        assert_eq!(config.timeout_secs, 5.0);
        assert!(config.api_key.is_none());
    }
}

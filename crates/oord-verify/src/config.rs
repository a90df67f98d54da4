//! Verifier configuration.

use oord_notary::NotaryConfig;
use serde::{Deserialize, Serialize};

/// Signing key identifier used by unsigned fixtures.
pub const PLACEHOLDER_KID: &str = "stub-kid";

/// Verifier configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyConfig {
    /// Corroborate the embedded TL proof against the live log.
    #[serde(default)]
    pub online: bool,

    /// Base URL of the log authority. Setting it also enables online mode.
    #[serde(default)]
    pub notary_url: Option<String>,

    /// Bearer token for non-public logs.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Online check timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: f64,

    /// Treat signatures by [`PLACEHOLDER_KID`] as skipped instead of
    /// looking the key up. Test fixtures only.
    #[serde(default)]
    pub allow_placeholder_kid: bool,

    /// Largest archive member the reader will materialize.
    #[serde(default = "default_max_member_bytes")]
    pub max_member_bytes: u64,
}

fn default_timeout() -> f64 {
    5.0
}

fn default_max_member_bytes() -> u64 {
    512 * 1024 * 1024
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            online: false,
            notary_url: None,
            api_key: None,
            timeout_secs: default_timeout(),
            allow_placeholder_kid: false,
            max_member_bytes: default_max_member_bytes(),
        }
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

impl VerifyConfig {
    /// Create config from environment variables.
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `OORD_ONLINE` | Enable online TL corroboration |
    /// | `OORD_NOTARY_URL` | Log base URL (alias: `OORD_TL_URL`) |
    /// | `OORD_TL_API_KEY` | Bearer token |
    /// | `OORD_TL_TIMEOUT_SECS` | Online check timeout (default: 5) |
    /// | `OORD_ALLOW_PLACEHOLDER_KID` | Skip signatures by `stub-kid` (fixtures only) |
    /// | `OORD_MAX_MEMBER_BYTES` | Archive member size limit |
    pub fn from_env() -> Self {
        let notary = NotaryConfig::from_env();
        Self {
            online: env_flag("OORD_ONLINE"),
            api_key: notary.as_ref().and_then(|n| n.api_key.clone()),
            timeout_secs: notary
                .as_ref()
                .map(|n| n.timeout_secs)
                .unwrap_or_else(default_timeout),
            notary_url: notary.map(|n| n.url),
            allow_placeholder_kid: env_flag("OORD_ALLOW_PLACEHOLDER_KID"),
            max_member_bytes: std::env::var("OORD_MAX_MEMBER_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_max_member_bytes),
        }
    }

    /// Enable or disable online mode.
    pub fn with_online(mut self, online: bool) -> Self {
        self.online = online;
        self
    }

    /// Set the log base URL.
    pub fn with_notary_url(mut self, url: impl Into<String>) -> Self {
        self.notary_url = Some(url.into());
        self
    }

    /// Set the log bearer token.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the online check timeout.
    pub fn with_timeout_secs(mut self, secs: f64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Accept the placeholder signing key.
    pub fn with_allow_placeholder_kid(mut self, allow: bool) -> Self {
        self.allow_placeholder_kid = allow;
        self
    }

    /// Set the member size limit.
    pub fn with_max_member_bytes(mut self, max: u64) -> Self {
        self.max_member_bytes = max;
        self
    }

    /// Online mode is on when requested explicitly or a URL is configured.
    pub fn online_enabled(&self) -> bool {
        self.online || self.url().is_some()
    }

    fn url(&self) -> Option<&str> {
        self.notary_url.as_deref().filter(|u| !u.trim().is_empty())
    }

    /// Notary client config, when a URL is set.
    pub fn notary_config(&self) -> Option<NotaryConfig> {
        let url = self.url()?;
        let mut config = NotaryConfig::new(url).with_timeout_secs(self.timeout_secs);
        if let Some(key) = &self.api_key {
            config = config.with_api_key(key.clone());
        }
        Some(config)
    }

    /// The online timeout as a duration, falling back to the default for
    /// non-positive or non-finite values.
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::try_from_secs_f64(self.timeout_secs)
            .ok()
            .filter(|t| !t.is_zero())
            .unwrap_or(std::time::Duration::from_secs(5))
    }
}

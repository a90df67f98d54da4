//! Error types for the notary client.

/// Notary errors.
///
/// This is the closed set of outcomes a transparency-log lookup can fail
/// with. Callers branch on the variant, never on the message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotaryError {
    /// Transport failure, timeout, or an unexpected HTTP status.
    #[error("unreachable: {message}")]
    Unreachable { message: String },

    /// 401/403 from the log authority.
    #[error("unauthorized: {message}")]
    Unauthorized { message: String },

    /// No entry at the requested sequence number (404).
    #[error("entry not found: seq={seq}")]
    NotFound { seq: u64 },

    /// Body was not a JSON object.
    #[error("bad response: {message}")]
    BadResponse { message: String },
}

impl NotaryError {
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::Unreachable {
            message: message.into(),
        }
    }

    pub fn bad_response(message: impl Into<String>) -> Self {
        Self::BadResponse {
            message: message.into(),
        }
    }

    /// Whether a later retry could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unreachable { .. })
    }
}

impl From<reqwest::Error> for NotaryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::Unreachable {
                message: format!("timed out: {}", err),
            };
        }
        Self::Unreachable {
            message: err.to_string(),
        }
    }
}

/// Result type for notary operations.
pub type NotaryResult<T> = Result<T, NotaryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_unreachable_is_retryable() {
        assert!(NotaryError::unreachable("no route").is_retryable());
        assert!(!NotaryError::NotFound { seq: 7 }.is_retryable());
        assert!(!NotaryError::Unauthorized {
            message: "http 401".into()
        }
        .is_retryable());
        assert!(!NotaryError::bad_response("not an object").is_retryable());
    }

    #[test]
    fn display_includes_context() {
        assert_eq!(
            NotaryError::NotFound { seq: 42 }.to_string(),
            "entry not found: seq=42"
        );
        assert_eq!(
            NotaryError::unreachable("http 502").to_string(),
            "unreachable: http 502"
        );
    }
}

//! Online corroboration of an embedded TL proof against the live log.

use std::time::Duration;

use oord_notary::{NotaryError, TlEntrySource};
use serde_json::Value;
use tracing::debug;

use super::{TlAnchor, TlProof};
use crate::reason::ReasonCode;
use crate::summary::TlOnlineCheck;

/// Online stage failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnlineFailure {
    pub check: TlOnlineCheck,
    pub reason: ReasonCode,
    pub message: String,
}

impl OnlineFailure {
    fn new(reason: ReasonCode, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            check: TlOnlineCheck {
                enabled: true,
                ok: Some(false),
                reason_id: Some(reason),
                error: Some(message.clone()),
            },
            reason,
            message,
        }
    }
}

/// Reason code for a collaborator failure. One code per failure kind.
pub fn reason_for(error: &NotaryError) -> ReasonCode {
    match error {
        NotaryError::Unreachable { .. } => ReasonCode::TlOnlineUnreachable,
        NotaryError::Unauthorized { .. } => ReasonCode::TlOnlineUnauthorized,
        NotaryError::NotFound { .. } => ReasonCode::TlOnlineNotFound,
        NotaryError::BadResponse { .. } => ReasonCode::TlOnlineBadResponse,
    }
}

/// Compare the live log entry at `anchor.seq` with the embedded proof.
///
/// Call only when online mode is enabled. `source` is `None` when no log
/// endpoint is configured; `anchor` is `None` when the bundle carries no
/// proof, in which case there is nothing to corroborate.
pub async fn check_online(
    source: Option<&dyn TlEntrySource>,
    anchor: Option<&TlAnchor>,
    timeout: Duration,
) -> Result<TlOnlineCheck, OnlineFailure> {
    let Some(source) = source else {
        return Err(OnlineFailure::new(
            ReasonCode::EnvNotaryUrlMissing,
            "online enabled but no notary URL configured",
        ));
    };

    let Some(anchor) = anchor else {
        return Ok(TlOnlineCheck {
            enabled: true,
            ..TlOnlineCheck::default()
        });
    };

    debug!(stage = "tl_online", seq = anchor.seq, "fetching live TL entry");
    let fetched = match tokio::time::timeout(timeout, source.fetch_entry(anchor.seq)).await {
        Ok(result) => result,
        Err(_) => Err(NotaryError::unreachable(format!(
            "timed out after {:.1}s",
            timeout.as_secs_f64()
        ))),
    };

    let document = fetched.map_err(|e| {
        let label = match &e {
            NotaryError::Unreachable { .. } => "unreachable",
            NotaryError::Unauthorized { .. } => "unauthorized",
            NotaryError::NotFound { .. } => "not found",
            NotaryError::BadResponse { .. } => "bad response",
        };
        OnlineFailure::new(reason_for(&e), format!("TL online {label}: {e}"))
    })?;

    let live = match document.get("entry") {
        Some(Value::Object(entry)) if !entry.is_empty() => entry,
        _ => &document,
    };
    let Some(live) = TlProof::normalize(live).anchor() else {
        return Err(OnlineFailure::new(
            ReasonCode::TlOnlineBadResponse,
            "TL entry missing seq/merkle_root",
        ));
    };

    if live != *anchor {
        return Err(OnlineFailure::new(
            ReasonCode::TlOnlineContradiction,
            format!(
                "TL mismatch (live seq={}, root={})",
                live.seq, live.merkle_root
            ),
        ));
    }

    Ok(TlOnlineCheck {
        enabled: true,
        ok: Some(true),
        reason_id: None,
        error: None,
    })
}

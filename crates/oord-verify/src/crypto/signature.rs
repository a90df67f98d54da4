//! Ed25519 signature checks for the manifest and the TL signed tree head.
//!
//! # Signing inputs
//!
//! - Manifest: canonical JSON of the manifest with `signature` replaced by
//!   the empty string. Every other field, known or not, is covered.
//! - TL tree head: the UTF-8 string `seq=<seq>|merkle_root=<root>`.
//!
//! Keys (`x`) and signatures are base64url, padding optional.
//!
//! Verification is tri-state: a signature can be verified, rejected, or not
//! evaluated at all. Callers must not collapse "not evaluated" into either
//! of the other two.

use ed25519_dalek::{Signature, Verifier};
use serde_json::{Map, Value};

use super::{canonical, decode_base64url};
use crate::config::PLACEHOLDER_KID;
use crate::jwks::{KeyLookupError, KeySet};

/// Why a signature was not evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Signed by the placeholder key and placeholder keys are allowed.
    PlaceholderKey,
    /// The tree head carries no signature or signer.
    Unsigned,
}

/// Why a signature was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SigRejection {
    #[error("manifest missing 'key_id' or 'signature'")]
    MissingFields,

    #[error(transparent)]
    Key(#[from] KeyLookupError),

    #[error("invalid signature encoding: {reason}")]
    Encoding { reason: String },

    #[error("cannot build signing input: {reason}")]
    SigningInput { reason: String },

    #[error("signature verification failed")]
    Mismatch,
}

impl SigRejection {
    /// The signer is not in the key store at all.
    pub fn is_key_missing(&self) -> bool {
        matches!(self, Self::Key(KeyLookupError::NotFound { .. }))
    }
}

/// Outcome of a signature check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SigOutcome {
    Verified,
    Rejected(SigRejection),
    Skipped(SkipReason),
}

impl SigOutcome {
    /// `Some(true)`, `Some(false)`, or `None` when not evaluated.
    pub fn as_option(&self) -> Option<bool> {
        match self {
            Self::Verified => Some(true),
            Self::Rejected(_) => Some(false),
            Self::Skipped(_) => None,
        }
    }

    pub fn rejection(&self) -> Option<&SigRejection> {
        match self {
            Self::Rejected(r) => Some(r),
            _ => None,
        }
    }
}

impl From<Result<(), SigRejection>> for SigOutcome {
    fn from(result: Result<(), SigRejection>) -> Self {
        match result {
            Ok(()) => Self::Verified,
            Err(r) => Self::Rejected(r),
        }
    }
}

/// Canonical bytes the manifest signature is computed over.
pub fn manifest_signing_bytes(manifest: &Map<String, Value>) -> anyhow::Result<Vec<u8>> {
    let mut unsigned = manifest.clone();
    unsigned.insert("signature".to_string(), Value::String(String::new()));
    canonical::to_vec(&unsigned)
}

/// Message the TL signed tree head is computed over.
pub fn tl_signing_message(seq: u64, merkle_root: &str) -> String {
    format!("seq={seq}|merkle_root={merkle_root}")
}

fn verify_ed25519(
    keys: &KeySet,
    kid: &str,
    message: &[u8],
    signature_b64: &str,
) -> Result<(), SigRejection> {
    let key = keys.ed25519_key(kid)?;

    let bytes = decode_base64url(signature_b64).map_err(|e| SigRejection::Encoding {
        reason: e.to_string(),
    })?;
    let signature = Signature::from_slice(&bytes).map_err(|e| SigRejection::Encoding {
        reason: e.to_string(),
    })?;

    key.verify(message, &signature)
        .map_err(|_| SigRejection::Mismatch)
}

/// Verify the manifest's own signature against the key store.
pub fn verify_manifest_signature(
    manifest: &Map<String, Value>,
    keys: &KeySet,
    allow_placeholder_kid: bool,
) -> SigOutcome {
    let key_id = manifest.get("key_id").and_then(Value::as_str);
    let signature = manifest.get("signature").and_then(Value::as_str);
    let (Some(key_id), Some(signature)) = (key_id, signature) else {
        return SigOutcome::Rejected(SigRejection::MissingFields);
    };

    if allow_placeholder_kid && key_id == PLACEHOLDER_KID {
        return SigOutcome::Skipped(SkipReason::PlaceholderKey);
    }

    let message = match manifest_signing_bytes(manifest) {
        Ok(m) => m,
        Err(e) => {
            return SigOutcome::Rejected(SigRejection::SigningInput {
                reason: e.to_string(),
            })
        }
    };

    verify_ed25519(keys, key_id, &message, signature).into()
}

/// Verify the TL signed tree head over `(seq, merkle_root)`.
///
/// Skipped when the proof carries no signature or no signer.
pub fn verify_tl_signature(
    seq: u64,
    merkle_root: &str,
    sth_sig: Option<&str>,
    signer_kid: Option<&str>,
    keys: &KeySet,
    allow_placeholder_kid: bool,
) -> SigOutcome {
    let (Some(sth_sig), Some(signer_kid)) = (
        sth_sig.filter(|s| !s.is_empty()),
        signer_kid.filter(|k| !k.is_empty()),
    ) else {
        return SigOutcome::Skipped(SkipReason::Unsigned);
    };

    if allow_placeholder_kid && signer_kid == PLACEHOLDER_KID {
        return SigOutcome::Skipped(SkipReason::PlaceholderKey);
    }

    let message = tl_signing_message(seq, merkle_root);
    verify_ed25519(keys, signer_kid, message.as_bytes(), sth_sig).into()
}

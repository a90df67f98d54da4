//! Transparency-log proof validation.
//!
//! State transitions keyed by the manifest's declared `tl_mode` and whether
//! `tl_proof.json` is in the bundle:
//!
//! | tl_mode      | proof   | result                              |
//! |--------------|---------|-------------------------------------|
//! | absent       | any     | `TL_MODE_MISSING`                   |
//! | unknown      | any     | `TL_MODE_INVALID`                   |
//! | `none`       | present | `TL_PROOF_UNEXPECTED`               |
//! | `none`       | absent  | pass, not present, not required     |
//! | `included`   | absent  | `TL_PROOF_MISSING`                  |
//! | `included`   | present | normalize, schema, root, signature  |

pub mod online;

use serde_json::{Map, Value};
use tracing::debug;

use crate::bundle::{
    load_json_member, BundleReader, Manifest, MemberError, TlMode, TlModeField, TL_PROOF_MEMBER,
};
use crate::crypto::{verify_tl_signature, SigOutcome};
use crate::jwks::KeySet;
use crate::reason::ReasonCode;
use crate::summary::TlCheck;

pub use online::{check_online, reason_for, OnlineFailure};

/// A TL proof reduced to the fields verification depends on.
///
/// Two field-naming schemes have been in use: a nested `entry`/`sth`
/// layout and a flat one. Nested fields win when both are present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlProof {
    pub merkle_root: Option<String>,
    pub seq: Option<u64>,
    pub sth_sig: Option<String>,
    pub signer_kid: Option<String>,
}

fn str_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(String::from)
}

fn non_empty_str(obj: &Map<String, Value>, key: &str) -> Option<String> {
    str_field(obj, key).filter(|s| !s.is_empty())
}

fn present<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    obj.get(key).filter(|v| !v.is_null())
}

/// Sequence number from an integer, a float, or a string of digits.
fn parse_seq(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0 && *f < u64::MAX as f64)
                .map(|f| f as u64)
        }),
        Value::String(s) if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) => {
            s.parse().ok()
        }
        _ => None,
    }
}

impl TlProof {
    /// Normalize either layout into one record.
    pub fn normalize(obj: &Map<String, Value>) -> Self {
        let empty = Map::new();
        let entry = obj.get("entry").and_then(Value::as_object).unwrap_or(&empty);
        let sth = obj.get("sth").and_then(Value::as_object).unwrap_or(&empty);

        let merkle_root = str_field(entry, "merkle_root").or_else(|| str_field(obj, "merkle_root"));

        // Only absent or null falls through; `tl_seq: 0` is log position 0.
        let seq = present(entry, "seq")
            .or_else(|| present(obj, "tl_seq"))
            .or_else(|| present(obj, "seq"))
            .and_then(parse_seq);

        let sth_sig = str_field(sth, "sth_sig").or_else(|| str_field(obj, "sth_sig"));

        let signer_kid = non_empty_str(entry, "signer_key_id")
            .or_else(|| non_empty_str(entry, "signer_kid"))
            .or_else(|| non_empty_str(obj, "signer_key_id"))
            .or_else(|| non_empty_str(obj, "signer_kid"));

        Self {
            merkle_root,
            seq,
            sth_sig,
            signer_kid,
        }
    }

    /// `(seq, merkle_root)` when both are present.
    pub fn anchor(&self) -> Option<TlAnchor> {
        Some(TlAnchor {
            seq: self.seq?,
            merkle_root: self.merkle_root.clone()?,
        })
    }
}

/// The log position a validated proof commits the bundle to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlAnchor {
    pub seq: u64,
    pub merkle_root: String,
}

/// TL stage passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlValidated {
    pub check: TlCheck,
    /// Set when a proof was present; what the online check corroborates.
    pub anchor: Option<TlAnchor>,
}

/// TL stage failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlFailure {
    pub check: TlCheck,
    pub reason: ReasonCode,
    pub message: String,
}

impl TlFailure {
    fn new(mut check: TlCheck, reason: ReasonCode, message: impl Into<String>) -> Self {
        let message = message.into();
        check.ok = Some(false);
        check.error = Some(message.clone());
        Self {
            check,
            reason,
            message,
        }
    }
}

/// Run the TL state machine.
///
/// `manifest_root` is the manifest's declared root, already checked
/// against the recomputed one.
pub fn validate(
    reader: &mut BundleReader,
    manifest: &Manifest,
    manifest_root: &str,
    keys: &KeySet,
    allow_placeholder_kid: bool,
) -> Result<TlValidated, TlFailure> {
    let mut check = TlCheck::default();

    let mode = match manifest.tl_mode() {
        TlModeField::Valid(mode) => mode,
        TlModeField::Absent => {
            check.present = Some(false);
            return Err(TlFailure::new(
                check,
                ReasonCode::TlModeMissing,
                "manifest.tl_mode missing or not a string",
            ));
        }
        TlModeField::Invalid(other) => {
            check.present = Some(false);
            return Err(TlFailure::new(
                check,
                ReasonCode::TlModeInvalid,
                format!("invalid manifest.tl_mode='{other}' (expected 'included'|'none')"),
            ));
        }
    };

    let required = mode == TlMode::Included;
    check.required = Some(required);
    debug!(stage = "tl", ?mode, "validating TL proof");

    if mode == TlMode::None && reader.contains(TL_PROOF_MEMBER) {
        check.present = Some(true);
        return Err(TlFailure::new(
            check,
            ReasonCode::TlProofUnexpected,
            format!("{TL_PROOF_MEMBER} present but manifest.tl_mode=none"),
        ));
    }

    let raw = match load_json_member(reader, TL_PROOF_MEMBER) {
        Ok(raw) => raw,
        Err(MemberError::Missing { .. }) if required => {
            check.present = Some(false);
            return Err(TlFailure::new(
                check,
                ReasonCode::TlProofMissing,
                format!("{TL_PROOF_MEMBER} missing but manifest.tl_mode=included"),
            ));
        }
        Err(MemberError::Missing { .. }) => {
            check.present = Some(false);
            check.ok = Some(true);
            return Ok(TlValidated {
                check,
                anchor: None,
            });
        }
        Err(MemberError::Container(e)) => {
            return Err(TlFailure::new(check, ReasonCode::ZipBad, e.to_string()));
        }
        Err(e) => {
            check.present = Some(true);
            return Err(TlFailure::new(
                check,
                ReasonCode::TlProofJsonInvalid,
                e.to_string(),
            ));
        }
    };

    check.present = Some(true);
    let proof = TlProof::normalize(&raw);
    let Some(anchor) = proof.anchor() else {
        return Err(TlFailure::new(
            check,
            ReasonCode::TlProofSchemaInvalid,
            format!("{TL_PROOF_MEMBER} missing merkle_root or seq"),
        ));
    };

    if anchor.merkle_root != manifest_root {
        return Err(TlFailure::new(
            check,
            ReasonCode::TlRootMismatch,
            "tl_proof merkle_root does not match manifest.merkle.root_cid",
        ));
    }

    check.seq = Some(anchor.seq);
    check.merkle_root = Some(anchor.merkle_root.clone());
    check.sth_sig = proof.sth_sig.clone();
    check.signer_kid = proof.signer_kid.clone();

    let outcome = verify_tl_signature(
        anchor.seq,
        &anchor.merkle_root,
        proof.sth_sig.as_deref(),
        proof.signer_kid.as_deref(),
        keys,
        allow_placeholder_kid,
    );
    check.sig_verified = outcome.as_option();

    if let SigOutcome::Rejected(rejection) = &outcome {
        let reason = if rejection.is_key_missing() {
            ReasonCode::TlKeyMissing
        } else {
            ReasonCode::TlProofSigInvalid
        };
        return Err(TlFailure::new(
            check,
            reason,
            format!("TL signature: {rejection}"),
        ));
    }

    check.ok = Some(true);
    Ok(TlValidated {
        check,
        anchor: Some(anchor),
    })
}

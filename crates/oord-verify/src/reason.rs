//! Stable reason codes and their failure class.
//!
//! Reason codes are part of the public contract: they are emitted verbatim
//! in machine-readable output and callers branch on them. Never rename one.

use serde::{Deserialize, Serialize};

/// Failure class of a reason code.
///
/// `Content` means the bundle itself is invalid and must be rejected.
/// `Env` means the verifying environment could not complete the job and the
/// run may be retried once the environment is fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorClass {
    Content,
    Env,
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Content => f.write_str("content"),
            Self::Env => f.write_str("env"),
        }
    }
}

/// Stable reason codes for verification failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    EnvPathMissing,
    ZipBad,
    EnvNotaryUrlMissing,
    RuntimeError,
    BundleManifestMissing,
    BundleManifestInvalidJson,
    BundleManifestInvalidShape,
    HashMismatch,
    MerkleSchemaInvalid,
    MerkleComputeError,
    MerkleMismatch,
    JwksMissing,
    JwksInvalidJson,
    JwksInvalidShape,
    ManifestSigInvalid,
    TlModeMissing,
    TlModeInvalid,
    TlProofUnexpected,
    TlProofMissing,
    TlProofJsonInvalid,
    TlProofSchemaInvalid,
    TlRootMismatch,
    TlKeyMissing,
    TlProofSigInvalid,
    TlOnlineUnreachable,
    TlOnlineUnauthorized,
    TlOnlineNotFound,
    TlOnlineBadResponse,
    TlOnlineContradiction,
}

impl ReasonCode {
    /// The wire identifier, e.g. `"HASH_MISMATCH"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EnvPathMissing => "ENV_PATH_MISSING",
            Self::ZipBad => "ZIP_BAD",
            Self::EnvNotaryUrlMissing => "ENV_NOTARY_URL_MISSING",
            Self::RuntimeError => "RUNTIME_ERROR",
            Self::BundleManifestMissing => "BUNDLE_MANIFEST_MISSING",
            Self::BundleManifestInvalidJson => "BUNDLE_MANIFEST_INVALID_JSON",
            Self::BundleManifestInvalidShape => "BUNDLE_MANIFEST_INVALID_SHAPE",
            Self::HashMismatch => "HASH_MISMATCH",
            Self::MerkleSchemaInvalid => "MERKLE_SCHEMA_INVALID",
            Self::MerkleComputeError => "MERKLE_COMPUTE_ERROR",
            Self::MerkleMismatch => "MERKLE_MISMATCH",
            Self::JwksMissing => "JWKS_MISSING",
            Self::JwksInvalidJson => "JWKS_INVALID_JSON",
            Self::JwksInvalidShape => "JWKS_INVALID_SHAPE",
            Self::ManifestSigInvalid => "MANIFEST_SIG_INVALID",
            Self::TlModeMissing => "TL_MODE_MISSING",
            Self::TlModeInvalid => "TL_MODE_INVALID",
            Self::TlProofUnexpected => "TL_PROOF_UNEXPECTED",
            Self::TlProofMissing => "TL_PROOF_MISSING",
            Self::TlProofJsonInvalid => "TL_PROOF_JSON_INVALID",
            Self::TlProofSchemaInvalid => "TL_PROOF_SCHEMA_INVALID",
            Self::TlRootMismatch => "TL_ROOT_MISMATCH",
            Self::TlKeyMissing => "TL_KEY_MISSING",
            Self::TlProofSigInvalid => "TL_PROOF_SIG_INVALID",
            Self::TlOnlineUnreachable => "TL_ONLINE_UNREACHABLE",
            Self::TlOnlineUnauthorized => "TL_ONLINE_UNAUTHORIZED",
            Self::TlOnlineNotFound => "TL_ONLINE_NOT_FOUND",
            Self::TlOnlineBadResponse => "TL_ONLINE_BAD_RESPONSE",
            Self::TlOnlineContradiction => "TL_ONLINE_CONTRADICTION",
        }
    }

    /// Failure class. `ENV_*` codes, a broken container, and log
    /// transport/credential failures are environment failures; a log that
    /// contradicts the bundle is content.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::EnvPathMissing
            | Self::ZipBad
            | Self::EnvNotaryUrlMissing
            | Self::TlOnlineUnreachable
            | Self::TlOnlineUnauthorized
            | Self::TlOnlineBadResponse => ErrorClass::Env,
            _ => ErrorClass::Content,
        }
    }

    pub fn is_env(&self) -> bool {
        self.class() == ErrorClass::Env
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

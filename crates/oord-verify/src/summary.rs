//! Per-stage result records, the verification summary, and exit codes.
//!
//! Each pipeline stage produces its own immutable record. The aggregator
//! combines whatever records were produced before the run ended into a
//! [`VerificationSummary`], exactly once, either as a success or as a
//! failure carrying a single reason code.
//!
//! In every record `None` means "not evaluated", never "failed".

use serde::Serialize;

use crate::bundle::BatchMeta;
use crate::hashes::HashMismatch;
use crate::reason::{ErrorClass, ReasonCode};

/// All checks passed.
pub const SUCCESS: i32 = 0;
/// The bundle is invalid and must be rejected.
pub const CONTENT_FAILURE: i32 = 1;
/// The environment could not complete verification; retry after fixing it.
pub const ENV_FAILURE: i32 = 2;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MerkleCheck {
    pub ok: Option<bool>,
    pub manifest_root: Option<String>,
    pub recomputed_root: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JwksCheck {
    pub present: Option<bool>,
    pub ok: Option<bool>,
    pub kids: Vec<String>,
    pub fingerprint: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ManifestSigCheck {
    pub ok: Option<bool>,
    pub key_id: Option<String>,
    pub sig_verified: Option<bool>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TlCheck {
    pub present: Option<bool>,
    pub required: Option<bool>,
    pub ok: Option<bool>,
    pub seq: Option<u64>,
    pub merkle_root: Option<String>,
    pub sth_sig: Option<String>,
    pub signer_kid: Option<String>,
    pub sig_verified: Option<bool>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TlOnlineCheck {
    pub enabled: bool,
    pub ok: Option<bool>,
    pub reason_id: Option<ReasonCode>,
    pub error: Option<String>,
}

/// Records produced by the stages that ran.
#[derive(Debug, Clone, Default)]
pub struct StageRecords {
    pub batch: BatchMeta,
    pub hashes_ok: Option<bool>,
    pub hash_mismatches: Vec<HashMismatch>,
    pub merkle: MerkleCheck,
    pub jwks: JwksCheck,
    pub manifest_sig: ManifestSigCheck,
    pub tl: TlCheck,
    pub tl_online: TlOnlineCheck,
}

/// Final result of verifying one bundle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerificationSummary {
    pub bundle_path: String,
    pub ok: bool,
    pub reason_ids: Vec<ReasonCode>,
    pub error: Option<String>,
    pub error_kind: Option<ErrorClass>,
    pub batch: BatchMeta,
    pub hashes_ok: Option<bool>,
    pub hash_mismatches: Vec<HashMismatch>,
    pub merkle: MerkleCheck,
    pub jwks: JwksCheck,
    pub manifest_sig: ManifestSigCheck,
    pub tl: TlCheck,
    pub tl_online: TlOnlineCheck,
}

impl VerificationSummary {
    fn assemble(bundle_path: String, records: StageRecords) -> Self {
        Self {
            bundle_path,
            ok: true,
            reason_ids: Vec::new(),
            error: None,
            error_kind: None,
            batch: records.batch,
            hashes_ok: records.hashes_ok,
            hash_mismatches: records.hash_mismatches,
            merkle: records.merkle,
            jwks: records.jwks,
            manifest_sig: records.manifest_sig,
            tl: records.tl,
            tl_online: records.tl_online,
        }
    }

    /// Every stage passed.
    pub fn passed(bundle_path: impl Into<String>, records: StageRecords) -> Self {
        Self::assemble(bundle_path.into(), records)
    }

    /// The run stopped at a failing stage.
    pub fn failed(
        bundle_path: impl Into<String>,
        records: StageRecords,
        reason: ReasonCode,
        error: impl Into<String>,
    ) -> Self {
        let mut summary = Self::assemble(bundle_path.into(), records);
        summary.ok = false;
        summary.reason_ids = vec![reason];
        summary.error = Some(error.into());
        summary.error_kind = Some(reason.class());
        summary
    }

    /// The primary reason code, if the run failed.
    pub fn reason(&self) -> Option<ReasonCode> {
        self.reason_ids.first().copied()
    }

    /// True when the bundle could not be opened at all.
    pub fn is_unopened(&self) -> bool {
        matches!(
            self.reason(),
            Some(ReasonCode::EnvPathMissing | ReasonCode::ZipBad)
        )
    }

    pub fn exit_code(&self) -> i32 {
        exit_code_for(std::slice::from_ref(self))
    }

    pub fn checks(&self) -> Checks {
        if self.is_unopened() {
            return Checks::default();
        }
        Checks {
            hashes_ok: self.hashes_ok,
            merkle_ok: self.merkle.ok,
            jwks_present: self.jwks.present,
            jwks_ok: self.jwks.ok,
            manifest_sig_ok: self.manifest_sig.ok,
            tl_present: self.tl.present,
            tl_required: self.tl.required,
            tl_ok: self.tl.ok,
            tl_sig_verified: self.tl.sig_verified,
            tl_online_enabled: Some(self.tl_online.enabled),
            tl_online_ok: self.tl_online.ok,
        }
    }
}

/// Flat boolean-or-null view of every sub-check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Checks {
    pub hashes_ok: Option<bool>,
    pub merkle_ok: Option<bool>,
    pub jwks_present: Option<bool>,
    pub jwks_ok: Option<bool>,
    pub manifest_sig_ok: Option<bool>,
    pub tl_present: Option<bool>,
    pub tl_required: Option<bool>,
    pub tl_ok: Option<bool>,
    pub tl_sig_verified: Option<bool>,
    pub tl_online_enabled: Option<bool>,
    pub tl_online_ok: Option<bool>,
}

/// Machine-readable report for one bundle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    #[serde(flatten)]
    pub summary: VerificationSummary,
    pub exit_code: i32,
    pub checks: Checks,
}

impl Report {
    /// Report carrying the bundle's own exit code.
    pub fn new(summary: VerificationSummary) -> Self {
        let exit_code = summary.exit_code();
        Self::with_exit_code(summary, exit_code)
    }

    pub fn with_exit_code(summary: VerificationSummary, exit_code: i32) -> Self {
        let checks = summary.checks();
        Self {
            summary,
            exit_code,
            checks,
        }
    }

    /// Reports for a batch, each carrying the batch-wide exit code.
    pub fn batch(summaries: Vec<VerificationSummary>) -> Vec<Self> {
        let exit_code = exit_code_for(&summaries);
        summaries
            .into_iter()
            .map(|s| Self::with_exit_code(s, exit_code))
            .collect()
    }
}

/// Exit classification over one or more results.
///
/// Environment failures take precedence over content failures.
pub fn exit_code_for(summaries: &[VerificationSummary]) -> i32 {
    let failed = summaries.iter().filter(|s| !s.ok);
    let mut any_failed = false;
    for summary in failed {
        if summary.error_kind == Some(ErrorClass::Env) {
            return ENV_FAILURE;
        }
        any_failed = true;
    }
    if any_failed {
        CONTENT_FAILURE
    } else {
        SUCCESS
    }
}

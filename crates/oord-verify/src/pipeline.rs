//! The verification pipeline.
//!
//! Stages run in a fixed order and the first failing stage ends the run:
//!
//! 1. bundle path exists
//! 2. archive opens
//! 3. manifest loads (metadata is captured here, before any check)
//! 4. payload hashes (collects every mismatch)
//! 5. Merkle schema, recomputation, comparison
//! 6. key store
//! 7. manifest signature
//! 8. TL proof state machine
//! 9. online TL corroboration (when enabled)
//!
//! Stages 1 through 8 are offline and run with the archive open; the archive
//! is closed before any network request is made.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use oord_notary::{NotaryClient, NotaryError, TlEntrySource};
use tracing::{debug, info, warn};

use crate::bundle::{BundleReader, Manifest, MemberError};
use crate::config::VerifyConfig;
use crate::crypto::{compute_root, verify_manifest_signature, SigOutcome, SigRejection};
use crate::hashes::check_hashes;
use crate::jwks::KeySet;
use crate::reason::ReasonCode;
use crate::summary::{JwksCheck, StageRecords, VerificationSummary};
use crate::tl::{self, TlAnchor};

/// Bundle verifier.
///
/// Holds configuration and the log collaborator; carries no per-bundle
/// state, so one verifier can check any number of bundles.
#[derive(Clone)]
pub struct Verifier {
    config: VerifyConfig,
    notary: Option<Arc<dyn TlEntrySource>>,
}

impl std::fmt::Debug for Verifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Verifier")
            .field("config", &self.config)
            .field("notary", &self.notary.is_some())
            .finish()
    }
}

/// One run's accumulated stage records.
struct Run<'a> {
    bundle_path: &'a str,
    records: StageRecords,
}

impl Run<'_> {
    fn fail(self, reason: ReasonCode, error: impl Into<String>) -> VerificationSummary {
        let error = error.into();
        warn!(
            bundle = %self.bundle_path,
            reason = %reason,
            class = %reason.class(),
            error = %error,
            "bundle verification failed"
        );
        VerificationSummary::failed(self.bundle_path, self.records, reason, error)
    }
}

/// Offline stages passed.
struct OfflinePass<'a> {
    run: Run<'a>,
    anchor: Option<TlAnchor>,
}

impl Verifier {
    /// Create a verifier. A notary client is built when a log URL is
    /// configured.
    pub fn new(config: VerifyConfig) -> Result<Self, NotaryError> {
        let notary = match config.notary_config() {
            Some(nc) => Some(Arc::new(NotaryClient::new(nc)?) as Arc<dyn TlEntrySource>),
            None => None,
        };
        Ok(Self { config, notary })
    }

    /// Use `source` for online checks instead of the configured client.
    ///
    /// An injected source counts as a configured log endpoint.
    pub fn with_notary(mut self, source: Arc<dyn TlEntrySource>) -> Self {
        self.notary = Some(source);
        self
    }

    pub fn config(&self) -> &VerifyConfig {
        &self.config
    }

    /// Verify one bundle.
    pub async fn verify(&self, path: &Path) -> VerificationSummary {
        let bundle_path = path.display().to_string();
        let pass = match self.verify_offline(path, &bundle_path) {
            Ok(pass) => pass,
            Err(summary) => return summary,
        };

        let OfflinePass { mut run, anchor } = pass;
        if self.config.online_enabled() {
            match tl::check_online(
                self.notary.as_deref(),
                anchor.as_ref(),
                self.config.timeout(),
            )
            .await
            {
                Ok(check) => run.records.tl_online = check,
                Err(failure) => {
                    run.records.tl_online = failure.check;
                    return run.fail(failure.reason, failure.message);
                }
            }
        }

        info!(bundle = %bundle_path, "bundle verified");
        VerificationSummary::passed(run.bundle_path, run.records)
    }

    /// Verify bundles one after another, results in input order.
    pub async fn verify_all(&self, paths: &[PathBuf]) -> Vec<VerificationSummary> {
        let mut summaries = Vec::with_capacity(paths.len());
        for path in paths {
            summaries.push(self.verify(path).await);
        }
        summaries
    }

    fn verify_offline<'a>(
        &self,
        path: &Path,
        bundle_path: &'a str,
    ) -> Result<OfflinePass<'a>, VerificationSummary> {
        let mut run = Run {
            bundle_path,
            records: StageRecords::default(),
        };
        run.records.tl_online.enabled = self.config.online_enabled();

        if !path.is_file() {
            return Err(run.fail(
                ReasonCode::EnvPathMissing,
                "bundle path does not exist or is not a file",
            ));
        }

        debug!(stage = "open", bundle = %bundle_path);
        let mut reader = match BundleReader::open(path, self.config.max_member_bytes) {
            Ok(r) => r,
            Err(e) => return Err(run.fail(ReasonCode::ZipBad, e.to_string())),
        };

        debug!(stage = "manifest");
        let manifest = match Manifest::load(&mut reader) {
            Ok(m) => m,
            Err(e) => {
                let reason = match &e {
                    MemberError::Missing { .. } => ReasonCode::BundleManifestMissing,
                    MemberError::InvalidJson { .. } => ReasonCode::BundleManifestInvalidJson,
                    MemberError::NotObject { .. } => ReasonCode::BundleManifestInvalidShape,
                    MemberError::Container(_) => ReasonCode::ZipBad,
                };
                return Err(run.fail(reason, e.to_string()));
            }
        };
        run.records.batch = manifest.meta();
        run.records.manifest_sig.key_id = run.records.batch.key_id.clone();

        debug!(stage = "hashes");
        let hashes = match check_hashes(&mut reader, &manifest) {
            Ok(h) => h,
            Err(e) => return Err(run.fail(ReasonCode::ZipBad, e.to_string())),
        };
        run.records.hashes_ok = Some(hashes.ok());
        if !hashes.ok() {
            run.records.hash_mismatches = hashes.mismatches;
            return Err(run.fail(
                ReasonCode::HashMismatch,
                "hash mismatch (bundle payload does not match manifest)",
            ));
        }

        debug!(stage = "merkle");
        let declared_root = match (manifest.merkle(), manifest.declared_root()) {
            (None, _) => {
                return Err(merkle_failure(
                    run,
                    ReasonCode::MerkleSchemaInvalid,
                    "manifest.merkle is missing or not an object".to_string(),
                ))
            }
            (Some(_), None) => {
                return Err(merkle_failure(
                    run,
                    ReasonCode::MerkleSchemaInvalid,
                    "manifest.merkle.root_cid is missing or not a string".to_string(),
                ))
            }
            (Some(_), Some(root)) => root.to_string(),
        };
        run.records.merkle.manifest_root = Some(declared_root.clone());

        // Every entry is well-formed once the hash stage has passed.
        let files: Vec<_> = manifest
            .file_entries()
            .unwrap_or_default()
            .into_iter()
            .flatten()
            .collect();
        let recomputed = match compute_root(&files) {
            Ok(root) => root,
            Err(e) => {
                return Err(merkle_failure(
                    run,
                    ReasonCode::MerkleComputeError,
                    format!("failed to recompute Merkle root from manifest.files: {e}"),
                ))
            }
        };
        run.records.merkle.recomputed_root = Some(recomputed.clone());
        if recomputed != declared_root {
            return Err(merkle_failure(
                run,
                ReasonCode::MerkleMismatch,
                "recomputed Merkle root does not match manifest.merkle.root_cid".to_string(),
            ));
        }
        run.records.merkle.ok = Some(true);

        debug!(stage = "jwks");
        let keys = match KeySet::load(&mut reader) {
            Ok(k) => k,
            Err(e) => {
                let message = e.to_string();
                run.records.jwks.present = Some(false);
                run.records.jwks.ok = Some(false);
                run.records.jwks.error = Some(message.clone());
                return Err(run.fail(e.reason(), message));
            }
        };
        run.records.jwks = JwksCheck {
            present: Some(true),
            ok: Some(true),
            kids: keys.kids(),
            fingerprint: Some(keys.fingerprint().to_string()),
            error: None,
        };

        debug!(stage = "manifest_sig");
        let outcome =
            verify_manifest_signature(manifest.raw(), &keys, self.config.allow_placeholder_kid);
        run.records.manifest_sig.sig_verified = outcome.as_option();
        run.records.manifest_sig.ok = outcome.as_option();
        if let SigOutcome::Rejected(rejection) = outcome {
            let message = format!("manifest signature: {rejection}");
            run.records.manifest_sig.error = Some(message.clone());
            let reason = match rejection {
                SigRejection::SigningInput { .. } => ReasonCode::RuntimeError,
                _ => ReasonCode::ManifestSigInvalid,
            };
            return Err(run.fail(reason, message));
        }

        debug!(stage = "tl");
        match tl::validate(
            &mut reader,
            &manifest,
            &declared_root,
            &keys,
            self.config.allow_placeholder_kid,
        ) {
            Ok(validated) => {
                run.records.tl = validated.check;
                Ok(OfflinePass {
                    run,
                    anchor: validated.anchor,
                })
            }
            Err(failure) => {
                run.records.tl = failure.check;
                Err(run.fail(failure.reason, failure.message))
            }
        }
    }
}

fn merkle_failure(mut run: Run<'_>, reason: ReasonCode, message: String) -> VerificationSummary {
    run.records.merkle.ok = Some(false);
    run.records.merkle.error = Some(message.clone());
    run.fail(reason, message)
}

//! Verification of signed Oord bundles.
//!
//! A bundle is trusted only when its payload hashes, Merkle root, manifest
//! signature, and transparency-log proof are all mutually consistent. Every
//! failure carries a stable [`ReasonCode`] and is classified as either a
//! content failure (reject the bundle) or an environment failure (fix the
//! environment and retry).
//!
//! # Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use oord_verify::{Report, Verifier, VerifyConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let verifier = Verifier::new(VerifyConfig::from_env())?;
//! let summary = verifier.verify(Path::new("batch.zip")).await;
//! let report = Report::new(summary);
//! println!("{}", serde_json::to_string_pretty(&report)?);
//! std::process::exit(report.exit_code);
//! # }
//! ```

pub mod bundle;
pub mod config;
pub mod crypto;
pub mod hashes;
pub mod jwks;
pub mod pipeline;
pub mod reason;
pub mod summary;
pub mod tl;

// Convenience re-exports
pub use bundle::{BatchMeta, BundleError, BundleReader, FileEntry, Manifest, TlMode};
pub use config::{VerifyConfig, PLACEHOLDER_KID};
pub use crypto::{SigOutcome, SigRejection, SkipReason};
pub use hashes::{HashMismatch, MismatchReason};
pub use jwks::{JwksError, KeySet};
pub use pipeline::Verifier;
pub use reason::{ErrorClass, ReasonCode};
pub use summary::{
    exit_code_for, Checks, Report, VerificationSummary, CONTENT_FAILURE, ENV_FAILURE, SUCCESS,
};
pub use tl::{TlAnchor, TlProof};

// Re-export the collaborator interface so callers can inject their own.
pub use oord_notary::{EntryDocument, NotaryError, TlEntrySource};

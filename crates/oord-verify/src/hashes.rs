//! Payload hash verification.
//!
//! Unlike every other stage this one does not stop at the first problem: all
//! mismatches are collected so a single run reports the full extent of the
//! damage.

use std::collections::BTreeSet;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::bundle::{is_safe_member_name, BundleError, BundleReader, Manifest, PAYLOAD_PREFIX};

/// Kind of payload discrepancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MismatchReason {
    FilesNotArray,
    InvalidManifestEntry,
    MissingFromZip,
    HashMismatch,
    SizeMismatch,
    MissingFromManifest,
    UnsafePath,
    TooLarge,
    DuplicatePath,
}

/// One payload discrepancy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HashMismatch {
    pub file: String,
    pub reason: MismatchReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
}

impl HashMismatch {
    fn new(file: impl Into<String>, reason: MismatchReason) -> Self {
        Self {
            file: file.into(),
            reason,
            expected: None,
            actual: None,
        }
    }

    fn expected(mut self, v: impl Into<String>) -> Self {
        self.expected = Some(v.into());
        self
    }

    fn actual(mut self, v: impl Into<String>) -> Self {
        self.actual = Some(v.into());
        self
    }
}

/// Result of checking every payload member.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HashCheck {
    pub mismatches: Vec<HashMismatch>,
}

impl HashCheck {
    pub fn ok(&self) -> bool {
        self.mismatches.is_empty()
    }
}

fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Read a payload member, turning member-level failures into mismatch
/// records. Container failures are returned as errors.
fn read_payload(
    reader: &mut BundleReader,
    name: &str,
) -> Result<Result<Vec<u8>, HashMismatch>, BundleError> {
    match reader.read_member(name) {
        Ok(data) => Ok(Ok(data)),
        Err(BundleError::UnsafePath { .. }) => {
            Ok(Err(HashMismatch::new(name, MismatchReason::UnsafePath)))
        }
        Err(BundleError::MemberTooLarge { size, limit, .. }) => Ok(Err(HashMismatch::new(
            name,
            MismatchReason::TooLarge,
        )
        .expected(format!("<= {limit}"))
        .actual(size.to_string()))),
        Err(BundleError::MissingMember { .. }) => {
            Ok(Err(HashMismatch::new(name, MismatchReason::MissingFromZip)))
        }
        Err(e) => Err(e),
    }
}

/// Recompute and cross-check every payload file against the manifest.
///
/// Checks, in order: each `files[]` entry (shape, uniqueness, presence,
/// digest, size), then every `files/` member the manifest does not declare.
/// A path declared twice is checked once; every later entry is a
/// `duplicate_path` mismatch.
pub fn check_hashes(
    reader: &mut BundleReader,
    manifest: &Manifest,
) -> Result<HashCheck, BundleError> {
    let mut mismatches = Vec::new();

    let entries = match manifest.file_entries() {
        Ok(entries) => entries,
        Err(_) => {
            mismatches.push(HashMismatch::new(
                "<manifest>",
                MismatchReason::FilesNotArray,
            ));
            return Ok(HashCheck { mismatches });
        }
    };

    let mut declared = BTreeSet::new();
    for entry in entries {
        let entry = match entry {
            Ok(e) => e,
            Err(invalid) => {
                mismatches.push(HashMismatch::new(
                    invalid.label,
                    MismatchReason::InvalidManifestEntry,
                ));
                continue;
            }
        };
        if !declared.insert(entry.path.clone()) {
            mismatches.push(HashMismatch::new(&entry.path, MismatchReason::DuplicatePath));
            continue;
        }

        let data = match read_payload(reader, &entry.path)? {
            Ok(data) => data,
            Err(m) if m.reason == MismatchReason::MissingFromZip => {
                mismatches.push(m.expected(entry.sha256.clone()));
                continue;
            }
            Err(m) => {
                mismatches.push(m);
                continue;
            }
        };

        let actual = sha256_hex(&data);
        if actual != entry.sha256 {
            mismatches.push(
                HashMismatch::new(&entry.path, MismatchReason::HashMismatch)
                    .actual(actual)
                    .expected(entry.sha256.clone()),
            );
        }
        if data.len() as u64 != entry.size_bytes {
            mismatches.push(
                HashMismatch::new(&entry.path, MismatchReason::SizeMismatch)
                    .actual(data.len().to_string())
                    .expected(entry.size_bytes.to_string()),
            );
        }
    }

    let orphans: BTreeSet<String> = reader
        .member_names()
        .iter()
        .filter(|n| n.starts_with(PAYLOAD_PREFIX) && !n.ends_with('/'))
        .filter(|n| !declared.contains(n.as_str()))
        .cloned()
        .collect();

    for name in orphans {
        if !is_safe_member_name(&name) {
            mismatches.push(HashMismatch::new(name, MismatchReason::UnsafePath));
            continue;
        }
        match read_payload(reader, &name)? {
            Ok(data) => mismatches.push(
                HashMismatch::new(&name, MismatchReason::MissingFromManifest)
                    .actual(sha256_hex(&data)),
            ),
            Err(m) => mismatches.push(m),
        }
    }

    Ok(HashCheck { mismatches })
}

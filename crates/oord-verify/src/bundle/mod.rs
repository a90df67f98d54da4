//! Oord bundle container and manifest.
//!
//! A bundle is a zip archive containing:
//! - `manifest.json`: signed metadata, file list and declared Merkle root
//! - `jwks_snapshot.json`: the key set signatures are checked against
//! - `tl_proof.json`: transparency-log inclusion proof (iff `tl_mode=included`)
//! - `files/...`: payload members, each declared by a manifest entry

pub mod manifest;
pub mod reader;

pub const MANIFEST_MEMBER: &str = "manifest.json";
pub const JWKS_MEMBER: &str = "jwks_snapshot.json";
pub const TL_PROOF_MEMBER: &str = "tl_proof.json";

pub use manifest::{
    load_json_member, BatchMeta, FileEntry, FilesNotArray, InvalidEntry, Manifest, MemberError,
    TlMode, TlModeField, PAYLOAD_PREFIX,
};
pub use reader::{is_safe_member_name, BundleError, BundleReader};

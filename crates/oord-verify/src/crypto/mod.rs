//! Cryptographic primitives for bundle verification.

pub mod canonical;
pub mod merkle;
pub mod signature;

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;

/// Base64url that accepts both padded and unpadded input.
const BASE64URL_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Decode base64url key material or signatures, padding optional.
pub fn decode_base64url(input: &str) -> Result<Vec<u8>, base64::DecodeError> {
    BASE64URL_LENIENT.decode(input.trim())
}

pub use merkle::{compute_root, MerkleError, CID_PREFIX};
pub use signature::{
    manifest_signing_bytes, tl_signing_message, verify_manifest_signature, verify_tl_signature,
    SigOutcome, SigRejection, SkipReason,
};

//! Key store snapshot (`jwks_snapshot.json`).
//!
//! The snapshot is an embedded JWKS document. Only OKP/Ed25519 keys are
//! usable for verification; other key types may be present and are reported
//! as unusable when a signature names them.
//!
//! The fingerprint is the SHA-256 of the sorted-key compact document with
//! non-ASCII written as `\uXXXX` escapes, matching what the bundle tooling
//! reports for the same key set.

use ed25519_dalek::VerifyingKey;
use serde_json::{Map, Value};

use crate::bundle::{load_json_member, BundleError, BundleReader, MemberError, JWKS_MEMBER};
use crate::crypto::canonical::{self, Escape};
use crate::crypto::decode_base64url;
use crate::reason::ReasonCode;

/// Why the key store could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum JwksError {
    #[error("jwks_snapshot.json missing from bundle")]
    Missing,

    #[error("jwks_snapshot.json is not valid JSON: {reason}")]
    InvalidJson { reason: String },

    #[error("jwks_snapshot.json {reason}")]
    InvalidShape { reason: String },

    #[error(transparent)]
    Container(BundleError),
}

impl JwksError {
    pub fn reason(&self) -> ReasonCode {
        match self {
            Self::Missing => ReasonCode::JwksMissing,
            Self::InvalidJson { .. } => ReasonCode::JwksInvalidJson,
            Self::InvalidShape { .. } => ReasonCode::JwksInvalidShape,
            Self::Container(_) => ReasonCode::ZipBad,
        }
    }
}

impl From<MemberError> for JwksError {
    fn from(e: MemberError) -> Self {
        match e {
            MemberError::Missing { .. } => Self::Missing,
            MemberError::InvalidJson { reason, .. } => Self::InvalidJson { reason },
            MemberError::NotObject { .. } => Self::InvalidShape {
                reason: "must be a JSON object".to_string(),
            },
            MemberError::Container(e) => Self::Container(e),
        }
    }
}

/// Why a key identifier could not be resolved to an Ed25519 verifying key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyLookupError {
    #[error("key_id '{kid}' not found in JWKS")]
    NotFound { kid: String },

    #[error("JWKS key '{kid}' is not an Ed25519 OKP key")]
    NotEd25519 { kid: String },

    #[error("JWKS key '{kid}' missing 'x' field")]
    MissingX { kid: String },

    #[error("invalid JWKS x encoding for key '{kid}': {reason}")]
    BadEncoding { kid: String, reason: String },

    #[error("invalid Ed25519 public key bytes for key '{kid}': {reason}")]
    BadKey { kid: String, reason: String },
}

/// A loaded key store.
#[derive(Debug, Clone)]
pub struct KeySet {
    raw: Map<String, Value>,
    fingerprint: String,
}

impl KeySet {
    /// Validate an already-parsed JWKS document.
    pub fn from_object(raw: Map<String, Value>) -> Result<Self, JwksError> {
        let keys = match raw.get("keys") {
            Some(Value::Array(keys)) if !keys.is_empty() => keys,
            _ => {
                return Err(JwksError::InvalidShape {
                    reason: "keys[] missing or empty".to_string(),
                })
            }
        };
        if !keys.iter().all(Value::is_object) {
            return Err(JwksError::InvalidShape {
                reason: "keys[] entries must be objects".to_string(),
            });
        }

        let fingerprint =
            canonical::sha256_hex(&raw, Escape::Ascii).map_err(|e| JwksError::InvalidShape {
                reason: format!("cannot be canonicalized: {e}"),
            })?;

        Ok(Self { raw, fingerprint })
    }

    /// Load `jwks_snapshot.json` from the bundle.
    pub fn load(reader: &mut BundleReader) -> Result<Self, JwksError> {
        let raw = load_json_member(reader, JWKS_MEMBER)?;
        Self::from_object(raw)
    }

    pub fn raw(&self) -> &Map<String, Value> {
        &self.raw
    }

    /// SHA-256 hex of the canonical encoding of the whole document.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    fn keys(&self) -> impl Iterator<Item = &Map<String, Value>> {
        self.raw
            .get("keys")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_object)
    }

    /// Non-empty string `kid`s, in document order.
    pub fn kids(&self) -> Vec<String> {
        self.keys()
            .filter_map(|k| k.get("kid").and_then(Value::as_str))
            .filter(|kid| !kid.is_empty())
            .map(String::from)
            .collect()
    }

    /// First key whose `kid` equals `kid`.
    pub fn find(&self, kid: &str) -> Option<&Map<String, Value>> {
        self.keys()
            .find(|k| k.get("kid").and_then(Value::as_str) == Some(kid))
    }

    /// Resolve `kid` to an Ed25519 verifying key.
    pub fn ed25519_key(&self, kid: &str) -> Result<VerifyingKey, KeyLookupError> {
        let key = self.find(kid).ok_or_else(|| KeyLookupError::NotFound {
            kid: kid.to_string(),
        })?;

        let kty = key.get("kty").and_then(Value::as_str);
        let crv = key.get("crv").and_then(Value::as_str);
        if kty != Some("OKP") || crv != Some("Ed25519") {
            return Err(KeyLookupError::NotEd25519 {
                kid: kid.to_string(),
            });
        }

        let x = match key.get("x").and_then(Value::as_str) {
            Some(x) if !x.is_empty() => x,
            _ => {
                return Err(KeyLookupError::MissingX {
                    kid: kid.to_string(),
                })
            }
        };

        let bytes = decode_base64url(x).map_err(|e| KeyLookupError::BadEncoding {
            kid: kid.to_string(),
            reason: e.to_string(),
        })?;
        let bytes: [u8; 32] = bytes.as_slice().try_into().map_err(|_| KeyLookupError::BadKey {
            kid: kid.to_string(),
            reason: format!("expected 32 bytes, got {}", bytes.len()),
        })?;

        VerifyingKey::from_bytes(&bytes).map_err(|e| KeyLookupError::BadKey {
            kid: kid.to_string(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use ed25519_dalek::SigningKey;
    use serde_json::json;

    fn key_set(value: Value) -> Result<KeySet, JwksError> {
        match value {
            Value::Object(obj) => KeySet::from_object(obj),
            _ => panic!("fixture must be an object"),
        }
    }

    fn okp(kid: &str, seed: u8) -> Value {
        let vk = SigningKey::from_bytes(&[seed; 32]).verifying_key();
        json!({"kty": "OKP", "crv": "Ed25519", "kid": kid, "x": URL_SAFE_NO_PAD.encode(vk.to_bytes())})
    }

    #[test]
    fn shape_errors() {
        for doc in [json!({}), json!({"keys": []}), json!({"keys": "x"})] {
            let err = key_set(doc).unwrap_err();
            assert_eq!(err.reason(), ReasonCode::JwksInvalidShape);
            assert_eq!(err.to_string(), "jwks_snapshot.json keys[] missing or empty");
        }

        let err = key_set(json!({"keys": [1]})).unwrap_err();
        assert_eq!(err.reason(), ReasonCode::JwksInvalidShape);
    }

    #[test]
    fn kids_skip_empty_and_missing() {
        let ks = key_set(json!({"keys": [
            okp("a", 1),
            {"kty": "OKP", "kid": ""},
            {"kty": "RSA"},
            okp("b", 2)
        ]}))
        .unwrap();
        assert_eq!(ks.kids(), ["a", "b"]);
    }

    #[test]
    fn fingerprint_ignores_key_order() {
        let a = key_set(json!({"keys": [okp("a", 1)], "z": 1})).unwrap();
        let b = key_set(json!({"z": 1, "keys": [okp("a", 1)]})).unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }

    #[test]
    fn fingerprint_escapes_non_ascii() {
        let ks = key_set(json!({
            "keys": [{"kty": "OKP", "crv": "Ed25519", "kid": "clé-€", "x": "AAAA"}],
            "note": "Zürich"
        }))
        .unwrap();
        assert_eq!(
            ks.fingerprint(),
            "0597a981b594315687aaba53527253f515cd039b0402b5e2d9ded4b855c97e5e"
        );
    }

    #[test]
    fn resolves_ed25519_keys() {
        let expected = SigningKey::from_bytes(&[7; 32]).verifying_key();
        let ks = key_set(json!({"keys": [okp("k", 7)]})).unwrap();
        assert_eq!(ks.ed25519_key("k").unwrap(), expected);
    }

    #[test]
    fn padded_x_is_accepted() {
        let vk = SigningKey::from_bytes(&[3; 32]).verifying_key();
        let x = base64::engine::general_purpose::URL_SAFE.encode(vk.to_bytes());
        assert!(x.ends_with('='));
        let ks = key_set(json!({"keys": [{"kty": "OKP", "crv": "Ed25519", "kid": "k", "x": x}]}))
            .unwrap();
        assert_eq!(ks.ed25519_key("k").unwrap(), vk);
    }

    #[test]
    fn lookup_failures() {
        let ks = key_set(json!({"keys": [
            {"kty": "RSA", "kid": "rsa"},
            {"kty": "OKP", "crv": "Ed25519", "kid": "nox"},
            {"kty": "OKP", "crv": "Ed25519", "kid": "short", "x": "AAAA"},
            {"kty": "OKP", "crv": "Ed25519", "kid": "junk", "x": "!!!"}
        ]}))
        .unwrap();

        assert!(matches!(
            ks.ed25519_key("absent"),
            Err(KeyLookupError::NotFound { .. })
        ));
        assert!(matches!(
            ks.ed25519_key("rsa"),
            Err(KeyLookupError::NotEd25519 { .. })
        ));
        assert!(matches!(
            ks.ed25519_key("nox"),
            Err(KeyLookupError::MissingX { .. })
        ));
        assert!(matches!(
            ks.ed25519_key("short"),
            Err(KeyLookupError::BadKey { .. })
        ));
        assert!(matches!(
            ks.ed25519_key("junk"),
            Err(KeyLookupError::BadEncoding { .. })
        ));
    }
}

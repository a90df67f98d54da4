//! Bundle manifest model.
//!
//! The manifest is kept as the raw JSON object it was parsed from: the
//! signature covers the canonical encoding of *every* field, including ones
//! this verifier does not know about. Typed accessors are views over it.

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::bundle::reader::{BundleError, BundleReader};

/// Prefix every payload member lives under.
pub const PAYLOAD_PREFIX: &str = "files/";

/// Why a JSON member could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum MemberError {
    #[error("{name} missing from bundle")]
    Missing { name: String },

    #[error("{name} is not valid JSON: {reason}")]
    InvalidJson { name: String, reason: String },

    #[error("{name} must be a JSON object")]
    NotObject { name: String },

    /// The container broke while reading the member.
    #[error(transparent)]
    Container(BundleError),
}

/// Read `name` and parse it as a JSON object.
pub fn load_json_member(
    reader: &mut BundleReader,
    name: &str,
) -> Result<Map<String, Value>, MemberError> {
    let bytes = match reader.read_member(name) {
        Ok(b) => b,
        Err(BundleError::MissingMember { .. }) => {
            return Err(MemberError::Missing {
                name: name.to_string(),
            })
        }
        Err(e @ BundleError::MemberTooLarge { .. }) => {
            return Err(MemberError::InvalidJson {
                name: name.to_string(),
                reason: e.to_string(),
            })
        }
        Err(e) => return Err(MemberError::Container(e)),
    };

    let value: Value = serde_json::from_slice(&bytes).map_err(|e| MemberError::InvalidJson {
        name: name.to_string(),
        reason: e.to_string(),
    })?;

    match value {
        Value::Object(obj) => Ok(obj),
        _ => Err(MemberError::NotObject {
            name: name.to_string(),
        }),
    }
}

/// Declared transparency-log linkage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TlMode {
    Included,
    None,
}

/// Raw `tl_mode` as found in the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TlModeField {
    Absent,
    Invalid(String),
    Valid(TlMode),
}

/// One payload file declared by the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: String,
    pub sha256: String,
    pub size_bytes: u64,
}

/// A `files[]` element that is not a well-formed [`FileEntry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidEntry {
    /// The entry's `path` rendered for diagnostics (`"<?>"` when the entry
    /// is not an object at all).
    pub label: String,
}

/// `files` is present but not an array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilesNotArray;

/// Parsed bundle manifest.
#[derive(Debug, Clone)]
pub struct Manifest {
    raw: Map<String, Value>,
}

impl Manifest {
    pub fn from_object(raw: Map<String, Value>) -> Self {
        Self { raw }
    }

    /// Load `manifest.json` from the bundle.
    pub fn load(reader: &mut BundleReader) -> Result<Self, MemberError> {
        load_json_member(reader, super::MANIFEST_MEMBER).map(Self::from_object)
    }

    pub fn raw(&self) -> &Map<String, Value> {
        &self.raw
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.raw.get(key).and_then(Value::as_str)
    }

    pub fn org_id(&self) -> Option<&str> {
        self.str_field("org_id")
    }

    pub fn batch_id(&self) -> Option<&str> {
        self.str_field("batch_id")
    }

    pub fn key_id(&self) -> Option<&str> {
        self.str_field("key_id")
    }

    pub fn signature(&self) -> Option<&str> {
        self.str_field("signature")
    }

    pub fn created_at_ms(&self) -> Option<i64> {
        self.raw.get("created_at_ms").and_then(lenient_int)
    }

    /// `merkle` object, if present and an object.
    pub fn merkle(&self) -> Option<&Map<String, Value>> {
        self.raw.get("merkle").and_then(Value::as_object)
    }

    /// `merkle.root_cid`, if it is a string.
    pub fn declared_root(&self) -> Option<&str> {
        self.merkle()
            .and_then(|m| m.get("root_cid"))
            .and_then(Value::as_str)
    }

    pub fn tl_mode(&self) -> TlModeField {
        match self.raw.get("tl_mode") {
            Some(Value::String(s)) => match s.as_str() {
                "included" => TlModeField::Valid(TlMode::Included),
                "none" => TlModeField::Valid(TlMode::None),
                other => TlModeField::Invalid(other.to_string()),
            },
            _ => TlModeField::Absent,
        }
    }

    /// The `files[]` list, element by element.
    ///
    /// A missing or null `files` is an empty list.
    pub fn file_entries(&self) -> Result<Vec<Result<FileEntry, InvalidEntry>>, FilesNotArray> {
        let files = match self.raw.get("files") {
            None | Some(Value::Null) => return Ok(Vec::new()),
            Some(Value::Array(files)) => files,
            Some(_) => return Err(FilesNotArray),
        };

        Ok(files.iter().map(parse_file_entry).collect())
    }

    /// Metadata visible regardless of later verification outcome.
    pub fn meta(&self) -> BatchMeta {
        let mut file_count = 0_u64;
        let mut total_bytes = 0_u64;
        if let Some(Value::Array(files)) = self.raw.get("files") {
            for fe in files.iter().filter_map(Value::as_object) {
                file_count += 1;
                if let Some(size) = fe.get("size_bytes").and_then(lenient_int) {
                    if size >= 0 {
                        total_bytes = total_bytes.saturating_add(size as u64);
                    }
                }
            }
        }

        let created_at_ms = self.created_at_ms();
        BatchMeta {
            org_id: self.org_id().map(String::from),
            batch_id: self.batch_id().map(String::from),
            created_at_ms,
            created_at: created_at_ms.and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
            key_id: self.key_id().map(String::from),
            file_count: Some(file_count),
            total_bytes: Some(total_bytes),
            merkle_root: self.declared_root().map(String::from),
        }
    }
}

fn parse_file_entry(value: &Value) -> Result<FileEntry, InvalidEntry> {
    let Some(obj) = value.as_object() else {
        return Err(InvalidEntry {
            label: "<?>".to_string(),
        });
    };

    let path = obj.get("path").and_then(Value::as_str);
    let sha256 = obj.get("sha256").and_then(Value::as_str);
    let size = obj.get("size_bytes").and_then(Value::as_u64);

    match (path, sha256, size) {
        (Some(path), Some(sha256), Some(size_bytes)) => Ok(FileEntry {
            path: path.to_string(),
            sha256: sha256.to_string(),
            size_bytes,
        }),
        _ => Err(InvalidEntry {
            label: match obj.get("path") {
                Some(Value::String(p)) => p.clone(),
                Some(other) => other.to_string(),
                None => "None".to_string(),
            },
        }),
    }
}

/// Integer from a JSON number or a string of ASCII digits.
fn lenient_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) => {
            s.parse().ok()
        }
        _ => None,
    }
}

/// Batch metadata derived from the manifest.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchMeta {
    pub org_id: Option<String>,
    pub batch_id: Option<String>,
    pub created_at_ms: Option<i64>,
    pub created_at: Option<DateTime<Utc>>,
    pub key_id: Option<String>,
    pub file_count: Option<u64>,
    pub total_bytes: Option<u64>,
    pub merkle_root: Option<String>,
}

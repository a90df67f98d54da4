//! Shared bundle fixtures for integration tests.
//!
//! Keys come from fixed seeds so every run builds byte-identical bundles.

#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use ed25519_dalek::{Signer, SigningKey};
use oord_verify::crypto::{compute_root, manifest_signing_bytes, tl_signing_message};
use oord_verify::FileEntry;
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use zip::write::SimpleFileOptions;

pub const ORG_KID: &str = "org-key-1";
pub const LOG_KID: &str = "log-key-1";
pub const TL_SEQ: u64 = 42;

pub fn org_key() -> SigningKey {
    SigningKey::from_bytes(&[0x11; 32])
}

pub fn log_key() -> SigningKey {
    SigningKey::from_bytes(&[0x22; 32])
}

pub fn jwk(kid: &str, key: &SigningKey) -> Value {
    json!({
        "kty": "OKP",
        "crv": "Ed25519",
        "kid": kid,
        "x": URL_SAFE_NO_PAD.encode(key.verifying_key().to_bytes()),
    })
}

pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

pub fn sign_b64(key: &SigningKey, message: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(key.sign(message).to_bytes())
}

pub fn as_object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(obj) => obj,
        other => panic!("expected a JSON object, got {other}"),
    }
}

/// Nested-layout TL proof signed by the log key.
pub fn signed_tl_proof(seq: u64, root: &str) -> Value {
    let sig = sign_b64(&log_key(), tl_signing_message(seq, root).as_bytes());
    json!({
        "entry": {"seq": seq, "merkle_root": root, "signer_key_id": LOG_KID},
        "sth": {"sth_sig": sig},
    })
}

/// Everything that goes into a bundle, editable before writing.
#[derive(Debug, Clone)]
pub struct Fixture {
    pub files: Vec<(String, Vec<u8>)>,
    pub manifest: Map<String, Value>,
    pub jwks: Value,
    pub tl_proof: Option<Value>,
    /// Members written verbatim after the standard ones.
    pub extra_members: Vec<(String, Vec<u8>)>,
    /// Standard members to leave out of the archive.
    pub omit: Vec<&'static str>,
    /// Raw bytes to write instead of the manifest JSON.
    pub raw_manifest: Option<Vec<u8>>,
}

impl Fixture {
    /// A fully valid bundle with `tl_mode=included` and a signed proof.
    pub fn valid() -> Self {
        let files: Vec<(String, Vec<u8>)> = vec![
            ("files/report.csv".into(), b"id,value\n1,10\n2,20\n".to_vec()),
            ("files/images/scan-001.png".into(), vec![0x89, b'P', b'N', b'G', 0, 1, 2, 3]),
            ("files/notes.txt".into(), b"batch notes".to_vec()),
        ];

        let entries: Vec<Value> = files
            .iter()
            .map(|(path, data)| {
                json!({"path": path, "sha256": sha256_hex(data), "size_bytes": data.len()})
            })
            .collect();

        let root = Self::root_of(&files);
        let manifest = as_object(json!({
            "org_id": "org-acme",
            "batch_id": "batch-0001",
            "created_at_ms": 1_700_000_000_000_i64,
            "tl_mode": "included",
            "key_id": ORG_KID,
            "signature": "",
            "merkle": {"root_cid": root},
            "files": entries,
        }));

        let mut fixture = Self {
            files,
            manifest,
            jwks: json!({"keys": [jwk(ORG_KID, &org_key()), jwk(LOG_KID, &log_key())]}),
            tl_proof: Some(signed_tl_proof(TL_SEQ, &root)),
            extra_members: Vec::new(),
            omit: Vec::new(),
            raw_manifest: None,
        };
        fixture.sign();
        fixture
    }

    /// A valid bundle with `tl_mode=none` and no proof.
    pub fn without_tl() -> Self {
        let mut fixture = Self::valid();
        fixture.tl_proof = None;
        fixture
            .manifest
            .insert("tl_mode".into(), Value::String("none".into()));
        fixture.sign();
        fixture
    }

    fn root_of(files: &[(String, Vec<u8>)]) -> String {
        let entries: Vec<FileEntry> = files
            .iter()
            .map(|(path, data)| FileEntry {
                path: path.clone(),
                sha256: sha256_hex(data),
                size_bytes: data.len() as u64,
            })
            .collect();
        compute_root(&entries).unwrap()
    }

    pub fn root(&self) -> String {
        self.manifest["merkle"]["root_cid"]
            .as_str()
            .unwrap()
            .to_string()
    }

    /// Re-sign the manifest with the org key after editing it.
    pub fn sign(&mut self) {
        self.manifest
            .insert("signature".into(), Value::String(String::new()));
        let bytes = manifest_signing_bytes(&self.manifest).unwrap();
        self.manifest
            .insert("signature".into(), Value::String(sign_b64(&org_key(), &bytes)));
    }

    /// Set a manifest field and re-sign.
    pub fn set_signed(&mut self, key: &str, value: Value) {
        self.manifest.insert(key.into(), value);
        self.sign();
    }

    /// Write the bundle as `name` under `dir`.
    pub fn write_as(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        let mut writer = zip::ZipWriter::new(File::create(&path).unwrap());
        let mut put = |name: &str, data: &[u8]| {
            writer
                .start_file(name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(data).unwrap();
        };

        if !self.omit.contains(&"manifest.json") {
            let bytes = match &self.raw_manifest {
                Some(raw) => raw.clone(),
                None => serde_json::to_vec_pretty(&self.manifest).unwrap(),
            };
            put("manifest.json", &bytes);
        }
        if !self.omit.contains(&"jwks_snapshot.json") {
            put(
                "jwks_snapshot.json",
                &serde_json::to_vec(&self.jwks).unwrap(),
            );
        }
        if let Some(proof) = &self.tl_proof {
            put("tl_proof.json", &serde_json::to_vec(proof).unwrap());
        }
        for (name, data) in &self.files {
            if !self.omit.iter().any(|o| *o == name.as_str()) {
                put(name, data);
            }
        }
        for (name, data) in &self.extra_members {
            put(name, data);
        }

        writer.finish().unwrap();
        path
    }

    pub fn write(&self, dir: &Path) -> PathBuf {
        self.write_as(dir, "bundle.zip")
    }
}

//! Merkle root recomputation over the manifest's file list.
//!
//! ```text
//! leaves  = sort_by_path(files).map(|f| sha256("leaf:" || hex_decode(f.sha256)))
//! level'  = pairs(level).map(|(l, r)| sha256("node:" || l || r)),
//!           odd trailing node promoted unchanged
//! root    = "cid:sha256:" || hex(level[0])
//! ```
//!
//! Sorting by path makes the root independent of manifest list order. Paths
//! must be unique.

use sha2::{Digest, Sha256};

use crate::bundle::{FileEntry, PAYLOAD_PREFIX};

pub const CID_PREFIX: &str = "cid:sha256:";

const LEAF_TAG: &[u8] = b"leaf:";
const NODE_TAG: &[u8] = b"node:";

/// Why a root could not be computed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MerkleError {
    #[error("cannot compute Merkle root for empty file list")]
    Empty,

    #[error("manifest file path must start with 'files/': {path}")]
    PathPrefix { path: String },

    #[error("manifest file path must not contain '..' or backslashes: {path}")]
    PathTraversal { path: String },

    #[error("sha256 must be 64 hex characters: {path}")]
    HashLength { path: String },

    #[error("sha256 must be valid hex: {path}")]
    HashHex { path: String },

    #[error("manifest file path listed more than once: {path}")]
    DuplicatePath { path: String },
}

fn leaf_hash(digest: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(LEAF_TAG);
    hasher.update(digest);
    hasher.finalize().into()
}

fn node_hash(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(NODE_TAG);
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

fn validate(entry: &FileEntry) -> Result<Vec<u8>, MerkleError> {
    if !entry.path.starts_with(PAYLOAD_PREFIX) {
        return Err(MerkleError::PathPrefix {
            path: entry.path.clone(),
        });
    }
    if entry.path.contains("..") || entry.path.contains('\\') {
        return Err(MerkleError::PathTraversal {
            path: entry.path.clone(),
        });
    }
    if entry.sha256.len() != 64 {
        return Err(MerkleError::HashLength {
            path: entry.path.clone(),
        });
    }
    hex::decode(&entry.sha256).map_err(|_| MerkleError::HashHex {
        path: entry.path.clone(),
    })
}

/// Compute the content identifier of a file list.
pub fn compute_root(files: &[FileEntry]) -> Result<String, MerkleError> {
    let mut entries = files
        .iter()
        .map(|f| validate(f).map(|digest| (f.path.as_str(), digest)))
        .collect::<Result<Vec<_>, _>>()?;

    if entries.is_empty() {
        return Err(MerkleError::Empty);
    }

    entries.sort_by(|a, b| a.0.cmp(b.0));
    // A repeated path would add a second leaf for the same member.
    if let Some(pair) = entries.windows(2).find(|pair| pair[0].0 == pair[1].0) {
        return Err(MerkleError::DuplicatePath {
            path: pair[0].0.to_string(),
        });
    }

    let mut level: Vec<[u8; 32]> = entries.iter().map(|(_, d)| leaf_hash(d)).collect();
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| match pair {
                [left, right] => node_hash(left, right),
                [single] => *single,
                _ => unreachable!("chunks(2) yields one or two nodes"),
            })
            .collect();
    }

    Ok(format!("{}{}", CID_PREFIX, hex::encode(level[0])))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str, fill: u8) -> FileEntry {
        FileEntry {
            path: path.to_string(),
            sha256: hex::encode([fill; 32]),
            size_bytes: 0,
        }
    }

    #[test]
    fn single_leaf_root_is_leaf_hash() {
        let root = compute_root(&[entry("files/a", 0xab)]).unwrap();
        let expected = format!("{}{}", CID_PREFIX, hex::encode(leaf_hash(&[0xab; 32])));
        assert_eq!(root, expected);
    }

    #[test]
    fn odd_trailing_node_is_promoted() {
        let files = [entry("files/a", 1), entry("files/b", 2), entry("files/c", 3)];
        let a = leaf_hash(&[1; 32]);
        let b = leaf_hash(&[2; 32]);
        let c = leaf_hash(&[3; 32]);
        let expected = node_hash(&node_hash(&a, &b), &c);

        assert_eq!(
            compute_root(&files).unwrap(),
            format!("{}{}", CID_PREFIX, hex::encode(expected))
        );
    }

    #[test]
    fn order_independent() {
        let forward = [entry("files/a", 1), entry("files/b", 2), entry("files/c", 3)];
        let reversed = [entry("files/c", 3), entry("files/a", 1), entry("files/b", 2)];
        assert_eq!(
            compute_root(&forward).unwrap(),
            compute_root(&reversed).unwrap()
        );
    }

    #[test]
    fn single_hash_change_changes_root() {
        let original = [entry("files/a", 1), entry("files/b", 2)];
        let mut tampered = original.clone();
        tampered[1].sha256.replace_range(63..64, "3");
        assert_ne!(
            compute_root(&original).unwrap(),
            compute_root(&tampered).unwrap()
        );
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(compute_root(&[]), Err(MerkleError::Empty));
        assert!(matches!(
            compute_root(&[entry("payload/a", 1)]),
            Err(MerkleError::PathPrefix { .. })
        ));
        assert!(matches!(
            compute_root(&[entry("files/../a", 1)]),
            Err(MerkleError::PathTraversal { .. })
        ));

        let mut short = entry("files/a", 1);
        short.sha256.truncate(63);
        assert!(matches!(
            compute_root(&[short]),
            Err(MerkleError::HashLength { .. })
        ));

        assert_eq!(
            compute_root(&[entry("files/b", 1), entry("files/a", 2), entry("files/b", 1)]),
            Err(MerkleError::DuplicatePath {
                path: "files/b".to_string()
            })
        );

        let mut not_hex = entry("files/a", 1);
        not_hex.sha256.replace_range(0..2, "zz");
        assert!(matches!(
            compute_root(&[not_hex]),
            Err(MerkleError::HashHex { .. })
        ));
    }
}

//! Read-only access to a bundle archive.
//!
//! The archive handle is owned by [`BundleReader`] and released when the
//! reader is dropped, so every early return in the pipeline closes it.
//! Members are only ever read, never extracted to disk.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use zip::result::ZipError;
use zip::ZipArchive;

/// Container-level errors.
#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    #[error("{name} missing from bundle")]
    MissingMember { name: String },

    #[error("unsafe member path '{name}'")]
    UnsafePath { name: String },

    #[error("{name}: size {size} exceeds limit {limit}")]
    MemberTooLarge { name: String, size: u64, limit: u64 },

    #[error("bad zip file: {0}")]
    Corrupt(#[from] ZipError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl BundleError {
    /// True when the container itself is unreadable (as opposed to a
    /// member-level condition the bundle's content is responsible for).
    pub fn is_container_failure(&self) -> bool {
        matches!(self, Self::Corrupt(_) | Self::Io(_))
    }
}

/// Whether an archive member name is a plain relative path.
pub fn is_safe_member_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('/')
        && !name.contains('\\')
        && !name.split('/').any(|c| c == "..")
}

/// Bundle archive opened for reading.
pub struct BundleReader {
    archive: ZipArchive<File>,
    names: Vec<String>,
    max_member_bytes: u64,
}

impl std::fmt::Debug for BundleReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BundleReader")
            .field("members", &self.names.len())
            .field("max_member_bytes", &self.max_member_bytes)
            .finish()
    }
}

impl BundleReader {
    /// Open the archive at `path`.
    ///
    /// Fails with [`BundleError::Io`] if the file cannot be opened and
    /// [`BundleError::Corrupt`] if it is not a well-formed zip container.
    pub fn open(path: &Path, max_member_bytes: u64) -> Result<Self, BundleError> {
        let file = File::open(path)?;
        let archive = ZipArchive::new(file)?;
        let names = archive.file_names().map(String::from).collect();
        Ok(Self {
            archive,
            names,
            max_member_bytes,
        })
    }

    /// All member names, in archive order.
    pub fn member_names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Read a member fully into memory.
    pub fn read_member(&mut self, name: &str) -> Result<Vec<u8>, BundleError> {
        if !is_safe_member_name(name) {
            return Err(BundleError::UnsafePath {
                name: name.to_string(),
            });
        }

        let limit = self.max_member_bytes;
        let file = match self.archive.by_name(name) {
            Ok(f) => f,
            Err(ZipError::FileNotFound) => {
                return Err(BundleError::MissingMember {
                    name: name.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };

        if file.size() > limit {
            return Err(BundleError::MemberTooLarge {
                name: name.to_string(),
                size: file.size(),
                limit,
            });
        }

        // The declared size can lie; bound the actual read as well.
        let mut content = Vec::new();
        file.take(limit.saturating_add(1))
            .read_to_end(&mut content)?;
        if content.len() as u64 > limit {
            return Err(BundleError::MemberTooLarge {
                name: name.to_string(),
                size: content.len() as u64,
                limit,
            });
        }

        Ok(content)
    }
}

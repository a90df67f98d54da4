//! Transparency-log client for online corroboration of bundle proofs.
//!
//! A bundle may embed a proof that its Merkle root was appended to a
//! transparency log at some sequence number. This crate fetches the log's
//! live entry for that sequence number so the verifier can compare the two.
//!
//! # Quick Start
//!
//! ```no_run
//! use oord_notary::{NotaryClient, NotaryConfig, TlEntrySource};
//!
//! # async fn example() -> Result<(), oord_notary::NotaryError> {
//! let client = NotaryClient::new(NotaryConfig::new("http://127.0.0.1:8000"))?;
//! let entry = client.fetch_entry(42).await?;
//! println!("live root: {:?}", entry.get("merkle_root"));
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `OORD_NOTARY_URL` | Log base URL (alias: `OORD_TL_URL`) |
//! | `OORD_TL_API_KEY` | Bearer token for non-public logs |
//! | `OORD_TL_TIMEOUT_SECS` | Request timeout in seconds (default: 5) |

use async_trait::async_trait;

pub mod client;
pub mod error;
pub mod types;

pub use client::NotaryClient;
pub use error::{NotaryError, NotaryResult};
pub use types::{EntryDocument, NotaryConfig};

/// Source of live transparency-log entries.
///
/// Implemented by [`NotaryClient`]; tests substitute in-memory doubles.
#[async_trait]
pub trait TlEntrySource: Send + Sync {
    /// Return the entry at `seq`, or one of the closed set of failures.
    async fn fetch_entry(&self, seq: u64) -> NotaryResult<EntryDocument>;
}

//! HTTP client for the transparency-log entry endpoint.
//!
//! This is the ONLY place for status code handling. The verifier sees a
//! parsed JSON object or one of the four [`NotaryError`] variants.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use tracing::debug;

use crate::error::{NotaryError, NotaryResult};
use crate::types::{EntryDocument, NotaryConfig};
use crate::TlEntrySource;

const USER_AGENT_VALUE: &str = concat!("oord-notary/", env!("CARGO_PKG_VERSION"));

/// Client for a transparency-log authority.
#[derive(Debug, Clone)]
pub struct NotaryClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl NotaryClient {
    pub fn new(config: NotaryConfig) -> NotaryResult<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        default_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let timeout = Duration::try_from_secs_f64(config.timeout_secs)
            .ok()
            .filter(|t| !t.is_zero())
            .unwrap_or(Duration::from_secs(5));

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(default_headers)
            .build()
            .map_err(|e| NotaryError::unreachable(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.filter(|k| !k.is_empty()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn entry_url(&self, seq: u64) -> String {
        format!("{}/v1/tl/entries/{}", self.base_url, seq)
    }

    /// Fetch the log's live entry at `seq`.
    pub async fn get_entry_by_seq(&self, seq: u64) -> NotaryResult<EntryDocument> {
        let url = self.entry_url(seq);
        debug!(url = %url, seq, "fetching tl entry");

        let mut request = self.client.get(&url);
        if let Some(key) = &self.api_key {
            request = request.header(AUTHORIZATION, format!("Bearer {}", key));
        }

        let response = request.send().await?;
        let status = response.status();

        match status.as_u16() {
            200..=299 => {}
            401 | 403 => {
                return Err(NotaryError::Unauthorized {
                    message: format!("http {}", status.as_u16()),
                })
            }
            404 => return Err(NotaryError::NotFound { seq }),
            code => return Err(NotaryError::unreachable(format!("http {}", code))),
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| NotaryError::unreachable(format!("failed to read response body: {}", e)))?;

        let value: serde_json::Value = serde_json::from_slice(&body)
            .map_err(|e| NotaryError::bad_response(format!("invalid json: {}", e)))?;

        match value {
            serde_json::Value::Object(obj) => Ok(obj),
            _ => Err(NotaryError::bad_response("response was not a JSON object")),
        }
    }
}

#[async_trait]
impl TlEntrySource for NotaryClient {
    async fn fetch_entry(&self, seq: u64) -> NotaryResult<EntryDocument> {
        self.get_entry_by_seq(seq).await
    }
}

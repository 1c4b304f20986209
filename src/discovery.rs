//! Endpoint discovery: directory lookup plus connection probing.
//!
//! The directory (a Supabase/PostgREST table) lists candidate feed base
//! URLs; `select_endpoint` probes them in order and keeps the first usable
//! one.

use serde::Deserialize;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::{DirectoryConfig, DIRECTORY_TABLE};
use crate::error::{IngestError, IngestResult};
use crate::feed::probe;
use crate::types::GameId;

/// Timeout for directory HTTP requests
const DIRECTORY_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Deserialize)]
struct DirectoryRecord {
    url: String,
    #[serde(default)]
    provedor: Option<String>,
}

pub struct DirectoryClient {
    http: reqwest::Client,
    config: DirectoryConfig,
}

impl DirectoryClient {
    pub fn new(config: DirectoryConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(DIRECTORY_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|e| {
                warn!("[DIRECTORY] Falling back to default HTTP client: {}", e);
                reqwest::Client::new()
            });
        Self { http, config }
    }

    /// Candidate base URLs in directory order. Empty on any failure.
    pub async fn resolve(&self) -> Vec<String> {
        match self.fetch_urls().await {
            Ok(urls) => {
                if urls.is_empty() {
                    warn!(
                        "[DIRECTORY] No URLs found for provider '{}'",
                        self.config.provider_tag
                    );
                } else {
                    info!("[DIRECTORY] Resolved {} candidate URL(s)", urls.len());
                }
                urls
            }
            Err(e) => {
                warn!("[DIRECTORY] Lookup failed: {}", e);
                Vec::new()
            }
        }
    }

    async fn fetch_urls(&self) -> IngestResult<Vec<String>> {
        let (base, key) = match (&self.config.base_url, &self.config.api_key) {
            (Some(base), Some(key)) => (base, key),
            _ => {
                return Err(IngestError::Directory(
                    "SUPABASE_URL or SUPABASE_KEY not set".to_string(),
                ))
            }
        };

        let tag = &self.config.provider_tag;
        let url = format!("{}/rest/v1/{}", base.trim_end_matches('/'), DIRECTORY_TABLE);
        let resp = self
            .http
            .get(&url)
            .query(&[("select", "url,provedor".to_string()), ("provedor", format!("eq.{}", tag))])
            .header("apikey", key)
            .header("Authorization", format!("Bearer {}", key))
            .send()
            .await
            .map_err(|e| IngestError::Directory(format!("request failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(IngestError::Directory(format!("HTTP {}", status)));
        }

        let records: Vec<DirectoryRecord> = resp
            .json()
            .await
            .map_err(|e| IngestError::Directory(format!("undecodable body: {}", e)))?;

        Ok(records
            .into_iter()
            .filter(|r| r.provedor.as_deref().map_or(true, |p| p == tag))
            .map(|r| r.url)
            .collect())
    }
}

/// Probe candidates one at a time and return the first that answers
/// without a kickout.
pub async fn select_endpoint(
    candidates: &[String],
    seed: &GameId,
    timeout: Option<Duration>,
) -> IngestResult<String> {
    for (i, candidate) in candidates.iter().enumerate() {
        info!("[PROBE] Trying candidate {}/{}: {}", i + 1, candidates.len(), candidate);
        if probe(candidate, seed, timeout).await {
            return Ok(candidate.clone());
        }
    }
    Err(IngestError::NoWorkingEndpoint {
        candidates: candidates.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_credentials_resolve_empty() {
        let client = DirectoryClient::new(DirectoryConfig {
            base_url: None,
            api_key: Some("key".to_string()),
            provider_tag: "evolution".to_string(),
        });
        assert!(client.resolve().await.is_empty());
        assert!(matches!(client.fetch_urls().await, Err(IngestError::Directory(_))));
    }

    #[tokio::test]
    async fn test_select_endpoint_without_candidates() {
        let result = select_endpoint(&[], &GameId::new("g"), None).await;
        assert!(matches!(result, Err(IngestError::NoWorkingEndpoint { candidates: 0 })));
    }
}

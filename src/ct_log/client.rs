// src/ct_log/client.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use crate::types::Endpoint;

/// Source of raw get-roots documents.
///
/// One call is one attempt; retrying is the caller's business.
#[async_trait]
pub trait RootsSource: Send + Sync {
    async fn get_roots(&self, endpoint: &Endpoint) -> Result<Vec<u8>>;
}

/// HTTP client for the RFC 6962 get-roots endpoint
pub struct CtLogClient {
    http_client: reqwest::Client,
}

impl CtLogClient {
    /// Create a new CT log client with a fixed per-request timeout
    pub fn new(request_timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(request_timeout)
            .gzip(true)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { http_client })
    }
}

#[async_trait]
impl RootsSource for CtLogClient {
    /// Endpoint: GET {submission_url}/ct/v1/get-roots
    async fn get_roots(&self, endpoint: &Endpoint) -> Result<Vec<u8>> {
        let url = endpoint.get_roots_url();

        debug!("Fetching accepted roots from {}", url);

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .context("Failed to fetch accepted roots")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("get-roots request failed with status {}", status);
        }

        let body = response
            .bytes()
            .await
            .context("Failed to read get-roots response body")?;

        debug!("Received {} bytes from {}", body.len(), url);

        Ok(body.to_vec())
    }
}

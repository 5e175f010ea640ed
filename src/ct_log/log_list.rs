// src/ct_log/log_list.rs
use anyhow::{Context, Result};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use super::types::LogList;

/// Loads V3 log lists from URLs or local files
pub struct LogListFetcher {
    http_client: reqwest::Client,
}

impl LogListFetcher {
    pub fn new(request_timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(request_timeout)
            .gzip(true)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { http_client })
    }

    /// Load one log list. `source` is an http(s) URL or a file path.
    pub async fn load(&self, source: &str) -> Result<LogList> {
        let log_list = match url::Url::parse(source) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => self.fetch(url).await?,
            _ => Self::read_file(Path::new(source)).await?,
        };

        let logs: usize = log_list
            .operators
            .iter()
            .map(|op| op.logs.len() + op.tiled_logs.len())
            .sum();
        info!(
            "Loaded log list {} ({} operators, {} logs)",
            source,
            log_list.operators.len(),
            logs
        );

        Ok(log_list)
    }

    /// Load every source in order; any failure aborts
    pub async fn load_all(&self, sources: &[String]) -> Result<Vec<LogList>> {
        let mut lists = Vec::with_capacity(sources.len());
        for source in sources {
            let list = self
                .load(source)
                .await
                .with_context(|| format!("Failed to load log list {}", source))?;
            lists.push(list);
        }
        Ok(lists)
    }

    async fn fetch(&self, url: url::Url) -> Result<LogList> {
        debug!("Fetching CT log list from {}", url);

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .context("Failed to fetch CT log list")?;

        if !response.status().is_success() {
            anyhow::bail!("Failed to fetch log list: HTTP {}", response.status());
        }

        response
            .json::<LogList>()
            .await
            .context("Failed to parse log list JSON")
    }

    async fn read_file(path: &Path) -> Result<LogList> {
        debug!("Reading CT log list from {:?}", path);

        let contents = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read log list file {:?}", path))?;

        serde_json::from_slice(&contents).context("Failed to parse log list JSON")
    }
}

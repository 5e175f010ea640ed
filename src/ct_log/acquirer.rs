// src/ct_log/acquirer.rs
use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use super::client::RootsSource;
use crate::progress::ProgressIndicator;
use crate::types::Endpoint;

/// Fixed-delay retry policy for a single endpoint
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            retry_delay: Duration::from_secs(10),
        }
    }
}

/// Result of acquiring one endpoint's get-roots document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootsOutcome {
    /// 2xx response body, not yet parsed
    Fetched(Vec<u8>),
    /// Every attempt failed; nothing is known about the log's roots
    Failed { attempts: u32, last_error: String },
}

#[derive(Debug, Clone)]
pub struct Acquisition {
    pub endpoint: Endpoint,
    pub outcome: RootsOutcome,
}

/// Fetches get-roots documents from many endpoints in parallel
pub struct RootsAcquirer {
    source: Arc<dyn RootsSource>,
    policy: RetryPolicy,
    in_flight: Arc<Semaphore>,
}

impl RootsAcquirer {
    /// `max_in_flight` caps concurrent HTTP requests across all endpoints
    pub fn new(source: Arc<dyn RootsSource>, policy: RetryPolicy, max_in_flight: usize) -> Self {
        Self {
            source,
            policy,
            in_flight: Arc::new(Semaphore::new(max_in_flight.max(1))),
        }
    }

    /// Acquire every endpoint, returning once all of them have succeeded or
    /// exhausted their attempts. Results are in the order of `endpoints`.
    pub async fn acquire_all(
        &self,
        endpoints: Vec<Endpoint>,
        progress: &ProgressIndicator,
    ) -> Vec<Acquisition> {
        info!("Fetching accepted roots from {} logs", endpoints.len());

        let handles: Vec<_> = endpoints
            .iter()
            .cloned()
            .map(|endpoint| {
                let source = Arc::clone(&self.source);
                let in_flight = Arc::clone(&self.in_flight);
                let policy = self.policy;
                let progress = progress.clone();

                tokio::spawn(async move {
                    let outcome = fetch_with_retry(source.as_ref(), &in_flight, policy, &endpoint).await;
                    progress.inc(1);
                    outcome
                })
            })
            .collect();

        let results = join_all(handles).await;

        endpoints
            .into_iter()
            .zip(results)
            .map(|(endpoint, joined)| {
                let outcome = joined.unwrap_or_else(|e| {
                    error!("Acquisition task for {} failed: {}", endpoint.submission_url, e);
                    RootsOutcome::Failed {
                        attempts: 0,
                        last_error: e.to_string(),
                    }
                });
                Acquisition { endpoint, outcome }
            })
            .collect()
    }
}

/// Run up to `policy.max_attempts` attempts with a fixed delay between them.
/// The permit is held only for the request itself, never across the delay.
async fn fetch_with_retry(
    source: &dyn RootsSource,
    in_flight: &Semaphore,
    policy: RetryPolicy,
    endpoint: &Endpoint,
) -> RootsOutcome {
    let url = endpoint.get_roots_url();
    let max_attempts = policy.max_attempts.max(1);
    let mut last_error = String::new();

    for attempt in 1..=max_attempts {
        let result = match in_flight.acquire().await {
            Ok(_permit) => source.get_roots(endpoint).await,
            Err(e) => Err(anyhow::anyhow!("Concurrency limiter closed: {}", e)),
        };

        match result {
            Ok(body) => {
                info!("Downloaded accepted roots from {} ({} bytes)", url, body.len());
                return RootsOutcome::Fetched(body);
            }
            Err(e) => {
                last_error = format!("{:#}", e);
                warn!(
                    "Error fetching {} (attempt {}/{}): {}",
                    url, attempt, max_attempts, last_error
                );
            }
        }

        if attempt < max_attempts {
            tokio::time::sleep(policy.retry_delay).await;
        }
    }

    error!(
        "Failed to download accepted roots from {} after {} attempts",
        url, max_attempts
    );

    RootsOutcome::Failed {
        attempts: max_attempts,
        last_error,
    }
}

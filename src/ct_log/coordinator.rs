// src/ct_log/coordinator.rs
use std::time::Instant;
use tracing::{error, info, warn};

use super::acquirer::{Acquisition, RootsAcquirer, RootsOutcome};
use super::universe::EndpointUniverse;
use crate::canonical::canonicalize;
use crate::progress::ProgressIndicator;
use crate::stats::RebuildSummary;
use crate::store::RootsStore;

/// Drives one rebuild: acquire every endpoint, then canonicalize and store
pub struct RebuildCoordinator {
    acquirer: RootsAcquirer,
    store: RootsStore,
    show_progress: bool,
}

impl RebuildCoordinator {
    pub fn new(acquirer: RootsAcquirer, store: RootsStore, show_progress: bool) -> Self {
        Self {
            acquirer,
            store,
            show_progress,
        }
    }

    /// Run a rebuild over `universe`.
    ///
    /// Writes start only after every endpoint has finished. Per-endpoint
    /// failures are counted in the summary and never abort the run.
    pub async fn run(&self, universe: &EndpointUniverse) -> RebuildSummary {
        let started = Instant::now();
        let endpoints = universe.endpoints();
        let mut summary = RebuildSummary::new(endpoints.len());

        let progress = ProgressIndicator::new(self.show_progress, endpoints.len() as u64);
        progress.set_message("fetching accepted roots");
        let acquisitions = self.acquirer.acquire_all(endpoints, &progress).await;
        progress.finish();

        info!("All {} downloads finished, writing store", acquisitions.len());

        for acquisition in &acquisitions {
            self.store_one(acquisition, &mut summary).await;
        }

        summary.elapsed = started.elapsed();
        summary
    }

    async fn store_one(&self, acquisition: &Acquisition, summary: &mut RebuildSummary) {
        let Acquisition { endpoint, outcome } = acquisition;
        let url = &endpoint.submission_url;

        let body = match outcome {
            RootsOutcome::Fetched(body) => body,
            RootsOutcome::Failed { attempts, last_error } => {
                summary.failed += 1;
                warn!(
                    "No accepted roots from {} (Log ID: {}) after {} attempts, keeping previous pointer: {}",
                    url, endpoint.log_id, attempts, last_error
                );
                return;
            }
        };

        summary.fetched += 1;
        summary.bytes_retrieved += body.len() as u64;
        info!(
            "Accepted roots from {} (Log ID: {}): {} bytes",
            url,
            endpoint.log_id,
            body.len()
        );

        let roots = match canonicalize(body, url) {
            Ok(roots) => roots,
            Err(e) => {
                summary.malformed_documents += 1;
                error!("{:#}", e);
                return;
            }
        };
        summary.skipped_certificates += roots.skipped;

        if let Err(e) = self.store.write(&endpoint.log_id, &roots).await {
            summary.write_failures += 1;
            error!("Failed to store accepted roots for {}: {:#}", url, e);
            return;
        }

        summary.pointers_written += 1;
        summary.blobs.insert(roots.hash);
        info!(
            "Stored {} roots for {} as {}",
            roots.certificate_count, endpoint.log_id, roots.hash
        );
    }
}

// src/ct_log/universe.rs
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use super::types::{LogEntry, LogList, PRODUCTION_TYPE_PREFIX};
use crate::types::{Endpoint, LogId};

/// Deduplicated set of endpoints to poll, keyed by submission URL
#[derive(Debug, Default, Clone)]
pub struct EndpointUniverse {
    endpoints: BTreeMap<String, LogId>,
}

impl EndpointUniverse {
    /// Flatten log lists into endpoints.
    ///
    /// Lists are applied in order, so a later list wins when two lists map the
    /// same URL to different LogIDs.
    pub fn from_log_lists<'a>(lists: impl IntoIterator<Item = &'a LogList>) -> Self {
        let mut universe = Self::default();
        for list in lists {
            universe.add_log_list(list);
        }

        info!("Endpoint universe contains {} logs", universe.len());
        universe
    }

    pub fn add_log_list(&mut self, list: &LogList) {
        for operator in &list.operators {
            for log in &operator.logs {
                self.add_log(log);
            }
            for tiled_log in &operator.tiled_logs {
                self.add_log(tiled_log);
            }
        }
    }

    fn add_log(&mut self, log: &impl LogEntry) {
        if !is_pollable(log) {
            return;
        }

        let url = log.submission_url();
        if url.is_empty() {
            warn!("Skipping log without submission URL: {}", log.description());
            return;
        }

        let log_id = match log.resolve_log_id() {
            Ok(id) => id,
            Err(e) => {
                warn!("Skipping log {}: {:#}", url, e);
                return;
            }
        };

        if let Some(previous) = self.endpoints.insert(url.to_string(), log_id) {
            if previous != log_id {
                warn!(
                    "Log lists disagree on LogID for {}: {} replaced by {}",
                    url, previous, log_id
                );
            }
        } else {
            debug!("Added {} ({})", url, log_id);
        }
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Endpoints in submission URL order
    pub fn endpoints(&self) -> Vec<Endpoint> {
        self.endpoints
            .iter()
            .map(|(url, id)| Endpoint::new(url.clone(), *id))
            .collect()
    }
}

/// A log is polled when it is usable/qualified, or when it is not a
/// production log (test logs carry no state worth gating on).
fn is_pollable(log: &impl LogEntry) -> bool {
    let usable = log.state().map(|s| s.is_usable()).unwrap_or(false);
    let production = log
        .log_type()
        .unwrap_or_default()
        .starts_with(PRODUCTION_TYPE_PREFIX);

    usable || !production
}

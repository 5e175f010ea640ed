// src/stats.rs
//! Summary of a rebuild run

use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use crate::types::RootsHash;

/// Counters for one rebuild run
#[derive(Debug, Clone, Default)]
pub struct RebuildSummary {
    /// Endpoints in the universe
    pub endpoints: usize,
    /// Endpoints that returned a document
    pub fetched: usize,
    /// Endpoints that exhausted their attempts
    pub failed: usize,
    pub bytes_retrieved: u64,
    /// Documents that were not valid JSON
    pub malformed_documents: usize,
    /// Certificates dropped for bad base64
    pub skipped_certificates: usize,
    pub pointers_written: usize,
    pub write_failures: usize,
    /// Distinct blobs written this run
    pub blobs: HashSet<RootsHash>,
    pub elapsed: Duration,
}

impl RebuildSummary {
    pub fn new(endpoints: usize) -> Self {
        Self {
            endpoints,
            ..Default::default()
        }
    }

    pub fn distinct_blobs(&self) -> usize {
        self.blobs.len()
    }

    /// Every endpoint answered and every answer was stored
    pub fn is_complete(&self) -> bool {
        self.failed == 0 && self.malformed_documents == 0 && self.write_failures == 0
    }

    /// Format elapsed time
    pub fn format_elapsed(secs: u64) -> String {
        let hours = secs / 3600;
        let minutes = (secs % 3600) / 60;
        let seconds = secs % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }
}

impl fmt::Display for RebuildSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Retrieved accepted roots from {} of {} logs ({} bytes) in {}",
            self.fetched,
            self.endpoints,
            self.bytes_retrieved,
            Self::format_elapsed(self.elapsed.as_secs())
        )?;
        writeln!(
            f,
            "  Wrote {} log pointers referencing {} distinct root lists",
            self.pointers_written,
            self.distinct_blobs()
        )?;
        write!(
            f,
            "  Unreachable: {} | Malformed: {} | Bad certificates: {} | Write failures: {}",
            self.failed, self.malformed_documents, self.skipped_certificates, self.write_failures
        )
    }
}

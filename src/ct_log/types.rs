// src/ct_log/types.rs
use anyhow::{Context, Result};
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::types::LogId;

/// Marker prefix of production log types ("prod", "production")
pub const PRODUCTION_TYPE_PREFIX: &str = "prod";

/// CT log list V3 format (gstatic, Apple, crt.sh and BIMI lists share it)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogList {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub log_list_timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub operators: Vec<Operator>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Operator {
    pub name: String,
    #[serde(default)]
    pub email: Vec<String>,
    #[serde(default)]
    pub logs: Vec<Log>,
    #[serde(default)]
    pub tiled_logs: Vec<TiledLog>,
}

/// RFC 6962 log
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Log {
    #[serde(default)]
    pub description: String,
    /// base64 SHA-256 of `key`
    pub log_id: Option<String>,
    /// base64 DER SubjectPublicKeyInfo
    pub key: Option<String>,
    #[serde(default)]
    pub url: String,
    pub mmd: Option<u64>,
    #[serde(default)]
    pub state: Option<LogState>,
    pub temporal_interval: Option<TemporalInterval>,
    #[serde(default)]
    pub log_type: Option<String>,
}

/// Static CT API (tiled) log
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TiledLog {
    #[serde(default)]
    pub description: String,
    pub log_id: Option<String>,
    pub key: Option<String>,
    #[serde(default)]
    pub submission_url: String,
    #[serde(default)]
    pub monitoring_url: String,
    pub mmd: Option<u64>,
    #[serde(default)]
    pub state: Option<LogState>,
    pub temporal_interval: Option<TemporalInterval>,
    #[serde(default)]
    pub log_type: Option<String>,
}

/// Log state; a well-formed list sets exactly one field
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogState {
    #[serde(default)]
    pub usable: Option<StateTimestamp>,
    #[serde(default)]
    pub qualified: Option<StateTimestamp>,
    #[serde(default)]
    pub readonly: Option<StateTimestamp>,
    #[serde(default)]
    pub retired: Option<StateTimestamp>,
    #[serde(default)]
    pub rejected: Option<StateTimestamp>,
    #[serde(default)]
    pub pending: Option<StateTimestamp>,
}

impl LogState {
    /// Usable or qualified: the log is accepting submissions
    pub fn is_usable(&self) -> bool {
        self.usable.is_some() || self.qualified.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTimestamp {
    pub timestamp: DateTime<Utc>,
}

/// Validity window of a log, `[start_inclusive, end_exclusive)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporalInterval {
    pub start_inclusive: DateTime<Utc>,
    pub end_exclusive: DateTime<Utc>,
}

/// Fields shared by RFC 6962 and tiled log entries
pub trait LogEntry {
    fn description(&self) -> &str;
    fn submission_url(&self) -> &str;
    fn log_id_b64(&self) -> Option<&str>;
    fn key_b64(&self) -> Option<&str>;
    fn state(&self) -> Option<&LogState>;
    fn log_type(&self) -> Option<&str>;

    /// Resolve the log's identity.
    ///
    /// The key is authoritative: when present its SHA-256 is the LogID, and a
    /// disagreeing `log_id` field is reported and ignored.
    fn resolve_log_id(&self) -> Result<LogId> {
        let engine = base64::engine::general_purpose::STANDARD;

        let declared = match self.log_id_b64() {
            Some(b64) => {
                let raw = engine
                    .decode(b64)
                    .with_context(|| format!("Invalid log_id base64 for {}", self.submission_url()))?;
                Some(LogId::from_slice(&raw)?)
            }
            None => None,
        };

        let derived = match self.key_b64() {
            Some(b64) => {
                let der = engine
                    .decode(b64)
                    .with_context(|| format!("Invalid key base64 for {}", self.submission_url()))?;
                Some(LogId::digest(&der))
            }
            None => None,
        };

        match (declared, derived) {
            (Some(declared), Some(derived)) => {
                if declared != derived {
                    warn!(
                        "log_id {} for {} does not match its key (SHA-256 {}), using key",
                        declared,
                        self.submission_url(),
                        derived
                    );
                }
                Ok(derived)
            }
            (Some(id), None) | (None, Some(id)) => Ok(id),
            (None, None) => anyhow::bail!(
                "Log {} has neither log_id nor key",
                self.submission_url()
            ),
        }
    }
}

impl LogEntry for Log {
    fn description(&self) -> &str {
        &self.description
    }
    fn submission_url(&self) -> &str {
        &self.url
    }
    fn log_id_b64(&self) -> Option<&str> {
        self.log_id.as_deref()
    }
    fn key_b64(&self) -> Option<&str> {
        self.key.as_deref()
    }
    fn state(&self) -> Option<&LogState> {
        self.state.as_ref()
    }
    fn log_type(&self) -> Option<&str> {
        self.log_type.as_deref()
    }
}

impl LogEntry for TiledLog {
    fn description(&self) -> &str {
        &self.description
    }
    fn submission_url(&self) -> &str {
        &self.submission_url
    }
    fn log_id_b64(&self) -> Option<&str> {
        self.log_id.as_deref()
    }
    fn key_b64(&self) -> Option<&str> {
        self.key.as_deref()
    }
    fn state(&self) -> Option<&LogState> {
        self.state.as_ref()
    }
    fn log_type(&self) -> Option<&str> {
        self.log_type.as_deref()
    }
}

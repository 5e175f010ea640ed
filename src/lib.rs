// src/lib.rs
// Library interface for ct-roots
pub mod canonical;
pub mod cli;
pub mod config;
pub mod ct_log;
pub mod output;
pub mod progress;
pub mod stats;
pub mod store;
pub mod types;

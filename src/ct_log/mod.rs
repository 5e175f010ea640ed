// src/ct_log/mod.rs
pub mod acquirer;
pub mod client;
pub mod coordinator;
pub mod log_list;
pub mod types;
pub mod universe;

pub use acquirer::{Acquisition, RetryPolicy, RootsAcquirer, RootsOutcome};
pub use client::{CtLogClient, RootsSource};
pub use coordinator::RebuildCoordinator;
pub use log_list::LogListFetcher;
pub use types::{LogList, Operator};
pub use universe::EndpointUniverse;

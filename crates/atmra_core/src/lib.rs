//! ATM repair analytics: import repair history, keep it in SQLite, and build the
//! most-common-causes, longest-repairs and recurring-failures reports over a snapshot.

pub mod analytics;
pub mod config;
pub mod db;
pub mod demo;
pub mod domain;
pub mod error;
pub mod ingest;
pub mod metrics;
pub mod normalize;
pub mod repo;
pub mod report;
pub mod validate;

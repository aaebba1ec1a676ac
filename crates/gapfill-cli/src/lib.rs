//! CLI library components for the gap-imputation tool.
//!
//! The binary lives in `main.rs`; this library exposes the input loaders and
//! the logging setup for integration tests.

pub mod ingest;
pub mod logging;

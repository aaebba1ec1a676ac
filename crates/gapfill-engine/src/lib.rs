//! Stratified gap imputation for tabular records.
//!
//! The engine fills missing cells of a Polars [`DataFrame`] using per-variable
//! metadata and a type-to-method mapping:
//!
//! - **controller**: the [`GapImputer`] run driver and its round fallback
//! - **fill**: per-stratum fill routines for the six methods
//! - **expr**: the boolean filter expressions used by variable metadata
//! - **mask**: tracking of originally-missing cells across rounds
//! - **report**: per-round and per-column outcome reporting
//! - **values**: typed column access and data-type preserving write-back
//!
//! [`DataFrame`]: polars::prelude::DataFrame

pub mod controller;
pub mod error;
pub mod expr;
pub mod fill;
pub mod mask;
mod pass;
pub mod report;
pub mod values;

pub use controller::{GapImputer, ImputeOptions};
pub use error::{EngineError, Result};
pub use expr::{FilterError, RowFilter};
pub use fill::{FillOutcome, RefusalReason, fill_missing_values};
pub use mask::InvalidDonorMask;
pub use report::{ColumnOutcome, ColumnTotal, Resolution, RoundReport, RunReport};
pub use values::ColumnValues;

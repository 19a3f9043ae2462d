//! Batch operations across the registry.
//!
//! - [`engine::BatchEngine`]: scan, apply-to-all, switch-all, pull-all
//! - [`outcome::OperationOutcome`] / [`outcome::BatchSummary`]: per-repository results
//! - [`outcome::ApplySummary`]: "set for N of M repositories"

pub mod engine;
pub mod outcome;

pub use engine::{BatchEngine, SwitchPolicy};
pub use outcome::{ApplySummary, BatchSummary, OperationKind, OperationOutcome, OutcomeStatus};

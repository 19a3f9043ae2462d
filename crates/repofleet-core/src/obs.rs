//! Structured observability hooks for scans and batches.
//!
//! Every function emits a single event with a stable `event` field so that
//! JSON logs (`--log-json`) can be filtered by lifecycle stage.

use tracing::{info, warn};

use crate::batch::outcome::{BatchSummary, OperationKind, OperationOutcome, OutcomeStatus};

/// Span wrapping one batch; attach with `tracing::Instrument`.
pub fn batch_span(kind: OperationKind) -> tracing::Span {
    tracing::info_span!("repofleet.batch", kind = %kind)
}

/// Emit event: registry rebuilt from a discovery pass.
pub fn emit_scan_finished(repos: usize) {
    info!(event = "scan.finished", repos = repos);
}

/// Emit event: batch about to start.
pub fn emit_batch_started(kind: OperationKind, repos: usize) {
    info!(event = "batch.started", kind = %kind, repos = repos);
}

/// Emit event: one repository finished. Failures log at `warn`.
pub fn emit_outcome(outcome: &OperationOutcome) {
    let repo = outcome.path.display();
    match outcome.status {
        OutcomeStatus::Failed => warn!(
            event = "batch.outcome",
            kind = %outcome.kind,
            repo = %repo,
            status = "failed",
            message = %outcome.message.trim(),
        ),
        OutcomeStatus::Succeeded => {
            info!(event = "batch.outcome", kind = %outcome.kind, repo = %repo, status = "succeeded")
        }
        OutcomeStatus::Skipped => info!(
            event = "batch.outcome",
            kind = %outcome.kind,
            repo = %repo,
            status = "skipped",
            message = %outcome.message,
        ),
    }
}

/// Emit event: batch finished.
pub fn emit_batch_finished(summary: &BatchSummary) {
    info!(
        event = "batch.finished",
        kind = %summary.kind,
        succeeded = summary.succeeded,
        failed = summary.failed,
        skipped = summary.skipped,
    );
}

/// Emit event: apply-to-all finished.
pub fn emit_apply_finished(branch: &str, applied: usize, total: usize) {
    info!(event = "apply.finished", branch = %branch, applied = applied, total = total);
}

//! Per-repository batch results.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::pool::TaskAbort;

/// Which batch produced an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Checkout,
    Pull,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Checkout => write!(f, "checkout"),
            OperationKind::Pull => write!(f, "pull"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Succeeded,
    Failed,
    /// git was not invoked for this repository.
    Skipped,
}

/// Result of one repository's part in a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationOutcome {
    pub path: PathBuf,
    pub kind: OperationKind,
    pub status: OutcomeStatus,
    /// git output or a synthesized explanation.
    pub message: String,
}

impl OperationOutcome {
    pub fn succeeded(
        path: impl Into<PathBuf>,
        kind: OperationKind,
        message: impl Into<String>,
    ) -> Self {
        Self::with_status(path, kind, OutcomeStatus::Succeeded, message)
    }

    pub fn failed(
        path: impl Into<PathBuf>,
        kind: OperationKind,
        message: impl Into<String>,
    ) -> Self {
        Self::with_status(path, kind, OutcomeStatus::Failed, message)
    }

    pub fn skipped(
        path: impl Into<PathBuf>,
        kind: OperationKind,
        message: impl Into<String>,
    ) -> Self {
        Self::with_status(path, kind, OutcomeStatus::Skipped, message)
    }

    fn with_status(
        path: impl Into<PathBuf>,
        kind: OperationKind,
        status: OutcomeStatus,
        message: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            kind,
            status,
            message: message.into(),
        }
    }

    /// Outcome for a repository whose task never produced a result.
    pub fn aborted(path: &Path, kind: OperationKind, reason: TaskAbort) -> Self {
        match reason {
            TaskAbort::Cancelled => Self::skipped(path, kind, "cancelled before start"),
            TaskAbort::Panicked(detail) => {
                Self::failed(path, kind, format!("worker panicked: {detail}"))
            }
        }
    }

    pub fn success(&self) -> bool {
        self.status == OutcomeStatus::Succeeded
    }

    pub fn is_skipped(&self) -> bool {
        self.status == OutcomeStatus::Skipped
    }
}

/// Tally of one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub kind: OperationKind,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl BatchSummary {
    pub fn from_outcomes(kind: OperationKind, outcomes: &[OperationOutcome]) -> Self {
        let mut summary = Self {
            kind,
            succeeded: 0,
            failed: 0,
            skipped: 0,
        };
        for outcome in outcomes {
            match outcome.status {
                OutcomeStatus::Succeeded => summary.succeeded += 1,
                OutcomeStatus::Failed => summary.failed += 1,
                OutcomeStatus::Skipped => summary.skipped += 1,
            }
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.failed + self.skipped
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed == 0 && self.skipped == 0
    }
}

/// Result of "apply target to all".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplySummary {
    pub branch: String,
    /// `(path, applied)` in registry order.
    pub results: Vec<(PathBuf, bool)>,
}

impl ApplySummary {
    pub fn applied_count(&self) -> usize {
        self.results.iter().filter(|(_, applied)| *applied).count()
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    /// Repositories that do not have the branch.
    pub fn missing(&self) -> impl Iterator<Item = &PathBuf> {
        self.results
            .iter()
            .filter(|(_, applied)| !applied)
            .map(|(path, _)| path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts_each_status() {
        let outcomes = vec![
            OperationOutcome::succeeded("/a", OperationKind::Checkout, "ok"),
            OperationOutcome::failed("/b", OperationKind::Checkout, "error: pathspec"),
            OperationOutcome::skipped("/c", OperationKind::Checkout, "no branch selected"),
            OperationOutcome::succeeded("/d", OperationKind::Checkout, "ok"),
        ];
        let summary = BatchSummary::from_outcomes(OperationKind::Checkout, &outcomes);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.total(), 4);
        assert!(!summary.all_succeeded());
    }

    #[test]
    fn test_aborted_outcomes() {
        let cancelled =
            OperationOutcome::aborted(Path::new("/a"), OperationKind::Pull, TaskAbort::Cancelled);
        assert!(cancelled.is_skipped());
        assert!(!cancelled.success());

        let panicked = OperationOutcome::aborted(
            Path::new("/a"),
            OperationKind::Pull,
            TaskAbort::Panicked("boom".into()),
        );
        assert_eq!(panicked.status, OutcomeStatus::Failed);
        assert!(panicked.message.contains("boom"));
    }

    #[test]
    fn test_outcome_json_shape() {
        let outcome = OperationOutcome::failed("/w/a", OperationKind::Checkout, "nope");
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["kind"], "checkout");
        assert_eq!(json["status"], "failed");
        assert_eq!(json["path"], "/w/a");
    }

    #[test]
    fn test_apply_summary_counts() {
        let summary = ApplySummary {
            branch: "dev".into(),
            results: vec![
                (PathBuf::from("/a"), true),
                (PathBuf::from("/b"), false),
                (PathBuf::from("/c"), true),
            ],
        };
        assert_eq!(summary.applied_count(), 2);
        assert_eq!(summary.total(), 3);
        assert_eq!(summary.missing().collect::<Vec<_>>(), vec![&PathBuf::from("/b")]);
    }
}

//! Per-repository branch inspection.
//!
//! Inspection never fails: git errors degrade to the [`UNKNOWN_BRANCH`] /
//! [`ERROR_BRANCH`] sentinels or to an empty branch list, so one broken
//! repository cannot block discovery of the others.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::git::{GitBackend, GitOp};
use crate::registry::RepositoryState;

/// git ran but did not name a branch (e.g. detached HEAD).
pub const UNKNOWN_BRANCH: &str = "unknown";
/// The git invocation itself failed.
pub const ERROR_BRANCH: &str = "error";

/// True for real branch names, false for sentinels and empty strings.
pub fn is_usable_branch(name: &str) -> bool {
    !name.is_empty() && name != UNKNOWN_BRANCH && name != ERROR_BRANCH
}

/// Queries branch state through a [`GitBackend`].
#[derive(Clone)]
pub struct BranchInspector {
    backend: Arc<dyn GitBackend>,
}

impl BranchInspector {
    pub fn new(backend: Arc<dyn GitBackend>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<dyn GitBackend> {
        &self.backend
    }

    /// Short name of the branch checked out in `repo`, or a sentinel.
    pub async fn current_branch(&self, repo: &Path) -> String {
        match self.backend.run(repo, &GitOp::CurrentBranch).await {
            Ok(out) if out.success => parse_current_branch(&out.stdout),
            Ok(out) => {
                debug!(
                    repo = %repo.display(),
                    diagnostic = %out.diagnostic(),
                    "HEAD lookup failed"
                );
                ERROR_BRANCH.to_string()
            }
            Err(err) => {
                warn!(repo = %repo.display(), error = %err, "HEAD lookup could not run");
                ERROR_BRANCH.to_string()
            }
        }
    }

    /// Local and remote-tracking branch names, deduplicated and sorted
    /// case-insensitively. Empty on any failure.
    pub async fn list_branches(&self, repo: &Path) -> Vec<String> {
        match self.backend.run(repo, &GitOp::ListBranches).await {
            Ok(out) if out.success => normalize_branch_list(&out.stdout),
            Ok(out) => {
                debug!(
                    repo = %repo.display(),
                    diagnostic = %out.diagnostic(),
                    "branch listing failed"
                );
                Vec::new()
            }
            Err(err) => {
                warn!(repo = %repo.display(), error = %err, "branch listing could not run");
                Vec::new()
            }
        }
    }

    /// Fresh state for `repo`, with the target defaulting to the current
    /// branch.
    pub async fn inspect(&self, repo: &Path) -> RepositoryState {
        let current = self.current_branch(repo).await;
        let branches = self.list_branches(repo).await;
        RepositoryState::new(current, branches)
    }
}

/// Map `git rev-parse --abbrev-ref HEAD` output to a branch name.
///
/// Empty output and the literal `HEAD` printed for a detached head both
/// become [`UNKNOWN_BRANCH`].
pub fn parse_current_branch(stdout: &str) -> String {
    match stdout.lines().map(str::trim).find(|l| !l.is_empty()) {
        Some("HEAD") | None => UNKNOWN_BRANCH.to_string(),
        Some(name) => name.to_string(),
    }
}

/// Turn raw branch-listing output into a clean branch list.
///
/// Lines are trimmed; empty lines and lines containing whitespace (git's
/// `(HEAD detached at ...)` pseudo-entry, or garbage) are dropped.
pub fn normalize_branch_list(stdout: &str) -> Vec<String> {
    let unique: HashSet<&str> = stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.contains(char::is_whitespace))
        .collect();
    let mut branches: Vec<String> = unique.into_iter().map(str::to_string).collect();
    sort_case_insensitive(&mut branches);
    branches
}

/// Case-insensitive order, ties broken by byte order so the result is total.
pub fn sort_case_insensitive(names: &mut [String]) {
    names.sort_by(|a, b| {
        a.to_lowercase()
            .cmp(&b.to_lowercase())
            .then_with(|| a.cmp(b))
    });
}

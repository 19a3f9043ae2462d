//! Batch operations over every repository in a [`Registry`].
//!
//! Each batch walks the registry in discovery order and yields exactly one
//! [`OperationOutcome`] per repository. Work fans out through the engine's
//! [`WorkerPool`]; outcomes are still delivered in registry order. A failing
//! repository never stops the batch, and nothing is retried.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, Instrument};

use crate::batch::outcome::{ApplySummary, BatchSummary, OperationKind, OperationOutcome};
use crate::config::FleetConfig;
use crate::error::FleetResult;
use crate::git::{CliGit, GitBackend, GitOp};
use crate::inspector::BranchInspector;
use crate::locator;
use crate::obs;
use crate::pool::WorkerPool;
use crate::registry::{Registry, RepositoryState};

/// How free-form targets are treated by [`BatchEngine::switch_all_to_target`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwitchPolicy {
    /// Attempt checkout of whatever the target says.
    #[default]
    Permissive,
    /// Skip repositories whose target is not among their known branches.
    RequireKnownBranch,
}

#[derive(Debug, Clone)]
enum SwitchAction {
    Checkout(String),
    Skip(String),
    Reject(String),
}

/// Executes discovery, apply-to-all, switch-all and pull-all.
#[derive(Clone)]
pub struct BatchEngine {
    backend: Arc<dyn GitBackend>,
    pool: WorkerPool,
    policy: SwitchPolicy,
}

impl BatchEngine {
    pub fn new(backend: Arc<dyn GitBackend>, pool: WorkerPool) -> Self {
        Self {
            backend,
            pool,
            policy: SwitchPolicy::default(),
        }
    }

    /// Engine backed by the git executable, sized and configured from `config`.
    pub fn from_config(config: &FleetConfig) -> Self {
        let policy = if config.strict_targets {
            SwitchPolicy::RequireKnownBranch
        } else {
            SwitchPolicy::Permissive
        };
        Self::new(
            Arc::new(CliGit::from_config(config)),
            WorkerPool::new(config.concurrency),
        )
        .with_policy(policy)
    }

    pub fn with_policy(mut self, policy: SwitchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> SwitchPolicy {
        self.policy
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    pub fn inspector(&self) -> BranchInspector {
        BranchInspector::new(Arc::clone(&self.backend))
    }

    /// Discover repositories under `root` and rebuild `registry` from them.
    ///
    /// Returns the number of repositories found.
    pub async fn scan(
        &self,
        registry: &mut Registry,
        root: &Path,
        max_depth: usize,
    ) -> FleetResult<usize> {
        let walk_root = root.to_path_buf();
        let repos = tokio::task::spawn_blocking(move || locator::discover(&walk_root, max_depth))
            .await
            .map_err(|e| std::io::Error::other(format!("discovery task failed: {e}")))?;
        registry.rebuild(repos, &self.inspector(), &self.pool).await?;
        Ok(registry.len())
    }

    /// Set every repository's target to `branch` where the branch exists.
    ///
    /// Repositories without the branch keep their current target.
    pub fn apply_target_to_all(&self, registry: &mut Registry, branch: &str) -> ApplySummary {
        let branch = branch.trim();
        let paths: Vec<PathBuf> = registry.paths().to_vec();
        let mut results = Vec::with_capacity(paths.len());

        for path in paths {
            let applied = match registry.state_mut(&path) {
                Ok(state) if !branch.is_empty() && state.has_branch(branch) => {
                    state.target_branch = branch.to_string();
                    true
                }
                _ => false,
            };
            results.push((path, applied));
        }

        let summary = ApplySummary {
            branch: branch.to_string(),
            results,
        };
        obs::emit_apply_finished(branch, summary.applied_count(), summary.total());
        summary
    }

    /// Check out each repository's target branch.
    pub async fn switch_all_to_target(&self, registry: &mut Registry) -> Vec<OperationOutcome> {
        self.switch_all_to_target_with(registry, |_| {}).await
    }

    /// [`BatchEngine::switch_all_to_target`], reporting each outcome to
    /// `on_outcome` in registry order as soon as it is available.
    ///
    /// Repositories that switched successfully get their current branch
    /// refreshed to the target; all others are left untouched.
    pub async fn switch_all_to_target_with<F>(
        &self,
        registry: &mut Registry,
        mut on_outcome: F,
    ) -> Vec<OperationOutcome>
    where
        F: FnMut(&OperationOutcome),
    {
        let jobs: Vec<(PathBuf, SwitchAction)> = registry
            .iter()
            .map(|(path, state)| (path.clone(), self.plan_switch(&state.target_branch, state)))
            .collect();
        let paths: Vec<PathBuf> = jobs.iter().map(|(p, _)| p.clone()).collect();

        obs::emit_batch_started(OperationKind::Checkout, jobs.len());
        let backend = Arc::clone(&self.backend);
        let outcomes = self
            .pool
            .run_ordered(
                jobs,
                move |(path, action)| {
                    let backend = Arc::clone(&backend);
                    async move { run_switch(backend.as_ref(), path, action).await }
                },
                |idx, reason| {
                    OperationOutcome::aborted(&paths[idx], OperationKind::Checkout, reason)
                },
                |_, outcome| {
                    obs::emit_outcome(outcome);
                    on_outcome(outcome);
                },
            )
            .instrument(obs::batch_span(OperationKind::Checkout))
            .await;

        for outcome in outcomes.iter().filter(|o| o.success()) {
            if let Ok(state) = registry.state_mut(&outcome.path) {
                state.current_branch = state.target_branch.trim().to_string();
            }
        }

        obs::emit_batch_finished(&BatchSummary::from_outcomes(
            OperationKind::Checkout,
            &outcomes,
        ));
        outcomes
    }

    /// Run `git pull` in every repository.
    pub async fn pull_all_repos(&self, registry: &Registry) -> Vec<OperationOutcome> {
        self.pull_all_repos_with(registry, |_| {}).await
    }

    /// [`BatchEngine::pull_all_repos`] with in-order outcome reporting.
    ///
    /// The message is git's stdout followed by its stderr, whether or not
    /// the pull succeeded. Branch state is not refreshed.
    pub async fn pull_all_repos_with<F>(
        &self,
        registry: &Registry,
        mut on_outcome: F,
    ) -> Vec<OperationOutcome>
    where
        F: FnMut(&OperationOutcome),
    {
        let paths: Vec<PathBuf> = registry.paths().to_vec();

        obs::emit_batch_started(OperationKind::Pull, paths.len());
        let backend = Arc::clone(&self.backend);
        let outcomes = self
            .pool
            .run_ordered(
                paths.clone(),
                move |path| {
                    let backend = Arc::clone(&backend);
                    async move { run_pull(backend.as_ref(), path).await }
                },
                |idx, reason| OperationOutcome::aborted(&paths[idx], OperationKind::Pull, reason),
                |_, outcome| {
                    obs::emit_outcome(outcome);
                    on_outcome(outcome);
                },
            )
            .instrument(obs::batch_span(OperationKind::Pull))
            .await;

        obs::emit_batch_finished(&BatchSummary::from_outcomes(OperationKind::Pull, &outcomes));
        outcomes
    }

    fn plan_switch(&self, target: &str, state: &RepositoryState) -> SwitchAction {
        let target = target.trim();
        if target.is_empty() {
            return SwitchAction::Skip("no branch selected".to_string());
        }
        if target.starts_with('-') {
            return SwitchAction::Reject(format!("invalid branch name '{target}'"));
        }
        if self.policy == SwitchPolicy::RequireKnownBranch && !state.has_branch(target) {
            return SwitchAction::Skip(format!("branch '{target}' not found"));
        }
        SwitchAction::Checkout(target.to_string())
    }
}

async fn run_switch(
    backend: &dyn GitBackend,
    path: PathBuf,
    action: SwitchAction,
) -> OperationOutcome {
    let kind = OperationKind::Checkout;
    let target = match action {
        SwitchAction::Skip(reason) => return OperationOutcome::skipped(path, kind, reason),
        SwitchAction::Reject(reason) => return OperationOutcome::failed(path, kind, reason),
        SwitchAction::Checkout(target) => target,
    };

    info!(repo = %path.display(), branch = %target, "switching branch");
    match backend.run(&path, &GitOp::Checkout(target.clone())).await {
        Ok(out) if out.success => {
            OperationOutcome::succeeded(path, kind, format!("switched to '{target}'"))
        }
        Ok(out) => OperationOutcome::failed(path, kind, out.diagnostic()),
        Err(err) => OperationOutcome::failed(path, kind, err.to_string()),
    }
}

async fn run_pull(backend: &dyn GitBackend, path: PathBuf) -> OperationOutcome {
    let kind = OperationKind::Pull;
    info!(repo = %path.display(), "pulling");
    match backend.run(&path, &GitOp::Pull).await {
        Ok(out) if out.success => OperationOutcome::succeeded(path, kind, out.combined()),
        Ok(out) => OperationOutcome::failed(path, kind, out.combined()),
        Err(err) => OperationOutcome::failed(path, kind, err.to_string()),
    }
}

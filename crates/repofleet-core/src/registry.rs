//! In-memory registry of discovered repositories and their branch state.
//!
//! The registry is owned by the caller and passed explicitly to the batch
//! engine. It keeps discovery order for display and batch iteration, and is
//! replaced wholesale on every rebuild: target edits made before a re-scan
//! are not carried over.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{FleetError, FleetResult};
use crate::inspector::{BranchInspector, ERROR_BRANCH};
use crate::obs;
use crate::pool::{TaskAbort, WorkerPool};

/// Branch state of one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryState {
    /// Branch checked out at the last inspection or successful switch.
    pub current_branch: String,
    /// Local and remote-tracking branches, deduplicated and sorted
    /// case-insensitively.
    pub all_branches: Vec<String>,
    /// Operator-assigned branch to switch to.
    pub target_branch: String,
}

impl RepositoryState {
    pub fn new(current_branch: impl Into<String>, all_branches: Vec<String>) -> Self {
        let current_branch = current_branch.into();
        Self {
            target_branch: current_branch.clone(),
            current_branch,
            all_branches,
        }
    }

    /// Whether `branch` is one of the repository's known branches.
    pub fn has_branch(&self, branch: &str) -> bool {
        self.all_branches.iter().any(|b| b == branch)
    }
}

/// A registry row, as exposed to presentation code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryEntry {
    pub path: PathBuf,
    #[serde(flatten)]
    pub state: RepositoryState,
}

/// Ordered map from repository path to [`RepositoryState`].
#[derive(Debug, Clone, Default)]
pub struct Registry {
    order: Vec<PathBuf>,
    entries: HashMap<PathBuf, RepositoryState>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every entry with a fresh inspection of `repos`.
    ///
    /// Repositories are inspected concurrently under `pool`'s limit; the
    /// registry is only swapped once all of them are done. If the pool is
    /// cancelled first, the registry keeps its previous contents and
    /// [`FleetError::Cancelled`] is returned.
    pub async fn rebuild(
        &mut self,
        repos: Vec<PathBuf>,
        inspector: &BranchInspector,
        pool: &WorkerPool,
    ) -> FleetResult<()> {
        let inspector = inspector.clone();
        let states = pool
            .run_ordered(
                repos.clone(),
                move |path| {
                    let inspector = inspector.clone();
                    async move { Some(inspector.inspect(&path).await) }
                },
                |_, reason| match reason {
                    TaskAbort::Cancelled => None,
                    TaskAbort::Panicked(_) => Some(RepositoryState::new(ERROR_BRANCH, Vec::new())),
                },
                |_, _| {},
            )
            .await;

        let mut entries = HashMap::with_capacity(repos.len());
        let mut order = Vec::with_capacity(repos.len());
        for (path, state) in repos.into_iter().zip(states) {
            let state = state.ok_or(FleetError::Cancelled)?;
            // A path listed twice keeps its first position.
            if entries.insert(path.clone(), state).is_none() {
                order.push(path);
            }
        }

        self.order = order;
        self.entries = entries;
        info!(repos = self.order.len(), "registry rebuilt");
        obs::emit_scan_finished(self.order.len());
        Ok(())
    }

    /// State of `path` as of the last rebuild.
    pub fn get(&self, path: &Path) -> FleetResult<&RepositoryState> {
        self.entries.get(path).ok_or_else(|| FleetError::RepoNotFound {
            path: path.to_path_buf(),
        })
    }

    /// Assign a target branch. No validation against known branches.
    pub fn set_target(&mut self, path: &Path, branch: impl Into<String>) -> FleetResult<()> {
        let state = self.state_mut(path)?;
        state.target_branch = branch.into();
        Ok(())
    }

    pub(crate) fn state_mut(&mut self, path: &Path) -> FleetResult<&mut RepositoryState> {
        self.entries
            .get_mut(path)
            .ok_or_else(|| FleetError::RepoNotFound {
                path: path.to_path_buf(),
            })
    }

    /// Repository paths in discovery order.
    pub fn paths(&self) -> &[PathBuf] {
        &self.order
    }

    /// `(path, state)` pairs in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = (&PathBuf, &RepositoryState)> {
        self.order
            .iter()
            .filter_map(|p| self.entries.get(p).map(|s| (p, s)))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    /// Owned copy of every row, in discovery order.
    pub fn snapshot(&self) -> Vec<RepositoryEntry> {
        self.iter()
            .map(|(path, state)| RepositoryEntry {
                path: path.clone(),
                state: state.clone(),
            })
            .collect()
    }

    /// Build a registry from already known states, in the given order.
    pub fn from_states(states: impl IntoIterator<Item = (PathBuf, RepositoryState)>) -> Self {
        let mut registry = Self::new();
        for (path, state) in states {
            if registry.entries.insert(path.clone(), state).is_none() {
                registry.order.push(path);
            }
        }
        registry
    }
}

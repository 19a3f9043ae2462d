//! repofleet core library
//!
//! Discovers git repositories under a root directory, inspects their
//! branches, and runs checkout / pull batches across all of them with one
//! outcome per repository.

pub mod batch;
pub mod config;
pub mod error;
pub mod git;
pub mod inspector;
pub mod locator;
pub mod obs;
pub mod pool;
pub mod registry;
pub mod telemetry;

pub use batch::{
    ApplySummary, BatchEngine, BatchSummary, OperationKind, OperationOutcome, OutcomeStatus,
    SwitchPolicy,
};
pub use config::FleetConfig;
pub use error::{FleetError, FleetResult};
pub use git::{CliGit, GitBackend, GitOp, GitOutput};
pub use inspector::{
    is_usable_branch, normalize_branch_list, BranchInspector, ERROR_BRANCH, UNKNOWN_BRANCH,
};
pub use locator::{discover, is_repository_root, validate_root};
pub use pool::{TaskAbort, WorkerPool};
pub use registry::{Registry, RepositoryEntry, RepositoryState};
pub use telemetry::{init_tracing, LogSettings};

pub use tokio_util::sync::CancellationToken;

/// repofleet version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

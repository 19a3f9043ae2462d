//! Git invocation seam.
//!
//! The core only ever asks git for four things, modelled by [`GitOp`].
//! [`GitBackend`] is the trait the inspector and batch engine call; [`CliGit`]
//! implements it by spawning the git executable with the repository as its
//! working directory.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::config::FleetConfig;
use crate::error::{FleetError, FleetResult};

/// The logical git operations the core relies on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitOp {
    /// `git rev-parse --abbrev-ref HEAD`
    CurrentBranch,
    /// `git branch -a --format=%(refname:short)`
    ListBranches,
    /// `git checkout <branch>`
    Checkout(String),
    /// `git pull`
    Pull,
}

impl GitOp {
    /// Arguments passed after the program name.
    pub fn args(&self) -> Vec<String> {
        let args: &[&str] = match self {
            GitOp::CurrentBranch => &["rev-parse", "--abbrev-ref", "HEAD"],
            GitOp::ListBranches => &["branch", "-a", "--format=%(refname:short)"],
            GitOp::Checkout(branch) => {
                return vec!["checkout".to_string(), branch.clone()];
            }
            GitOp::Pull => &["pull"],
        };
        args.iter().map(|a| a.to_string()).collect()
    }

    /// Read-only operations run under the shorter inspection timeout.
    pub fn is_read_only(&self) -> bool {
        matches!(self, GitOp::CurrentBranch | GitOp::ListBranches)
    }

    /// Human readable form used in logs and error messages.
    pub fn describe(&self) -> String {
        format!("git {}", self.args().join(" "))
    }
}

/// Captured result of one git invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitOutput {
    /// Exit code, `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl GitOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: Some(0),
            success: true,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code: Some(code),
            success: false,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Standard output followed by standard error, verbatim.
    pub fn combined(&self) -> String {
        let mut text = String::with_capacity(self.stdout.len() + self.stderr.len());
        text.push_str(&self.stdout);
        text.push_str(&self.stderr);
        text
    }

    /// Best diagnostic line for a failed invocation: stderr, else stdout,
    /// else the exit status.
    pub fn diagnostic(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_string();
        }
        match self.exit_code {
            Some(code) => format!("exited with status {code}"),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Executes git operations inside a repository.
///
/// Implementations return `Ok` whenever the process ran, whatever its exit
/// status; `Err` is reserved for invocation failures (spawn, timeout).
#[async_trait]
pub trait GitBackend: Send + Sync {
    async fn run(&self, repo: &Path, op: &GitOp) -> FleetResult<GitOutput>;
}

/// [`GitBackend`] that spawns the git executable.
#[derive(Debug, Clone)]
pub struct CliGit {
    program: String,
    inspect_timeout: Duration,
    operation_timeout: Option<Duration>,
}

impl Default for CliGit {
    fn default() -> Self {
        Self::from_config(&FleetConfig::default())
    }
}

impl CliGit {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    pub fn from_config(config: &FleetConfig) -> Self {
        Self {
            program: config.git_program.clone(),
            inspect_timeout: config.inspect_timeout(),
            operation_timeout: config.operation_timeout(),
        }
    }

    pub fn with_timeouts(mut self, inspect: Duration, operation: Option<Duration>) -> Self {
        self.inspect_timeout = inspect;
        self.operation_timeout = operation;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn timeout_for(&self, op: &GitOp) -> Option<Duration> {
        if op.is_read_only() {
            Some(self.inspect_timeout)
        } else {
            self.operation_timeout
        }
    }
}

#[async_trait]
impl GitBackend for CliGit {
    async fn run(&self, repo: &Path, op: &GitOp) -> FleetResult<GitOutput> {
        debug!(repo = %repo.display(), op = %op.describe(), "running git");

        // Credential prompts would block a batch worker forever.
        let child = Command::new(&self.program)
            .args(op.args())
            .current_dir(repo)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| FleetError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let output = match self.timeout_for(op) {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| FleetError::Timeout {
                    operation: op.describe(),
                    path: repo.to_path_buf(),
                    secs: limit.as_secs(),
                })??,
            None => child.wait_with_output().await?,
        };

        Ok(GitOutput {
            exit_code: output.status.code(),
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

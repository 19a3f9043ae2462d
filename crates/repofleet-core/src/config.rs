//! Runtime configuration.
//!
//! [`FleetConfig::default`] is deterministic; [`FleetConfig::from_env`]
//! layers `REPOFLEET_*` environment variables on top of the defaults.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{FleetError, FleetResult};

pub const ENV_GIT: &str = "REPOFLEET_GIT";
pub const ENV_MAX_DEPTH: &str = "REPOFLEET_MAX_DEPTH";
pub const ENV_CONCURRENCY: &str = "REPOFLEET_CONCURRENCY";
pub const ENV_INSPECT_TIMEOUT: &str = "REPOFLEET_INSPECT_TIMEOUT_SECS";
pub const ENV_OPERATION_TIMEOUT: &str = "REPOFLEET_OPERATION_TIMEOUT_SECS";
pub const ENV_STRICT_TARGETS: &str = "REPOFLEET_STRICT_TARGETS";

/// Configuration shared by discovery, inspection and batch execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetConfig {
    /// Program used for every git invocation.
    pub git_program: String,
    /// Deepest directory level (below the root) that is inspected.
    pub max_depth: usize,
    /// Maximum number of concurrent git subprocesses.
    pub concurrency: usize,
    /// Budget for read-only invocations (current branch, branch listing).
    pub inspect_timeout_secs: u64,
    /// Budget for checkout and pull. `0` disables the timeout.
    pub operation_timeout_secs: u64,
    /// Skip switching repositories whose target is not a known branch.
    pub strict_targets: bool,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            git_program: "git".to_string(),
            max_depth: 2,
            concurrency: 4,
            inspect_timeout_secs: 10,
            operation_timeout_secs: 600,
            strict_targets: false,
        }
    }
}

impl FleetConfig {
    /// Defaults overridden by any `REPOFLEET_*` variables that are set.
    pub fn from_env() -> FleetResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`FleetConfig::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> FleetResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(git) = lookup(ENV_GIT).filter(|v| !v.trim().is_empty()) {
            config.git_program = git.trim().to_string();
        }
        if let Some(raw) = lookup(ENV_MAX_DEPTH) {
            config.max_depth = parse_var(ENV_MAX_DEPTH, &raw)?;
        }
        if let Some(raw) = lookup(ENV_CONCURRENCY) {
            config.concurrency = parse_var(ENV_CONCURRENCY, &raw)?;
        }
        if let Some(raw) = lookup(ENV_INSPECT_TIMEOUT) {
            config.inspect_timeout_secs = parse_var(ENV_INSPECT_TIMEOUT, &raw)?;
        }
        if let Some(raw) = lookup(ENV_OPERATION_TIMEOUT) {
            config.operation_timeout_secs = parse_var(ENV_OPERATION_TIMEOUT, &raw)?;
        }
        if let Some(raw) = lookup(ENV_STRICT_TARGETS) {
            config.strict_targets = parse_flag(ENV_STRICT_TARGETS, &raw)?;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_git_program(mut self, program: impl Into<String>) -> Self {
        self.git_program = program.into();
        self
    }

    pub fn with_strict_targets(mut self, strict: bool) -> Self {
        self.strict_targets = strict;
        self
    }

    /// Reject values that would stall or disable batch execution.
    pub fn validate(&self) -> FleetResult<()> {
        if self.concurrency == 0 {
            return Err(FleetError::Config("concurrency must be at least 1".into()));
        }
        if self.git_program.trim().is_empty() {
            return Err(FleetError::Config("git program must not be empty".into()));
        }
        if self.inspect_timeout_secs == 0 {
            return Err(FleetError::Config(
                "inspection timeout must be at least 1 second".into(),
            ));
        }
        Ok(())
    }

    pub fn inspect_timeout(&self) -> Duration {
        Duration::from_secs(self.inspect_timeout_secs)
    }

    pub fn operation_timeout(&self) -> Option<Duration> {
        (self.operation_timeout_secs > 0).then(|| Duration::from_secs(self.operation_timeout_secs))
    }
}

fn parse_var<T: FromStr>(key: &str, raw: &str) -> FleetResult<T> {
    raw.trim()
        .parse()
        .map_err(|_| FleetError::Config(format!("{key}: invalid value '{raw}'")))
}

fn parse_flag(key: &str, raw: &str) -> FleetResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(FleetError::Config(format!("{key}: invalid flag '{raw}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let cfg = FleetConfig::default();
        assert_eq!(cfg.git_program, "git");
        assert_eq!(cfg.max_depth, 2);
        assert_eq!(cfg.concurrency, 4);
        assert_eq!(cfg.inspect_timeout(), Duration::from_secs(10));
        assert!(!cfg.strict_targets);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_lookup_overrides_defaults() {
        let cfg = FleetConfig::from_lookup(lookup_from(&[
            (ENV_MAX_DEPTH, "5"),
            (ENV_CONCURRENCY, " 16 "),
            (ENV_STRICT_TARGETS, "yes"),
            (ENV_GIT, "/usr/local/bin/git"),
        ]))
        .unwrap();
        assert_eq!(cfg.max_depth, 5);
        assert_eq!(cfg.concurrency, 16);
        assert!(cfg.strict_targets);
        assert_eq!(cfg.git_program, "/usr/local/bin/git");
    }

    #[test]
    fn test_invalid_number_is_config_error() {
        let err = FleetConfig::from_lookup(lookup_from(&[(ENV_MAX_DEPTH, "deep")])).unwrap_err();
        assert!(matches!(err, FleetError::Config(_)));
        assert!(err.to_string().contains(ENV_MAX_DEPTH));
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let err = FleetConfig::from_lookup(lookup_from(&[(ENV_CONCURRENCY, "0")])).unwrap_err();
        assert!(err.to_string().contains("concurrency"));
    }

    #[test]
    fn test_zero_operation_timeout_disables_budget() {
        let cfg = FleetConfig::from_lookup(lookup_from(&[(ENV_OPERATION_TIMEOUT, "0")])).unwrap();
        assert_eq!(cfg.operation_timeout(), None);
    }
}

//! Tracing setup for the `repofleet` binary.
//!
//! Diagnostics always go to stderr: stdout carries the repository table and
//! outcome stream, which may be piped as JSON.

use std::io::IsTerminal;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Quiet default: only warnings, which includes failed repositories.
const QUIET_DIRECTIVES: &str = "warn";
/// `-v`: per-repository progress from the core and the CLI.
const VERBOSE_DIRECTIVES: &str = "warn,repofleet_core=debug,repofleet=debug";

/// Logging switches taken from the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogSettings {
    /// Newline-delimited JSON instead of human-readable lines.
    pub json: bool,
    pub verbose: bool,
}

impl LogSettings {
    /// Filter directives used when `RUST_LOG` is not set.
    pub fn default_directives(&self) -> &'static str {
        if self.verbose {
            VERBOSE_DIRECTIVES
        } else {
            QUIET_DIRECTIVES
        }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.default_directives()))
    }
}

/// Install the global subscriber. Only the first call takes effect.
pub fn init_tracing(settings: LogSettings) {
    let registry = tracing_subscriber::registry().with(settings.filter());

    if settings.json {
        registry
            .with(fmt::layer().with_writer(std::io::stderr).json())
            .try_init()
            .ok();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(settings.verbose)
                    .with_ansi(std::io::stderr().is_terminal())
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .ok();
    }
}

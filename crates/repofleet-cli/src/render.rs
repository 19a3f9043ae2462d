//! Terminal and JSON rendering of registry rows and batch outcomes.

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use repofleet_core::{
    ApplySummary, BatchSummary, OperationKind, OperationOutcome, OutcomeStatus, Registry,
};
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    /// One JSON object per line
    Json,
}

/// Prints results for one root directory.
pub struct Renderer {
    format: OutputFormat,
    root: PathBuf,
}

impl Renderer {
    pub fn new(format: OutputFormat, root: impl Into<PathBuf>) -> Self {
        Self {
            format,
            root: root.into(),
        }
    }

    pub fn found(&self, count: usize) {
        if self.format == OutputFormat::Text {
            println!("Found {count} repositories.");
        }
    }

    pub fn repositories(&self, registry: &Registry, show_branches: bool) {
        match self.format {
            OutputFormat::Text => print!("{}", format_table(registry, &self.root, show_branches)),
            OutputFormat::Json => {
                for entry in registry.snapshot() {
                    println!("{}", json!({ "repository": entry }));
                }
            }
        }
    }

    /// Called once per repository, in discovery order, while a batch runs.
    pub fn outcome(&self, outcome: &OperationOutcome) {
        match self.format {
            OutputFormat::Text => print!("{}", format_outcome(outcome, &self.root)),
            OutputFormat::Json => println!("{}", json!({ "outcome": outcome })),
        }
    }

    pub fn apply(&self, summary: &ApplySummary) {
        match self.format {
            OutputFormat::Text => print!("{}", format_apply(summary, &self.root)),
            OutputFormat::Json => println!(
                "{}",
                json!({
                    "apply": {
                        "branch": summary.branch,
                        "applied": summary.applied_count(),
                        "total": summary.total(),
                        "missing": summary.missing().collect::<Vec<_>>(),
                    }
                })
            ),
        }
    }

    pub fn summary(&self, summary: &BatchSummary) {
        match self.format {
            OutputFormat::Text => println!("{}", format_summary(summary)),
            OutputFormat::Json => println!("{}", json!({ "summary": summary })),
        }
    }
}

/// Path relative to the scan root, `.` for the root itself.
pub fn display_path(path: &Path, root: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
        Ok(rel) => rel.display().to_string(),
        Err(_) => path.display().to_string(),
    }
}

pub fn format_table(registry: &Registry, root: &Path, show_branches: bool) -> String {
    let headers = ["Repository Path", "Current Branch", "Target Branch"];
    let rows: Vec<[String; 3]> = registry
        .iter()
        .map(|(path, state)| {
            [
                display_path(path, root),
                state.current_branch.clone(),
                state.target_branch.clone(),
            ]
        })
        .collect();

    let mut widths = headers.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let line = |cells: [&str; 3]| {
        format!(
            "{:<w0$}  {:<w1$}  {}\n",
            cells[0],
            cells[1],
            cells[2],
            w0 = widths[0],
            w1 = widths[1]
        )
    };
    out.push_str(&line(headers));
    for ((_, state), row) in registry.iter().zip(&rows) {
        out.push_str(&line([&row[0], &row[1], &row[2]]));
        if show_branches && !state.all_branches.is_empty() {
            out.push_str(&format!("    branches: {}\n", state.all_branches.join(", ")));
        }
    }
    out
}

pub fn format_outcome(outcome: &OperationOutcome, root: &Path) -> String {
    let path = display_path(&outcome.path, root);
    let tag = match outcome.status {
        OutcomeStatus::Succeeded => "ok",
        OutcomeStatus::Failed => "failed",
        OutcomeStatus::Skipped => "skipped",
    };
    match outcome.kind {
        OperationKind::Checkout => format!("[{tag}] {path}: {}\n", outcome.message.trim()),
        OperationKind::Pull => {
            let mut out = format!("[{tag}] git pull in {path}\n");
            for line in outcome.message.lines() {
                out.push_str("    ");
                out.push_str(line);
                out.push('\n');
            }
            out
        }
    }
}

pub fn format_apply(summary: &ApplySummary, root: &Path) -> String {
    let mut out = String::new();
    for path in summary.missing() {
        out.push_str(&format!(
            "Branch '{}' not found in {}.\n",
            summary.branch,
            display_path(path, root)
        ));
    }
    out.push_str(&format!(
        "Set branch '{}' for {} of {} repositories.\n",
        summary.branch,
        summary.applied_count(),
        summary.total()
    ));
    out
}

pub fn format_summary(summary: &BatchSummary) -> String {
    format!(
        "{}: {} succeeded, {} failed, {} skipped",
        summary.kind, summary.succeeded, summary.failed, summary.skipped
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use repofleet_core::RepositoryState;

    fn registry() -> Registry {
        Registry::from_states([
            (
                PathBuf::from("/w"),
                RepositoryState::new("main", vec!["main".into()]),
            ),
            (
                PathBuf::from("/w/services/billing"),
                RepositoryState::new("dev", vec!["dev".into(), "main".into()]),
            ),
        ])
    }

    #[test]
    fn test_display_path_relative_to_root() {
        let root = Path::new("/w");
        assert_eq!(display_path(Path::new("/w"), root), ".");
        assert_eq!(display_path(Path::new("/w/a/b"), root), "a/b");
        assert_eq!(display_path(Path::new("/elsewhere"), root), "/elsewhere");
    }

    #[test]
    fn test_table_aligns_columns() {
        let table = format_table(&registry(), Path::new("/w"), false);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Repository Path"));
        assert!(lines[2].starts_with("services/billing"));
        let col = lines[0].find("Current Branch").unwrap();
        assert_eq!(&lines[2][col..col + 3], "dev");
    }

    #[test]
    fn test_table_lists_branches_on_request() {
        let table = format_table(&registry(), Path::new("/w"), true);
        assert!(table.contains("branches: dev, main"));
    }

    #[test]
    fn test_pull_outcome_indents_git_output() {
        let outcome = OperationOutcome::failed(
            "/w/api",
            OperationKind::Pull,
            "fatal: no upstream\nhint: set one\n",
        );
        let text = format_outcome(&outcome, Path::new("/w"));
        assert_eq!(
            text,
            "[failed] git pull in api\n    fatal: no upstream\n    hint: set one\n"
        );
    }

    #[test]
    fn test_apply_message() {
        let summary = ApplySummary {
            branch: "dev".into(),
            results: vec![(PathBuf::from("/w/a"), true), (PathBuf::from("/w/b"), false)],
        };
        let text = format_apply(&summary, Path::new("/w"));
        assert!(text.contains("Branch 'dev' not found in b."));
        assert!(text.ends_with("Set branch 'dev' for 1 of 2 repositories.\n"));
    }

    #[test]
    fn test_summary_line() {
        let summary = BatchSummary {
            kind: OperationKind::Checkout,
            succeeded: 2,
            failed: 1,
            skipped: 0,
        };
        assert_eq!(
            format_summary(&summary),
            "checkout: 2 succeeded, 1 failed, 0 skipped"
        );
    }
}

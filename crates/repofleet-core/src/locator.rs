//! Repository discovery.
//!
//! Walks a directory tree down to a bounded depth and yields every directory
//! that directly contains git metadata. Discovery is best-effort: unreadable
//! directories are skipped and a missing root yields nothing.
//!
//! The walk is blocking; async callers should run it on
//! `tokio::task::spawn_blocking`.

use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{FleetError, FleetResult};

/// Name of the git metadata entry that marks a repository root.
pub const GIT_MARKER: &str = ".git";

/// True when `dir` directly contains a `.git` directory or gitfile.
pub fn is_repository_root(dir: &Path) -> bool {
    dir.join(GIT_MARKER).exists()
}

/// Find repository roots under `root`, descending at most `max_depth`
/// levels below it.
///
/// Directories deeper than `max_depth` are never read. A repository root
/// does not stop the descent, so nested repositories are reported too.
/// Siblings are visited in file-name order.
pub fn discover(root: &Path, max_depth: usize) -> Vec<PathBuf> {
    let walker = WalkDir::new(root)
        .max_depth(max_depth)
        .follow_links(false)
        .sort_by_file_name();

    let mut repos = Vec::new();
    for entry in walker
        .into_iter()
        .filter_entry(|e| e.file_type().is_dir() && e.file_name() != GIT_MARKER)
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                debug!(error = %err, "skipping unreadable directory");
                continue;
            }
        };
        if is_repository_root(entry.path()) {
            repos.push(entry.into_path());
        }
    }

    info!(root = %root.display(), max_depth, found = repos.len(), "discovery finished");
    repos
}

/// Check an operator-supplied scan root and return its canonical form.
pub fn validate_root(root: &Path) -> FleetResult<PathBuf> {
    let canonical = root.canonicalize().map_err(|e| FleetError::InvalidRoot {
        path: root.to_path_buf(),
        reason: e.to_string(),
    })?;
    if !canonical.is_dir() {
        return Err(FleetError::InvalidRoot {
            path: root.to_path_buf(),
            reason: "not a directory".to_string(),
        });
    }
    Ok(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::fs;

    fn make_repo(root: &Path, rel: &str) -> PathBuf {
        let dir = if rel.is_empty() {
            root.to_path_buf()
        } else {
            root.join(rel)
        };
        fs::create_dir_all(dir.join(GIT_MARKER)).unwrap();
        dir
    }

    fn as_set(paths: Vec<PathBuf>) -> HashSet<PathBuf> {
        paths.into_iter().collect()
    }

    fn depth_below(root: &Path, path: &Path) -> usize {
        path.strip_prefix(root).unwrap().components().count()
    }

    #[test]
    fn test_depth_bound_prunes_deep_repositories() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        let d0 = make_repo(root, "");
        let d1 = make_repo(root, "service");
        make_repo(root, "group/team/deep");

        let found = as_set(discover(root, 2));
        assert_eq!(found, HashSet::from([d0, d1]));
    }

    #[test]
    fn test_no_result_deeper_than_max_depth() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        for rel in ["a", "a/b", "a/b/c", "x/y/z/w", "m/n"] {
            make_repo(root, rel);
        }
        for max_depth in 0..5 {
            for path in discover(root, max_depth) {
                assert!(depth_below(root, &path) <= max_depth);
                assert!(path.join(GIT_MARKER).exists());
            }
        }
        assert_eq!(discover(root, 4).len(), 5);
    }

    #[test]
    fn test_nested_repositories_are_discovered() {
        let tmp = tempfile::tempdir().unwrap();
        let outer = make_repo(tmp.path(), "outer");
        let inner = make_repo(tmp.path(), "outer/vendor/inner");

        let found = as_set(discover(tmp.path(), 3));
        assert!(found.contains(&outer));
        assert!(found.contains(&inner));
    }

    #[test]
    fn test_gitfile_marks_repository() {
        let tmp = tempfile::tempdir().unwrap();
        let sub = tmp.path().join("submodule");
        fs::create_dir_all(&sub).unwrap();
        fs::write(sub.join(GIT_MARKER), "gitdir: ../.git/modules/submodule\n").unwrap();

        assert_eq!(discover(tmp.path(), 1), vec![sub]);
    }

    #[test]
    fn test_plain_directories_are_not_repositories() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("docs/git")).unwrap();
        fs::write(tmp.path().join("README"), "x").unwrap();
        assert!(discover(tmp.path(), 3).is_empty());
    }

    #[test]
    fn test_missing_root_yields_empty() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(discover(&tmp.path().join("missing"), 2).is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_subtree_does_not_stop_siblings() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        let before = make_repo(root, "a");
        let hidden = make_repo(root, "locked/inner");
        let after = make_repo(root, "z");
        let locked = root.join("locked");

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        // Root ignores directory permissions.
        let readable_anyway = fs::read_dir(&locked).is_ok();
        let found = discover(root, 2);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        assert!(found.contains(&before), "{found:?}");
        assert!(found.contains(&after), "{found:?}");
        if !readable_anyway {
            assert!(!found.contains(&hidden), "{found:?}");
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_walk_errors_are_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let dangling = tmp.path().join("gone");
        std::os::unix::fs::symlink(tmp.path().join("missing"), &dangling).unwrap();
        // The root link is followed and fails to resolve.
        assert!(discover(&dangling, 2).is_empty());

        // A dangling link among repositories is neither an error nor a result.
        let repo = make_repo(tmp.path(), "svc");
        let found = discover(tmp.path(), 1);
        assert_eq!(found, vec![repo]);
    }

    #[test]
    fn test_discover_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        for rel in ["b", "a", "c/d"] {
            make_repo(tmp.path(), rel);
        }
        let first = discover(tmp.path(), 2);
        let second = discover(tmp.path(), 2);
        assert_eq!(as_set(first), as_set(second));
    }

    #[test]
    fn test_validate_root_rejects_missing_and_files() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("file.txt");
        fs::write(&file, "x").unwrap();

        assert!(matches!(
            validate_root(&tmp.path().join("nope")),
            Err(FleetError::InvalidRoot { .. })
        ));
        assert!(matches!(validate_root(&file), Err(FleetError::InvalidRoot { .. })));
        assert!(validate_root(tmp.path()).unwrap().is_absolute());
    }
}

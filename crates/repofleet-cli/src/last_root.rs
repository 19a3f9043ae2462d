//! Remembers the last scanned root between invocations.
//!
//! Best-effort: read and write failures are logged and otherwise ignored.

use std::path::{Path, PathBuf};

use tracing::debug;

pub const ENV_STATE_FILE: &str = "REPOFLEET_STATE_FILE";

pub struct LastRootStore {
    path: Option<PathBuf>,
}

impl LastRootStore {
    /// `$REPOFLEET_STATE_FILE`, else `$HOME/.repofleet/last_root`.
    pub fn from_env() -> Self {
        let path = std::env::var_os(ENV_STATE_FILE)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var_os("HOME")
                    .filter(|v| !v.is_empty())
                    .map(|home| PathBuf::from(home).join(".repofleet").join("last_root"))
            });
        Self { path }
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn load(&self) -> Option<PathBuf> {
        let path = self.path.as_ref()?;
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let root = content.trim();
                (!root.is_empty()).then(|| PathBuf::from(root))
            }
            Err(e) => {
                debug!(file = %path.display(), error = %e, "no stored root");
                None
            }
        }
    }

    pub fn save(&self, root: &Path) {
        let Some(path) = self.path.as_ref() else {
            return;
        };
        let result = path
            .parent()
            .map_or(Ok(()), std::fs::create_dir_all)
            .and_then(|_| std::fs::write(path, root.to_string_lossy().as_bytes()));
        if let Err(e) = result {
            debug!(file = %path.display(), error = %e, "failed to store last root");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_then_load() {
        let tmp = tempfile::tempdir().unwrap();
        let store = LastRootStore::at(tmp.path().join("state/last_root"));
        assert_eq!(store.load(), None);

        store.save(Path::new("/work/projects"));
        assert_eq!(store.load(), Some(PathBuf::from("/work/projects")));
    }

    #[test]
    fn test_blank_file_is_ignored() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("last_root");
        std::fs::write(&file, "  \n").unwrap();
        assert_eq!(LastRootStore::at(file).load(), None);
    }

    #[test]
    fn test_unwritable_location_is_silent() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        let store = LastRootStore::at(blocker.join("last_root"));
        store.save(Path::new("/work"));
        assert_eq!(store.load(), None);
    }
}

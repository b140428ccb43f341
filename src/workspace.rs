//! Per-request scratch directories.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{PromptCutError, Result};

/// Scratch directory owned by exactly one request.
///
/// Holds every intermediate file under a fixed logical name and is removed
/// when dropped, on success and failure alike, unless `keep` was requested.
#[derive(Debug)]
pub struct Workspace {
    request_id: Uuid,
    dir: PathBuf,
    keep: bool,
}

impl Workspace {
    /// Create (or reuse) the directory for `request_id` under `root`.
    pub fn create(root: &Path, request_id: Uuid, keep: bool) -> Result<Self> {
        let dir = root.join(format!("request-{}", request_id));
        std::fs::create_dir_all(&dir).map_err(|e| {
            PromptCutError::Workspace(format!("Failed to create {}: {}", dir.display(), e))
        })?;

        debug!("Workspace ready at {}", dir.display());
        Ok(Self { request_id, dir, keep })
    }

    /// Create a workspace with a fresh random request id.
    pub fn allocate(root: &Path, keep: bool) -> Result<Self> {
        Self::create(root, Uuid::new_v4(), keep)
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persisted upload `v1`, `v2`, ... (1-based).
    pub fn input(&self, index: usize, extension: &str) -> PathBuf {
        self.dir.join(format!("v{}.{}", index, extension))
    }

    /// Normalized clip `n1`, `n2`, ... (1-based).
    pub fn normalized(&self, index: usize) -> PathBuf {
        self.dir.join(format!("n{}.mp4", index))
    }

    pub fn merged(&self) -> PathBuf {
        self.dir.join("merged.mp4")
    }

    pub fn concat_list(&self) -> PathBuf {
        self.dir.join("concat.txt")
    }

    pub fn audio(&self) -> PathBuf {
        self.dir.join("audio.wav")
    }

    pub fn subtitles(&self) -> PathBuf {
        self.dir.join("subtitles.srt")
    }

    pub fn output(&self) -> PathBuf {
        self.dir.join("output.mp4")
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.keep {
            debug!("Keeping workspace {}", self.dir.display());
            return;
        }

        if let Err(e) = std::fs::remove_dir_all(&self.dir) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove workspace {}: {}", self.dir.display(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::TempDir;

    #[test]
    fn test_paths_live_inside_workspace() {
        let root = TempDir::new().unwrap();
        let workspace = Workspace::allocate(root.path(), false).unwrap();

        assert!(workspace.dir().is_dir());
        assert_eq!(workspace.input(2, "mov").file_name().unwrap(), "v2.mov");
        assert_eq!(workspace.normalized(1).file_name().unwrap(), "n1.mp4");
        for path in [workspace.merged(), workspace.audio(), workspace.subtitles(), workspace.output()] {
            assert_eq!(path.parent().unwrap(), workspace.dir());
        }
    }

    #[test]
    fn test_create_is_idempotent() {
        let root = TempDir::new().unwrap();
        let id = Uuid::new_v4();
        let first = Workspace::create(root.path(), id, true).unwrap();
        let second = Workspace::create(root.path(), id, true).unwrap();
        assert_eq!(first.dir(), second.dir());
    }

    #[test]
    fn test_distinct_requests_get_distinct_dirs() {
        let root = TempDir::new().unwrap();
        let a = Workspace::allocate(root.path(), false).unwrap();
        let b = Workspace::allocate(root.path(), false).unwrap();
        assert_ne!(a.dir(), b.dir());
    }

    #[test]
    fn test_drop_removes_directory() {
        let root = TempDir::new().unwrap();
        let workspace = Workspace::allocate(root.path(), false).unwrap();
        let dir = workspace.dir().to_path_buf();
        std::fs::write(workspace.output(), b"data").unwrap();

        drop(workspace);
        assert!(!dir.exists());
    }

    #[test]
    fn test_keep_retains_directory() {
        let root = TempDir::new().unwrap();
        let workspace = Workspace::allocate(root.path(), true).unwrap();
        let dir = workspace.dir().to_path_buf();

        drop(workspace);
        assert!(dir.exists());
    }
}

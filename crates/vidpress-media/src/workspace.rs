//! Per-job temporary workspace with guaranteed cleanup.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::MediaResult;

/// Scratch directory for one job's source, output, and pass logs.
///
/// Cleanup runs on every exit path: call [`cleanup`](Self::cleanup) at
/// the end of the pipeline, and `Drop` removes anything left behind if
/// the job unwinds before that.
#[derive(Debug)]
pub struct JobWorkspace {
    root: PathBuf,
    cleaned: bool,
}

impl JobWorkspace {
    /// Create the workspace directory under `base` for the given job id.
    pub async fn create(base: impl AsRef<Path>, job_id: &str) -> MediaResult<Self> {
        let root = base.as_ref().join(format!("job_{job_id}"));
        tokio::fs::create_dir_all(&root).await?;
        debug!("Created workspace {}", root.display());
        Ok(Self {
            root,
            cleaned: false,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path the source download is written to.
    pub fn input_path(&self) -> PathBuf {
        self.root.join("source.mp4")
    }

    /// Path the encoder writes the result to.
    pub fn output_path(&self) -> PathBuf {
        self.root.join("output.mp4")
    }

    /// Prefix for x264 two-pass statistics files.
    pub fn passlog_prefix(&self) -> PathBuf {
        self.root.join("passlog")
    }

    /// Remove the workspace directory and everything in it.
    ///
    /// Best-effort: a failure is logged, never propagated, so cleanup
    /// can run on error paths without masking the original error.
    pub async fn cleanup(&mut self) {
        if self.cleaned {
            return;
        }
        self.cleaned = true;
        if let Err(e) = tokio::fs::remove_dir_all(&self.root).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to clean workspace {}: {}", self.root.display(), e);
            }
        } else {
            debug!("Cleaned workspace {}", self.root.display());
        }
    }
}

impl Drop for JobWorkspace {
    fn drop(&mut self) {
        if self.cleaned {
            return;
        }
        // Synchronous fallback for early-return and panic paths.
        if let Err(e) = std::fs::remove_dir_all(&self.root) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to clean workspace {}: {}", self.root.display(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_create_and_cleanup() {
        let base = TempDir::new().unwrap();
        let mut ws = JobWorkspace::create(base.path(), "abc123").await.unwrap();
        assert!(ws.root().exists());

        tokio::fs::write(ws.input_path(), b"data").await.unwrap();
        tokio::fs::write(ws.output_path(), b"data").await.unwrap();

        ws.cleanup().await;
        assert!(!ws.root().exists());
    }

    #[tokio::test]
    async fn test_cleanup_is_idempotent() {
        let base = TempDir::new().unwrap();
        let mut ws = JobWorkspace::create(base.path(), "abc123").await.unwrap();
        ws.cleanup().await;
        ws.cleanup().await;
        assert!(!ws.root().exists());
    }

    #[tokio::test]
    async fn test_drop_removes_leftovers_after_failure() {
        let base = TempDir::new().unwrap();
        let root = {
            let ws = JobWorkspace::create(base.path(), "failed").await.unwrap();
            tokio::fs::write(ws.input_path(), b"partial download")
                .await
                .unwrap();
            tokio::fs::write(
                ws.passlog_prefix().with_extension("log"),
                b"x264 stats",
            )
            .await
            .unwrap();
            ws.root().to_path_buf()
            // ws dropped here without cleanup(), simulating an abort
        };
        assert!(!root.exists());
    }

    #[tokio::test]
    async fn test_paths_live_under_root() {
        let base = TempDir::new().unwrap();
        let mut ws = JobWorkspace::create(base.path(), "xyz").await.unwrap();
        assert!(ws.input_path().starts_with(ws.root()));
        assert!(ws.output_path().starts_with(ws.root()));
        assert!(ws.passlog_prefix().starts_with(ws.root()));
        ws.cleanup().await;
    }
}

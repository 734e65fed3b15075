//! Per-job scratch directory with guaranteed removal.

use std::{
    io::{self, ErrorKind},
    path::PathBuf,
};

use metrics::counter;
use tokio::fs;
use tracing::{debug, warn};

use crate::domain::render::JobLayout;
use crate::infra::telemetry::METRIC_CLEANUP_FAILURES_TOTAL;

/// Owns `<temp-root>/<jobId>/` for the lifetime of one job.
///
/// [`JobWorkspace::cleanup`] removes the tree on the normal path. If the owning future
/// is dropped first (client disconnect, panic), `Drop` removes it synchronously.
#[derive(Debug)]
pub struct JobWorkspace {
    root: PathBuf,
    script_path: PathBuf,
    released: bool,
}

impl JobWorkspace {
    /// Create the workspace (and any missing ancestors, including the temp root).
    pub async fn create(layout: &JobLayout) -> io::Result<Self> {
        let workspace = Self {
            root: layout.workspace().to_path_buf(),
            script_path: layout.script_path(),
            released: false,
        };
        fs::create_dir_all(&workspace.root).await?;
        Ok(workspace)
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    pub fn script_path(&self) -> &std::path::Path {
        &self.script_path
    }

    /// Write the script verbatim.
    pub async fn write_script(&self, source: &str) -> io::Result<()> {
        fs::write(&self.script_path, source.as_bytes()).await
    }

    /// Remove the script and the whole workspace tree. Failures are logged and
    /// reported through the return value only; callers never escalate them.
    pub async fn cleanup(mut self) -> bool {
        self.released = true;
        let mut clean = true;

        if let Err(err) = remove_file_if_present(&self.script_path).await {
            clean = false;
            warn!(
                target = "application::render::workspace",
                op = "workspace::cleanup",
                result = "error",
                path = %self.script_path.display(),
                error = %err,
                "Failed to delete render script"
            );
        }

        match fs::remove_dir_all(&self.root).await {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => {
                clean = false;
                warn!(
                    target = "application::render::workspace",
                    op = "workspace::cleanup",
                    result = "error",
                    path = %self.root.display(),
                    error = %err,
                    "Failed to delete render workspace"
                );
            }
        }

        if clean {
            debug!(
                target = "application::render::workspace",
                op = "workspace::cleanup",
                result = "ok",
                path = %self.root.display(),
                "Render workspace removed"
            );
        } else {
            counter!(METRIC_CLEANUP_FAILURES_TOTAL).increment(1);
        }
        clean
    }
}

impl Drop for JobWorkspace {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        match std::fs::remove_dir_all(&self.root) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => {
                counter!(METRIC_CLEANUP_FAILURES_TOTAL).increment(1);
                warn!(
                    target = "application::render::workspace",
                    op = "workspace::drop",
                    result = "error",
                    path = %self.root.display(),
                    error = %err,
                    "Failed to delete abandoned render workspace"
                );
            }
        }
    }
}

async fn remove_file_if_present(path: &std::path::Path) -> io::Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::render::{JobId, SceneName};
    use tempfile::TempDir;

    fn layout(root: &TempDir) -> JobLayout {
        JobLayout::new(
            root.path(),
            JobId::new(),
            SceneName::parse(Some("Demo")).expect("scene"),
        )
    }

    #[tokio::test]
    async fn cleanup_removes_script_and_tree() {
        let temp = TempDir::new().expect("temp dir");
        let layout = layout(&temp);
        let workspace = JobWorkspace::create(&layout).await.expect("create");
        workspace
            .write_script("class Demo: pass")
            .await
            .expect("write");
        std::fs::create_dir_all(workspace.root().join("videos/nested")).expect("nested");

        assert!(layout.script_path().exists());
        assert!(workspace.cleanup().await);
        assert!(!layout.workspace().exists());
        assert!(temp.path().exists(), "temp root must survive cleanup");
    }

    #[tokio::test]
    async fn dropping_without_cleanup_still_removes_tree() {
        let temp = TempDir::new().expect("temp dir");
        let layout = layout(&temp);
        {
            let workspace = JobWorkspace::create(&layout).await.expect("create");
            workspace.write_script("x").await.expect("write");
        }
        assert!(!layout.workspace().exists());
    }

    #[tokio::test]
    async fn cleanup_tolerates_already_removed_tree() {
        let temp = TempDir::new().expect("temp dir");
        let layout = layout(&temp);
        let workspace = JobWorkspace::create(&layout).await.expect("create");
        std::fs::remove_dir_all(layout.workspace()).expect("remove early");
        assert!(workspace.cleanup().await);
    }

    #[tokio::test]
    async fn create_tolerates_existing_temp_root() {
        let temp = TempDir::new().expect("temp dir");
        let first = JobWorkspace::create(&layout(&temp)).await.expect("first");
        let second = JobWorkspace::create(&layout(&temp)).await.expect("second");
        assert_ne!(first.root(), second.root());
        first.cleanup().await;
        second.cleanup().await;
    }
}

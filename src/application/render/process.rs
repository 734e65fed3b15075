use std::{io, path::PathBuf};

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::render::{QualityTier, SceneName};

/// Everything the external renderer needs for one job.
#[derive(Debug, Clone)]
pub struct RenderInvocation {
    pub script_path: PathBuf,
    pub scene: SceneName,
    pub quality: QualityTier,
    pub media_dir: PathBuf,
    /// Working directory and `HOME` for the child process.
    pub working_dir: PathBuf,
}

/// Captured result of a finished (or abandoned) renderer process.
///
/// A non-zero exit is data, not an error: the renderer writes diagnostics to stderr
/// even on partial success, so classification happens downstream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

impl ProcessOutput {
    pub fn exited_cleanly(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }

    /// Combined stdout and stderr in the shape returned to callers.
    pub fn logs(&self) -> String {
        format!("Stdout:\n{}\n\nStderr:\n{}", self.stdout, self.stderr)
    }
}

#[derive(Debug, Error)]
pub enum RendererError {
    #[error("renderer executable unavailable: {0}")]
    NotFound(io::Error),
    #[error("failed to run renderer: {0}")]
    Io(io::Error),
}

/// Executes a scene script and reports what the process printed.
#[async_trait]
pub trait SceneRenderer: Send + Sync {
    async fn render(&self, invocation: &RenderInvocation) -> Result<ProcessOutput, RendererError>;
}

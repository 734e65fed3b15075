use std::{path::PathBuf, time::Duration};

use thiserror::Error;

use crate::domain::{error::DomainError, render::JobId};
use crate::infra::videos::VideoStoreError;

pub const SUCCESS_MESSAGE: &str = "Manim animation rendered successfully.";

/// A published render.
#[derive(Debug, Clone)]
pub struct RenderedVideo {
    pub job_id: JobId,
    pub video_url: String,
    pub logs: String,
}

/// Who a failed render is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// The caller's input or script is defective.
    Client,
    /// Environmental or ambiguous failure on the service side.
    Server,
    /// The renderer exceeded its time budget.
    Timeout,
}

/// Every way a render job can fail. Each variant carries the logs gathered so far.
#[derive(Debug, Error)]
pub enum RenderFailure {
    #[error("invalid render request: {0}")]
    InvalidInput(#[source] DomainError),
    #[error("script failed to render (matched `{pattern}`)")]
    ScriptExecution { pattern: &'static str, logs: String },
    #[error("rendered video not found at {}", probed.display())]
    ArtifactNotFound { probed: PathBuf, logs: String },
    #[error("failed to publish rendered video: {source}")]
    Publish {
        #[source]
        source: VideoStoreError,
        logs: String,
    },
    #[error("renderer timed out after {}s", after.as_secs())]
    TimedOut { after: Duration, logs: String },
    #[error("unhandled render fault: {message}")]
    Unhandled { message: String, logs: String },
}

impl RenderFailure {
    pub fn unhandled(message: impl Into<String>) -> Self {
        Self::Unhandled {
            message: message.into(),
            logs: String::new(),
        }
    }

    pub fn class(&self) -> FailureClass {
        match self {
            RenderFailure::InvalidInput(_) | RenderFailure::ScriptExecution { .. } => {
                FailureClass::Client
            }
            RenderFailure::TimedOut { .. } => FailureClass::Timeout,
            RenderFailure::ArtifactNotFound { .. }
            | RenderFailure::Publish { .. }
            | RenderFailure::Unhandled { .. } => FailureClass::Server,
        }
    }

    /// Human-readable summary returned to callers.
    pub fn message(&self) -> String {
        match self {
            RenderFailure::InvalidInput(DomainError::Validation { message })
            | RenderFailure::InvalidInput(DomainError::Invariant { message }) => {
                format!("Invalid Manim code provided: {message}.")
            }
            RenderFailure::ScriptExecution { .. } => {
                "Manim script error or no scenes found. Check logs.".to_string()
            }
            RenderFailure::ArtifactNotFound { .. } => {
                "Manim rendering process completed, but output video not found. Check logs."
                    .to_string()
            }
            RenderFailure::Publish { .. } => {
                "Manim video was rendered but could not be published. Check logs.".to_string()
            }
            RenderFailure::TimedOut { after, .. } => format!(
                "Manim rendering timed out after {} seconds. Check logs.",
                after.as_secs()
            ),
            RenderFailure::Unhandled { message, .. } => {
                format!("Internal server error: {message}")
            }
        }
    }

    pub fn logs(&self) -> &str {
        match self {
            RenderFailure::InvalidInput(_) => "",
            RenderFailure::ScriptExecution { logs, .. }
            | RenderFailure::ArtifactNotFound { logs, .. }
            | RenderFailure::Publish { logs, .. }
            | RenderFailure::TimedOut { logs, .. }
            | RenderFailure::Unhandled { logs, .. } => logs,
        }
    }

    /// Stable label for metrics and structured logs.
    pub fn code(&self) -> &'static str {
        match self {
            RenderFailure::InvalidInput(_) => "invalid_input",
            RenderFailure::ScriptExecution { .. } => "script_error",
            RenderFailure::ArtifactNotFound { .. } => "artifact_not_found",
            RenderFailure::Publish { .. } => "publish_failed",
            RenderFailure::TimedOut { .. } => "timed_out",
            RenderFailure::Unhandled { .. } => "unhandled",
        }
    }
}

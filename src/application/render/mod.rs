//! Render job pipeline: staging, execution, artifact discovery, publication and cleanup.

mod locator;
mod orchestrator;
mod outcome;
mod process;
mod workspace;

pub use locator::{ArtifactLocator, LocateError};
pub use orchestrator::{RenderPipelineConfig, RenderService};
pub use outcome::{FailureClass, RenderFailure, RenderedVideo, SUCCESS_MESSAGE};
pub use process::{ProcessOutput, RenderInvocation, RendererError, SceneRenderer};
pub use workspace::JobWorkspace;

use std::{
    path::PathBuf,
    sync::Arc,
    time::{Duration, Instant},
};

use metrics::{counter, gauge, histogram};
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::config::RenderSettings;
use crate::domain::{
    diagnostics::fatal_script_pattern,
    render::{
        ArtifactDiscovery, JobLayout, JobStatus, QualityTier, RenderJob, RenderRequest,
    },
};
use crate::infra::telemetry::{METRIC_RENDER_INFLIGHT, METRIC_RENDER_MS, METRIC_RENDER_TOTAL};
use crate::infra::videos::VideoStore;

use super::locator::{ArtifactLocator, LocateError};
use super::outcome::{RenderFailure, RenderedVideo};
use super::process::{RenderInvocation, SceneRenderer};
use super::workspace::JobWorkspace;

/// Static knobs for the render pipeline, resolved from [`RenderSettings`].
#[derive(Debug, Clone)]
pub struct RenderPipelineConfig {
    pub temp_root: PathBuf,
    pub quality: QualityTier,
    pub discovery: ArtifactDiscovery,
    pub timeout: Duration,
    pub max_concurrent_jobs: usize,
}

impl From<&RenderSettings> for RenderPipelineConfig {
    fn from(settings: &RenderSettings) -> Self {
        Self {
            temp_root: settings.temp_root.clone(),
            quality: settings.quality,
            discovery: settings.discovery,
            timeout: settings.timeout,
            max_concurrent_jobs: settings.max_concurrent_jobs.get() as usize,
        }
    }
}

/// Runs render jobs end to end: validate, stage the script, execute the renderer,
/// locate and publish the movie, and always remove the job's workspace.
///
/// Jobs share nothing but the temp root and the video store; every path a job touches
/// is namespaced by its id. The semaphore only bounds how many renderer processes run
/// at once.
pub struct RenderService {
    config: RenderPipelineConfig,
    locator: ArtifactLocator,
    renderer: Arc<dyn SceneRenderer>,
    videos: Arc<VideoStore>,
    permits: Arc<Semaphore>,
}

impl RenderService {
    pub fn new(
        config: RenderPipelineConfig,
        renderer: Arc<dyn SceneRenderer>,
        videos: Arc<VideoStore>,
    ) -> Self {
        let locator = ArtifactLocator::new(config.quality, config.discovery);
        let permits = Arc::new(Semaphore::new(config.max_concurrent_jobs.max(1)));
        Self {
            config,
            locator,
            renderer,
            videos,
            permits,
        }
    }

    pub fn config(&self) -> &RenderPipelineConfig {
        &self.config
    }

    pub fn videos(&self) -> &VideoStore {
        &self.videos
    }

    /// Render `code` and publish the result.
    ///
    /// Invalid input is rejected before the filesystem or the renderer is touched.
    pub async fn execute(
        &self,
        code: Option<String>,
        scene_name: Option<&str>,
    ) -> Result<RenderedVideo, RenderFailure> {
        let started_at = Instant::now();
        let result = self.execute_job(code, scene_name).await;

        let outcome = match &result {
            Ok(_) => "succeeded",
            Err(failure) => failure.code(),
        };
        counter!(METRIC_RENDER_TOTAL, "outcome" => outcome).increment(1);
        histogram!(METRIC_RENDER_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);

        result
    }

    async fn execute_job(
        &self,
        code: Option<String>,
        scene_name: Option<&str>,
    ) -> Result<RenderedVideo, RenderFailure> {
        let request = RenderRequest::new(code, scene_name).map_err(RenderFailure::InvalidInput)?;

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| RenderFailure::unhandled("render queue is closed"))?;

        let started_at = Instant::now();
        let mut job = RenderJob::new(&self.config.temp_root, request.scene.clone());
        let workspace = JobWorkspace::create(job.layout()).await.map_err(|err| {
            RenderFailure::unhandled(format!(
                "failed to create render workspace {}: {err}",
                job.layout().workspace().display()
            ))
        })?;

        let result = self.run(job.layout(), &request, &workspace).await;
        workspace.cleanup().await;

        let status = if result.is_ok() {
            JobStatus::Succeeded
        } else {
            JobStatus::Failed
        };
        if let Err(err) = job.settle(status) {
            warn!(
                target = "application::render",
                op = "render::execute",
                job_id = %job.layout().job_id(),
                error = %err,
                "Render job status could not be settled"
            );
        }

        match &result {
            Ok(video) => info!(
                target = "application::render",
                op = "render::execute",
                result = job.status().as_str(),
                job_id = %job.layout().job_id(),
                scene = %request.scene,
                script_bytes = request.script.byte_len(),
                elapsed_ms = started_at.elapsed().as_millis() as u64,
                video_url = %video.video_url,
                "Render job finished"
            ),
            Err(failure) => warn!(
                target = "application::render",
                op = "render::execute",
                result = job.status().as_str(),
                job_id = %job.layout().job_id(),
                scene = %request.scene,
                script_bytes = request.script.byte_len(),
                elapsed_ms = started_at.elapsed().as_millis() as u64,
                error_code = failure.code(),
                error = %failure,
                "Render job failed"
            ),
        }

        result
    }

    async fn run(
        &self,
        layout: &JobLayout,
        request: &RenderRequest,
        workspace: &JobWorkspace,
    ) -> Result<RenderedVideo, RenderFailure> {
        workspace
            .write_script(request.script.as_str())
            .await
            .map_err(|err| {
                RenderFailure::unhandled(format!(
                    "failed to write script {}: {err}",
                    workspace.script_path().display()
                ))
            })?;

        let invocation = RenderInvocation {
            script_path: workspace.script_path().to_path_buf(),
            scene: request.scene.clone(),
            quality: self.config.quality,
            media_dir: layout.media_dir().to_path_buf(),
            working_dir: workspace.root().to_path_buf(),
        };

        let output = {
            let _inflight = InflightGuard::enter();
            self.renderer.render(&invocation).await
        }
        .map_err(|err| RenderFailure::unhandled(err.to_string()))?;

        let mut logs = output.logs();

        if output.timed_out {
            logs.push_str(&format!(
                "\nError: Renderer did not finish within {} seconds and was terminated.",
                self.config.timeout.as_secs()
            ));
            return Err(RenderFailure::TimedOut {
                after: self.config.timeout,
                logs,
            });
        }

        match self.locator.locate_and_publish(layout, &self.videos).await {
            Ok(published) => {
                logs.push_str(&format!("\nVideo available at: {}", published.url));
                Ok(RenderedVideo {
                    job_id: layout.job_id(),
                    video_url: published.url,
                    logs,
                })
            }
            Err(LocateError::Missing { probed }) => {
                logs.push_str(&format!(
                    "\nError: Could not find or access the rendered video file. \
                     The renderer might have failed. Check stderr. Searched: {}",
                    probed.display()
                ));
                match fatal_script_pattern(&output.stderr) {
                    Some(pattern) => Err(RenderFailure::ScriptExecution { pattern, logs }),
                    None => Err(RenderFailure::ArtifactNotFound { probed, logs }),
                }
            }
            Err(LocateError::Publish(source)) => {
                logs.push_str(&format!(
                    "\nError: Rendered video could not be copied to the public directory: {source}"
                ));
                Err(RenderFailure::Publish { source, logs })
            }
        }
    }
}

/// Tracks running renderer processes, including ones abandoned by a dropped request.
struct InflightGuard;

impl InflightGuard {
    fn enter() -> Self {
        gauge!(METRIC_RENDER_INFLIGHT).increment(1.0);
        Self
    }
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        gauge!(METRIC_RENDER_INFLIGHT).decrement(1.0);
    }
}

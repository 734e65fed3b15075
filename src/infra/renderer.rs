//! The external renderer process adapter.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    process::Stdio,
    sync::{Arc, Mutex, PoisonError},
    time::{Duration, Instant},
};

use async_trait::async_trait;
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    process::Command,
    task::JoinHandle,
};
use tracing::{info, warn};

use crate::application::render::{ProcessOutput, RenderInvocation, RendererError, SceneRenderer};
use crate::config::RenderSettings;

/// How long output readers may keep draining after the child exits or is killed.
/// Grandchildren (ffmpeg) can hold the pipes open past the parent's death.
const READER_GRACE: Duration = Duration::from_secs(2);

/// Runs `<program> render <quality-flag> <script> <scene> --media_dir <dir>`.
///
/// The child gets a cleared environment holding only the configured passthrough variables,
/// with `HOME` and the working directory pointed at the job workspace.
#[derive(Debug, Clone)]
pub struct ManimCli {
    program: PathBuf,
    timeout: Duration,
    passthrough_env: Vec<String>,
}

impl ManimCli {
    pub fn new(program: PathBuf, timeout: Duration, passthrough_env: Vec<String>) -> Self {
        Self {
            program,
            timeout,
            passthrough_env,
        }
    }

    pub fn from_settings(settings: &RenderSettings) -> Self {
        Self::new(
            settings.program.clone(),
            settings.timeout,
            settings.passthrough_env.clone(),
        )
    }

    fn command(&self, invocation: &ResolvedInvocation<'_>) -> Command {
        let mut command = Command::new(&invocation.program);
        command
            .arg("render")
            .arg(invocation.quality_flag)
            .arg(&invocation.script_path)
            .arg(invocation.scene)
            .arg("--media_dir")
            .arg(&invocation.media_dir)
            .current_dir(&invocation.working_dir)
            .env_clear();

        for name in &self.passthrough_env {
            if let Some(value) = std::env::var_os(name) {
                command.env(name, value);
            }
        }

        command
            .env("HOME", &invocation.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}

/// Invocation with every path made absolute, since the child runs in another directory.
struct ResolvedInvocation<'a> {
    program: PathBuf,
    quality_flag: &'static str,
    script_path: PathBuf,
    scene: &'a str,
    media_dir: PathBuf,
    working_dir: PathBuf,
}

impl<'a> ResolvedInvocation<'a> {
    fn new(program: &Path, invocation: &'a RenderInvocation) -> std::io::Result<Self> {
        // Bare names are looked up on PATH; anything with a directory part is pinned.
        let program = if program.components().count() > 1 {
            std::path::absolute(program)?
        } else {
            program.to_path_buf()
        };
        Ok(Self {
            program,
            quality_flag: invocation.quality.flag(),
            script_path: std::path::absolute(&invocation.script_path)?,
            scene: invocation.scene.as_str(),
            media_dir: std::path::absolute(&invocation.media_dir)?,
            working_dir: std::path::absolute(&invocation.working_dir)?,
        })
    }
}

#[async_trait]
impl SceneRenderer for ManimCli {
    async fn render(&self, invocation: &RenderInvocation) -> Result<ProcessOutput, RendererError> {
        let started_at = Instant::now();
        let resolved =
            ResolvedInvocation::new(&self.program, invocation).map_err(RendererError::Io)?;

        let mut child = self.command(&resolved).spawn().map_err(|err| {
            warn!(
                target = "infra::renderer",
                op = "renderer::render",
                result = "error",
                elapsed_ms = started_at.elapsed().as_millis() as u64,
                program = %resolved.program.display(),
                error_code = "spawn_cli",
                error = %err,
                "Failed to spawn renderer"
            );
            if err.kind() == ErrorKind::NotFound {
                RendererError::NotFound(err)
            } else {
                RendererError::Io(err)
            }
        })?;

        let stdout = Capture::default();
        let stderr = Capture::default();
        let readers = [
            child.stdout.take().map(|pipe| stdout.drain(pipe)),
            child.stderr.take().map(|pipe| stderr.drain(pipe)),
        ];

        let (exit_code, timed_out) = match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(Ok(status)) => (status.code(), false),
            Ok(Err(err)) => {
                abort_all(readers);
                return Err(RendererError::Io(err));
            }
            Err(_) => {
                if let Err(err) = child.kill().await {
                    warn!(
                        target = "infra::renderer",
                        op = "renderer::render",
                        result = "kill_error",
                        pid = child.id().map(i64::from).unwrap_or(-1),
                        error = %err,
                        "Failed to kill timed out renderer"
                    );
                }
                (None, true)
            }
        };

        join_readers(readers).await;

        let output = ProcessOutput {
            exit_code,
            stdout: stdout.text(),
            stderr: stderr.text(),
            timed_out,
        };

        if timed_out {
            warn!(
                target = "infra::renderer",
                op = "renderer::render",
                result = "timed_out",
                elapsed_ms = started_at.elapsed().as_millis() as u64,
                timeout_secs = self.timeout.as_secs(),
                scene = invocation.scene.as_str(),
                stdout_bytes = output.stdout.len(),
                stderr_bytes = output.stderr.len(),
                "Renderer exceeded its time budget and was killed"
            );
        } else {
            let result = if output.exited_cleanly() {
                "ok"
            } else {
                "non_zero_exit"
            };
            info!(
                target = "infra::renderer",
                op = "renderer::render",
                result,
                elapsed_ms = started_at.elapsed().as_millis() as u64,
                exit_code = exit_code.map(i64::from).unwrap_or(-1),
                scene = invocation.scene.as_str(),
                stdout_bytes = output.stdout.len(),
                stderr_bytes = output.stderr.len(),
                "Renderer process finished"
            );
        }

        Ok(output)
    }
}

/// Output collected so far from one pipe; readable even if the reader is aborted.
#[derive(Debug, Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl Capture {
    fn drain<R>(&self, mut pipe: R) -> JoinHandle<()>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let sink = self.clone();
        tokio::spawn(async move {
            let mut chunk = [0u8; 8192];
            loop {
                match pipe.read(&mut chunk).await {
                    Ok(0) | Err(_) => break,
                    Ok(read) => sink.append(&chunk[..read]),
                }
            }
        })
    }

    fn append(&self, bytes: &[u8]) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(bytes);
    }

    fn text(&self) -> String {
        let buffer = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

async fn join_readers(readers: [Option<JoinHandle<()>>; 2]) {
    let aborts: Vec<_> = readers
        .iter()
        .flatten()
        .map(JoinHandle::abort_handle)
        .collect();
    let drained = tokio::time::timeout(READER_GRACE, async {
        for reader in readers.into_iter().flatten() {
            let _ = reader.await;
        }
    })
    .await;
    if drained.is_err() {
        for abort in aborts {
            abort.abort();
        }
    }
}

fn abort_all(readers: [Option<JoinHandle<()>>; 2]) {
    for reader in readers.into_iter().flatten() {
        reader.abort();
    }
}

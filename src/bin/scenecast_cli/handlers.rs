#![deny(clippy::all, clippy::pedantic)]

use std::fs;
use std::path::{Path, PathBuf};

use scenecast_api_types::{HEALTH_PATH, RENDER_PATH, RenderRequest};
use serde::Serialize;

use crate::client::{CliError, Ctx};

pub async fn render(
    ctx: &Ctx,
    file: &Path,
    scene: Option<String>,
    download: Option<PathBuf>,
) -> Result<(), CliError> {
    let code = fs::read_to_string(file).map_err(|source| CliError::InputFile {
        path: file.display().to_string(),
        source,
    })?;

    let response = match ctx
        .post_render(RENDER_PATH, &RenderRequest::new(code, scene))
        .await
    {
        Ok(response) => response,
        Err(CliError::Render {
            status,
            message,
            logs,
        }) => {
            // Renderer output is the only clue to a script error; show it verbatim.
            if !logs.is_empty() {
                eprintln!("{logs}");
            }
            return Err(CliError::Render {
                status,
                message,
                logs,
            });
        }
        Err(err) => return Err(err),
    };
    print_json(&response)?;

    if let (Some(target), Some(video_url)) = (download, response.video_url.as_deref()) {
        let bytes = ctx.get_bytes(video_url).await?;
        fs::write(&target, &bytes).map_err(|source| CliError::OutputFile {
            path: target.display().to_string(),
            source,
        })?;
        eprintln!("saved {} bytes to {}", bytes.len(), target.display());
    }

    Ok(())
}

pub async fn health(ctx: &Ctx) -> Result<(), CliError> {
    let status = ctx.get_unit(HEALTH_PATH).await?;
    println!("ok ({status})");
    Ok(())
}

pub fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let out = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::Server(format!("failed to render output: {e}")))?;
    println!("{out}");
    Ok(())
}

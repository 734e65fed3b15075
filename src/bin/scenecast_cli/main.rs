//! scenecast-cli: command-line client for the render service.
#![deny(clippy::all, clippy::pedantic)]

mod args;
mod client;
mod handlers;

use clap::Parser;

use args::{Cli, Commands};
use client::{CliError, build_ctx_from_cli};

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let ctx = build_ctx_from_cli(&cli)?;

    match cli.command {
        Commands::Render {
            file,
            scene,
            download,
        } => handlers::render(&ctx, &file, scene, download).await?,
        Commands::Health => handlers::health(&ctx).await?,
    }

    Ok(())
}

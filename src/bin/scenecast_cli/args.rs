//! Command-line surface for `scenecast-cli`.

#![deny(clippy::all, clippy::pedantic)]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "scenecast-cli", version, about = "Scenecast render service client", long_about = None)]
pub struct Cli {
    /// Service base URL, e.g. <http://127.0.0.1:3000>
    #[arg(long, env = "SCENECAST_SERVER_URL")]
    pub server: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Submit a scene script and print the render result
    Render {
        /// Script file to render
        file: PathBuf,
        /// Scene class to render (server default when omitted)
        #[arg(long)]
        scene: Option<String>,
        /// Save the published video to this path
        #[arg(long)]
        download: Option<PathBuf>,
    },
    /// Probe the service liveness endpoint
    Health,
}

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the scenecast binary.
#[derive(Debug, Parser)]
#[command(name = "scenecast", version, about = "Render service for generated animation scripts")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "SCENECAST_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the render HTTP service.
    Serve(Box<ServeArgs>),
    /// Render a single script locally and print the result as JSON.
    Render(RenderArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Clone)]
pub struct RenderArgs {
    #[command(flatten)]
    pub render: RenderOverrides,

    #[command(flatten)]
    pub logging: LoggingOverrides,

    /// Scene class to render; defaults to `GeneratedScene`.
    #[arg(long = "scene", value_name = "NAME")]
    pub scene: Option<String>,

    /// Script file to render.
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: PathBuf,
}

#[derive(Debug, Args, Default, Clone)]
pub struct LoggingOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct RenderOverrides {
    /// Override the renderer executable.
    #[arg(long = "render-program", value_name = "PATH")]
    pub program: Option<PathBuf>,

    /// Override the root directory for per-job workspaces.
    #[arg(long = "render-temp-root", value_name = "PATH")]
    pub temp_root: Option<PathBuf>,

    /// Override the render quality (low|medium|high|production|fourk).
    #[arg(long = "render-quality", value_name = "QUALITY")]
    pub quality: Option<String>,

    /// Override the renderer timeout.
    #[arg(long = "render-timeout-seconds", value_name = "SECONDS")]
    pub timeout_seconds: Option<u64>,

    /// Override the artifact discovery strategy (convention|scan).
    #[arg(long = "render-discovery", value_name = "STRATEGY")]
    pub discovery: Option<String>,

    /// Override the directory published videos are copied into.
    #[arg(long = "videos-directory", value_name = "PATH")]
    pub videos_directory: Option<PathBuf>,

    /// Override the URL prefix published videos are served under.
    #[arg(long = "videos-url-prefix", value_name = "PREFIX")]
    pub videos_url_prefix: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub render: RenderOverrides,

    #[command(flatten)]
    pub logging: LoggingOverrides,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the number of renderer processes allowed to run at once.
    #[arg(long = "render-max-concurrent-jobs", value_name = "COUNT")]
    pub max_concurrent_jobs: Option<u32>,

    /// Override the maximum accepted request body size in bytes.
    #[arg(long = "limits-max-request-bytes", value_name = "BYTES")]
    pub max_request_bytes: Option<u64>,
}

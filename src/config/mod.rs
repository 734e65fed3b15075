//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    net::SocketAddr,
    num::{NonZeroU32, NonZeroU64},
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::domain::render::{ArtifactDiscovery, QualityTier};

mod cli;

pub use cli::{
    CliArgs, Command, LoggingOverrides, RenderArgs, RenderOverrides, ServeArgs, ServeOverrides,
};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "scenecast";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_RENDER_PROGRAM: &str = "manim";
const DEFAULT_TEMP_ROOT: &str = "tmp_manim_renders";
const DEFAULT_RENDER_TIMEOUT_SECS: u64 = 180;
const DEFAULT_MAX_CONCURRENT_JOBS: u32 = 2;
const DEFAULT_PASSTHROUGH_ENV: &[&str] = &["PATH", "PYTHONPATH", "VIRTUAL_ENV", "LANG", "LC_ALL"];
const DEFAULT_VIDEOS_DIR: &str = "public/manim_videos";
const DEFAULT_VIDEOS_URL_PREFIX: &str = "/manim_videos";
const DEFAULT_MAX_REQUEST_BYTES: u64 = 1024 * 1024;

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub render: RenderSettings,
    pub videos: VideoSettings,
    pub limits: LimitSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub program: PathBuf,
    pub temp_root: PathBuf,
    pub quality: QualityTier,
    pub timeout: Duration,
    pub max_concurrent_jobs: NonZeroU32,
    pub discovery: ArtifactDiscovery,
    pub passthrough_env: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct VideoSettings {
    pub directory: PathBuf,
    pub url_prefix: String,
}

#[derive(Debug, Clone)]
pub struct LimitSettings {
    pub max_request_bytes: NonZeroU64,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(
        Environment::with_prefix("SCENECAST")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("render.passthrough_env")
            .try_parsing(true),
    );

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Render(args)) => {
            raw.apply_render_overrides(&args.render);
            raw.apply_logging_overrides(&args.logging);
        }
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    render: RawRenderSettings,
    videos: RawVideoSettings,
    limits: RawLimitSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(count) = overrides.max_concurrent_jobs {
            self.render.max_concurrent_jobs = Some(count);
        }
        if let Some(limit) = overrides.max_request_bytes {
            self.limits.max_request_bytes = Some(limit);
        }

        self.apply_render_overrides(&overrides.render);
        self.apply_logging_overrides(&overrides.logging);
    }

    fn apply_logging_overrides(&mut self, overrides: &LoggingOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }

    fn apply_render_overrides(&mut self, overrides: &RenderOverrides) {
        if let Some(program) = overrides.program.as_ref() {
            self.render.program = Some(program.clone());
        }
        if let Some(root) = overrides.temp_root.as_ref() {
            self.render.temp_root = Some(root.clone());
        }
        if let Some(quality) = overrides.quality.as_ref() {
            self.render.quality = Some(quality.clone());
        }
        if let Some(seconds) = overrides.timeout_seconds {
            self.render.timeout_seconds = Some(seconds);
        }
        if let Some(discovery) = overrides.discovery.as_ref() {
            self.render.discovery = Some(discovery.clone());
        }
        if let Some(directory) = overrides.videos_directory.as_ref() {
            self.videos.directory = Some(directory.clone());
        }
        if let Some(prefix) = overrides.videos_url_prefix.as_ref() {
            self.videos.url_prefix = Some(prefix.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            render,
            videos,
            limits,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            render: build_render_settings(render)?,
            videos: build_video_settings(videos)?,
            limits: build_limit_settings(limits)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_render_settings(render: RawRenderSettings) -> Result<RenderSettings, LoadError> {
    let program = render
        .program
        .unwrap_or_else(|| PathBuf::from(DEFAULT_RENDER_PROGRAM));
    if program.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "render.program",
            "path must not be empty",
        ));
    }

    let temp_root = render
        .temp_root
        .unwrap_or_else(|| PathBuf::from(DEFAULT_TEMP_ROOT));
    if temp_root.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "render.temp_root",
            "path must not be empty",
        ));
    }

    let quality = match render.quality {
        Some(value) => QualityTier::from_str(&value)
            .map_err(|reason| LoadError::invalid("render.quality", reason))?,
        None => QualityTier::Low,
    };

    let timeout_secs = render.timeout_seconds.unwrap_or(DEFAULT_RENDER_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "render.timeout_seconds",
            "must be greater than zero",
        ));
    }

    let max_concurrent_jobs = non_zero_u32(
        render
            .max_concurrent_jobs
            .unwrap_or(DEFAULT_MAX_CONCURRENT_JOBS)
            .into(),
        "render.max_concurrent_jobs",
    )?;

    let discovery = match render.discovery {
        Some(value) => ArtifactDiscovery::from_str(&value)
            .map_err(|reason| LoadError::invalid("render.discovery", reason))?,
        None => ArtifactDiscovery::Convention,
    };

    let passthrough_env = render
        .passthrough_env
        .unwrap_or_else(|| {
            DEFAULT_PASSTHROUGH_ENV
                .iter()
                .map(|name| name.to_string())
                .collect()
        })
        .into_iter()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect();

    Ok(RenderSettings {
        program,
        temp_root,
        quality,
        timeout: Duration::from_secs(timeout_secs),
        max_concurrent_jobs,
        discovery,
        passthrough_env,
    })
}

fn build_video_settings(videos: RawVideoSettings) -> Result<VideoSettings, LoadError> {
    let directory = videos
        .directory
        .unwrap_or_else(|| PathBuf::from(DEFAULT_VIDEOS_DIR));
    if directory.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "videos.directory",
            "path must not be empty",
        ));
    }

    let url_prefix = videos
        .url_prefix
        .unwrap_or_else(|| DEFAULT_VIDEOS_URL_PREFIX.to_string());
    let url_prefix = normalize_url_prefix(&url_prefix)
        .map_err(|reason| LoadError::invalid("videos.url_prefix", reason))?;

    Ok(VideoSettings {
        directory,
        url_prefix,
    })
}

fn build_limit_settings(limits: RawLimitSettings) -> Result<LimitSettings, LoadError> {
    let value = limits
        .max_request_bytes
        .unwrap_or(DEFAULT_MAX_REQUEST_BYTES);
    let max_request_bytes = NonZeroU64::new(value).ok_or_else(|| {
        LoadError::invalid("limits.max_request_bytes", "must be greater than zero")
    })?;
    usize::try_from(value).map_err(|_| {
        LoadError::invalid(
            "limits.max_request_bytes",
            "value exceeds supported range for usize",
        )
    })?;

    Ok(LimitSettings { max_request_bytes })
}

/// Accepts `/name` or `name` (optionally with a trailing slash) and returns `/name`.
fn normalize_url_prefix(value: &str) -> Result<String, String> {
    let trimmed = value.trim().trim_matches('/');
    if trimmed.is_empty() {
        return Err("prefix must name a path segment".to_string());
    }
    if trimmed.contains('/') {
        return Err(format!("prefix `{value}` must be a single path segment"));
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        || trimmed == "."
        || trimmed == ".."
    {
        return Err(format!("prefix `{value}` contains unsupported characters"));
    }
    Ok(format!("/{trimmed}"))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRenderSettings {
    program: Option<PathBuf>,
    temp_root: Option<PathBuf>,
    quality: Option<String>,
    timeout_seconds: Option<u64>,
    max_concurrent_jobs: Option<u32>,
    discovery: Option<String>,
    passthrough_env: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawVideoSettings {
    directory: Option<PathBuf>,
    url_prefix: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLimitSettings {
    max_request_bytes: Option<u64>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

#[cfg(test)]
mod tests;

#![deny(clippy::all, clippy::pedantic)]

use reqwest::{Client, Response, StatusCode, Url};
use scenecast_api_types::RenderResponse;
use thiserror::Error;

use crate::args::Cli;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("server URL is required (use --server or SCENECAST_SERVER_URL)")]
    MissingServer,
    #[error("failed to read input file {path}: {source}")]
    InputFile {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to write output file {path}: {source}")]
    OutputFile {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("render failed (status {status}): {message}")]
    Render {
        status: StatusCode,
        message: String,
        logs: String,
    },
    #[error("server error: {0}")]
    Server(String),
}

#[derive(Clone, Debug)]
pub struct Ctx {
    pub client: Client,
    pub base: Url,
}

impl Ctx {
    pub fn new(server: &str) -> Result<Self, CliError> {
        let base = Url::parse(server)?.join("/")?;
        let client = Client::builder().user_agent(Self::user_agent()).build()?;
        Ok(Self { client, base })
    }

    pub fn user_agent() -> &'static str {
        concat!("scenecast-cli/", env!("CARGO_PKG_VERSION"))
    }

    pub fn url(&self, path: &str) -> Result<Url, CliError> {
        self.base.join(path).map_err(CliError::Url)
    }

    /// POST a JSON body and decode a [`RenderResponse`] regardless of status.
    ///
    /// The render endpoint answers failures with the same JSON shape, so a non-2xx
    /// status only becomes an error after its `message` has been read.
    pub async fn post_render<B: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<RenderResponse, CliError> {
        let resp = self.client.post(self.url(path)?).json(body).send().await?;
        Self::handle_render(resp).await
    }

    async fn handle_render(resp: Response) -> Result<RenderResponse, CliError> {
        let status = resp.status();
        let bytes = resp.bytes().await?;
        match serde_json::from_slice::<RenderResponse>(&bytes) {
            Ok(body) if status.is_success() && body.success => Ok(body),
            Ok(body) => Err(CliError::Render {
                status,
                message: body.message,
                logs: body.logs,
            }),
            Err(err) if status.is_success() => {
                Err(CliError::Server(format!("failed to parse body: {err}")))
            }
            Err(_) => Err(CliError::Server(format!(
                "status {status} body {}",
                String::from_utf8_lossy(&bytes)
            ))),
        }
    }

    pub async fn get_bytes(&self, path: &str) -> Result<bytes::Bytes, CliError> {
        let resp = self.client.get(self.url(path)?).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(CliError::Server(format!("status {status} body {text}")));
        }
        Ok(resp.bytes().await?)
    }

    pub async fn get_unit(&self, path: &str) -> Result<StatusCode, CliError> {
        let resp = self.client.get(self.url(path)?).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(CliError::Server(format!("status {status} body {text}")));
        }
        Ok(status)
    }
}

pub fn build_ctx_from_cli(cli: &Cli) -> Result<Ctx, CliError> {
    let server = cli.server.as_deref().ok_or(CliError::MissingServer)?;
    Ctx::new(server)
}

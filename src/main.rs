use std::{future::IntoFuture, process, sync::Arc};

use scenecast::{
    application::{
        error::AppError,
        render::{RenderPipelineConfig, RenderService, SUCCESS_MESSAGE},
    },
    config,
    infra::{
        error::InfraError,
        http::{self, HttpState},
        renderer::ManimCli,
        telemetry,
        videos::VideoStore,
    },
};
use scenecast_api_types::RenderResponse;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Render(args) => run_render(settings, args).await,
    }
}

struct Application {
    render: Arc<RenderService>,
    videos: Arc<VideoStore>,
}

fn build_application(settings: &config::Settings) -> Result<Application, AppError> {
    let videos = VideoStore::new(
        settings.videos.directory.clone(),
        settings.videos.url_prefix.clone(),
    )
    .map_err(|err| AppError::from(InfraError::from(err)))?;
    let videos = Arc::new(videos);

    let renderer = Arc::new(ManimCli::from_settings(&settings.render));
    let render = Arc::new(RenderService::new(
        RenderPipelineConfig::from(&settings.render),
        renderer,
        videos.clone(),
    ));

    Ok(Application { render, videos })
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let app = build_application(&settings)?;
    let max_request_bytes = usize::try_from(settings.limits.max_request_bytes.get())
        .map_err(|_| AppError::from(InfraError::configuration("request limit exceeds usize")))?;

    let router = http::build_router(HttpState {
        render: app.render,
        videos: app.videos,
        max_request_bytes,
    });

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        addr = %settings.server.addr,
        renderer = %settings.render.program.display(),
        quality = settings.render.quality.as_str(),
        discovery = settings.render.discovery.as_str(),
        max_concurrent_jobs = settings.render.max_concurrent_jobs.get(),
        "scenecast listening"
    );

    let server = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => {
            return result.map_err(|err| AppError::unexpected(format!("server error: {err}")));
        }
        () = shutdown_signal() => {}
    }

    info!(
        grace_secs = settings.server.graceful_shutdown.as_secs(),
        "shutdown requested; draining in-flight requests"
    );
    match tokio::time::timeout(settings.server.graceful_shutdown, server).await {
        Ok(result) => result.map_err(|err| AppError::unexpected(format!("server error: {err}"))),
        Err(_) => {
            warn!("graceful shutdown window elapsed; abandoning open connections");
            Ok(())
        }
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

async fn run_render(settings: config::Settings, args: config::RenderArgs) -> Result<(), AppError> {
    let code = tokio::fs::read_to_string(&args.file)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    let app = build_application(&settings)?;

    let response = match app.render.execute(Some(code), args.scene.as_deref()).await {
        Ok(video) => RenderResponse::succeeded(video.video_url, SUCCESS_MESSAGE, video.logs),
        Err(failure) => RenderResponse::failed(failure.message(), failure.logs().to_string()),
    };

    let out = serde_json::to_string_pretty(&response)
        .map_err(|err| AppError::unexpected(format!("failed to render output: {err}")))?;
    println!("{out}");

    if response.success {
        Ok(())
    } else {
        Err(AppError::unexpected(format!(
            "render of `{}` failed: {}",
            args.file.display(),
            response.message
        )))
    }
}

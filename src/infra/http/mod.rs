//! HTTP surface: the render endpoint, published video serving and the liveness probe.

mod media;
mod middleware;
mod render;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::StatusCode,
    middleware as axum_middleware,
    response::IntoResponse,
    routing::{get, post},
};
use scenecast_api_types::{HEALTH_PATH, RENDER_PATH};

use crate::application::render::RenderService;
use crate::infra::videos::VideoStore;

#[derive(Clone)]
pub struct HttpState {
    pub render: Arc<RenderService>,
    pub videos: Arc<VideoStore>,
    pub max_request_bytes: usize,
}

pub fn build_router(state: HttpState) -> Router {
    let videos_route = format!("{}/{{file}}", state.videos.url_prefix());
    let body_limit = state.max_request_bytes;

    Router::new()
        .route(
            &format!("/{RENDER_PATH}"),
            post(render::render_manim).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route(&videos_route, get(media::serve_video))
        .route(&format!("/{HEALTH_PATH}"), get(health))
        .with_state(state)
        .layer(axum_middleware::from_fn(middleware::log_responses))
        .layer(axum_middleware::from_fn(middleware::set_request_context))
}

async fn health() -> impl IntoResponse {
    StatusCode::NO_CONTENT
}

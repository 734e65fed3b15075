use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use scenecast_api_types::{RenderRequest, RenderResponse};

use crate::application::{
    error::ErrorReport,
    render::{FailureClass, RenderFailure, SUCCESS_MESSAGE},
};

use super::HttpState;

const SOURCE: &str = "infra::http::render::render_manim";

pub(super) async fn render_manim(
    State(state): State<HttpState>,
    payload: Result<Json<RenderRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return rejection_response(rejection),
    };

    match state
        .render
        .execute(request.code, request.scene_name.as_deref())
        .await
    {
        Ok(video) => (
            StatusCode::OK,
            Json(RenderResponse::succeeded(
                video.video_url,
                SUCCESS_MESSAGE,
                video.logs,
            )),
        )
            .into_response(),
        Err(failure) => failure_response(failure),
    }
}

pub(super) fn status_for(class: FailureClass) -> StatusCode {
    match class {
        FailureClass::Client => StatusCode::BAD_REQUEST,
        FailureClass::Server => StatusCode::INTERNAL_SERVER_ERROR,
        FailureClass::Timeout => StatusCode::GATEWAY_TIMEOUT,
    }
}

fn failure_response(failure: RenderFailure) -> Response {
    let status = status_for(failure.class());
    let body = RenderResponse::failed(failure.message(), failure.logs().to_string());
    let mut response = (status, Json(body)).into_response();
    ErrorReport::from_error(SOURCE, status, &failure).attach(&mut response);
    response
}

/// Unreadable bodies get the same JSON failure shape as every other rejection.
fn rejection_response(rejection: JsonRejection) -> Response {
    let status = if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        StatusCode::PAYLOAD_TOO_LARGE
    } else {
        StatusCode::BAD_REQUEST
    };
    let body = RenderResponse::failed(
        format!("Invalid Manim code provided: {}.", rejection.body_text()),
        String::new(),
    );
    let mut response = (status, Json(body)).into_response();
    ErrorReport::from_error(SOURCE, status, &rejection).attach(&mut response);
    response
}

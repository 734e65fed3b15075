use std::io::ErrorKind;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{
        HeaderValue, StatusCode,
        header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use tracing::error;

use crate::application::error::HttpError;
use crate::infra::videos::VideoStoreError;

use super::HttpState;

pub(super) async fn serve_video(
    State(state): State<HttpState>,
    Path(file): Path<String>,
) -> Response {
    const SOURCE: &str = "infra::http::media::serve_video";

    match state.videos.read(&file).await {
        Ok(bytes) => build_video_response(&file, bytes),
        Err(VideoStoreError::InvalidName) => HttpError::new(
            SOURCE,
            StatusCode::NOT_FOUND,
            "Video not found",
            format!("`{file}` is not a valid video name"),
        )
        .into_response(),
        Err(VideoStoreError::Io(err)) if err.kind() == ErrorKind::NotFound => HttpError::new(
            SOURCE,
            StatusCode::NOT_FOUND,
            "Video not found",
            format!("`{file}` has not been published"),
        )
        .into_response(),
        Err(err) => {
            error!(
                target = SOURCE,
                file = %file,
                error = %err,
                "failed to read published video"
            );
            HttpError::from_error(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to read video",
                &err,
            )
            .into_response()
        }
    }
}

fn build_video_response(file: &str, bytes: Bytes) -> Response {
    let length = bytes.len();
    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    let mime = mime_guess::from_path(file).first_or_octet_stream();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&length.to_string()) {
        headers.insert(CONTENT_LENGTH, value);
    }
    // Published names embed a fresh job id and are never overwritten.
    headers.insert(
        CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=31536000, immutable"),
    );

    response
}

//! Wire types for the scenecast render API.
//!
//! Field names are camelCase on the wire so browser clients can post the same
//! payloads they already build.

use serde::{Deserialize, Serialize};

/// Scene rendered when a request does not name one.
pub const DEFAULT_SCENE_NAME: &str = "GeneratedScene";

/// Path of the render endpoint, relative to the server root.
pub const RENDER_PATH: &str = "api/render-manim";

/// Path of the liveness probe, relative to the server root.
pub const HEALTH_PATH: &str = "_health";

/// Body accepted by `POST /api/render-manim`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderRequest {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene_name: Option<String>,
}

impl RenderRequest {
    pub fn new(code: impl Into<String>, scene_name: Option<String>) -> Self {
        Self {
            code: Some(code.into()),
            scene_name,
        }
    }
}

/// Body returned by the render endpoint for both outcomes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    pub message: String,
    #[serde(default)]
    pub logs: String,
}

impl RenderResponse {
    pub fn succeeded(video_url: String, message: impl Into<String>, logs: String) -> Self {
        Self {
            success: true,
            video_url: Some(video_url),
            message: message.into(),
            logs,
        }
    }

    pub fn failed(message: impl Into<String>, logs: String) -> Self {
        Self {
            success: false,
            video_url: None,
            message: message.into(),
            logs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_uses_camel_case_scene_name() {
        let request: RenderRequest =
            serde_json::from_str(r#"{"code":"x = 1","sceneName":"Demo"}"#).expect("parse");
        assert_eq!(request.code.as_deref(), Some("x = 1"));
        assert_eq!(request.scene_name.as_deref(), Some("Demo"));
    }

    #[test]
    fn request_tolerates_missing_fields() {
        let request: RenderRequest = serde_json::from_str("{}").expect("parse");
        assert!(request.code.is_none());
        assert!(request.scene_name.is_none());
    }

    #[test]
    fn failure_omits_video_url() {
        let body = serde_json::to_value(RenderResponse::failed("nope", "log".into()))
            .expect("serialize");
        assert_eq!(body["success"], false);
        assert!(body.get("videoUrl").is_none());
        assert_eq!(body["logs"], "log");
    }
}

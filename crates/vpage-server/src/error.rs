//! Error types for the HTTP server.

use std::path::PathBuf;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use vpage_plugin::RenderError;

/// Server error type.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Rendering or transforming a page failed.
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// Build output directory is missing.
    #[error("Build output not found: {}", .0.display())]
    OutputNotFound(PathBuf),

    /// Build output could not be enumerated.
    #[error("Invalid artifact pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    /// Binding or serving failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "Request failed");
        let body = json!({"error": self.to_string()});
        (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;
    use vpage_plugin::PipelineError;

    use super::*;

    #[tokio::test]
    async fn test_render_error_is_500_json() {
        let err = ServerError::Render(RenderError::Render {
            page: "index".to_owned(),
            source: PipelineError::Worker("boom".to_owned()),
        });

        let response = err.into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(value["error"].as_str().unwrap().contains("index"));
    }
}

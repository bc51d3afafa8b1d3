use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Everything this API can fail with. The surface deliberately collapses
/// all failures to HTTP 400 with a `{status: "fail", message}` body; there
/// is no 404/500 distinction for clients.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    /// Fallback for failures that carry no usable message.
    #[error("Invalid data")]
    InvalidData,

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Database(e) => tracing::error!("Database error: {}", e),
            ApiError::Pool(e) => tracing::error!("Pool error: {}", e),
            _ => {}
        }

        let body = json!({
            "status": "fail",
            "message": self.to_string(),
        });

        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

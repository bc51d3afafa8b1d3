pub mod signup;
pub mod users;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// The full application router.
pub fn app(state: AppState) -> Router {
    let api = Router::new().merge(users::router()).merge(signup::router());

    Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Wrap a payload in the success envelope.
pub(crate) fn success(data: Value) -> Response {
    (
        StatusCode::OK,
        Json(json!({ "status": "success", "data": data })),
    )
        .into_response()
}

/// Success envelope with 201 for routes that created rows.
pub(crate) fn created(data: Value) -> Response {
    (
        StatusCode::CREATED,
        Json(json!({ "status": "success", "data": data })),
    )
        .into_response()
}

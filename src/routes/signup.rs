use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::Response;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use crate::db::models::NewUser;
use crate::db::store;
use crate::error::{ApiError, ApiResult};
use crate::routes::created;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", post(create_user))
        .route("/users/new/signup", post(signup))
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub score: Option<i64>,
}

impl CreateUserRequest {
    /// Check the payload and produce the row to insert. `full_name` must
    /// be present and non-empty after trimming.
    fn validate(self) -> Result<NewUser, ApiError> {
        let full_name = self
            .full_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ApiError::BadRequest("full_name is required".into()))?;

        Ok(NewUser {
            full_name,
            phone: self.phone,
            address: self.address,
            score: self.score,
        })
    }
}

/// Validated insert: a user row plus a starter profile. The response
/// echoes the validated input, not the stored row, so the generated id
/// never appears in it.
async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(payload) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let user = payload.validate()?;

    let user_id = store::insert_user(&state.db, &user)?;
    store::insert_profile(&state.db, user_id, "Hello world")?;

    Ok(created(json!({ "user": user })))
}

/// The canned multi-table walkthrough. Takes no body.
async fn signup(State(state): State<AppState>) -> ApiResult<Response> {
    let graph = store::demo_signup(&state.db, state.config.signup.atomic)?;
    Ok(created(json!({ "user": graph })))
}

use axum::extract::{Path, State};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use serde_json::json;

use crate::db::store;
use crate::error::{ApiError, ApiResult};
use crate::routes::success;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/{id}", get(filter_users))
        .route("/users/{id}/profile", get(user_profiles))
        .route("/users/{id}/posts", get(first_post))
        .route("/users/{id}/posts/{post_id}", get(post_with_categories))
}

/// Path ids are validated even where the showcase queries go on to ignore
/// them: any integer except zero passes. Extracted as a string so the
/// failure renders our envelope instead of the framework's rejection.
fn parse_user_id(raw: &str) -> Result<i64, ApiError> {
    match raw.trim().parse::<i64>() {
        Ok(id) if id != 0 => Ok(id),
        _ => Err(ApiError::BadRequest("Please provide a user id".into())),
    }
}

async fn list_users(State(state): State<AppState>) -> ApiResult<Response> {
    let users = store::list_users(&state.db)?;
    Ok(success(json!({ "users": users })))
}

async fn filter_users(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let id = parse_user_id(&id)?;

    let users = if state.config.api.strict_filters {
        store::users_by_id(&state.db, id)?
    } else {
        store::filtered_users(&state.db)?
    };

    Ok(success(json!({ "users": users })))
}

// The path id plays no role here; the route shape just mirrors the rest
// of the group.
async fn user_profiles(State(state): State<AppState>) -> ApiResult<Response> {
    let profiles = store::profiles_without_address(&state.db)?;
    Ok(success(json!({ "profiles": profiles })))
}

async fn first_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let id = parse_user_id(&id)?;

    let post = if state.config.api.strict_filters {
        store::author_first_post(&state.db, id)?
    } else {
        store::first_post_with_author(&state.db)?
    };
    let post = post.ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    Ok(success(json!({ "post": post })))
}

async fn post_with_categories(
    State(state): State<AppState>,
    Path((id, post_id)): Path<(String, String)>,
) -> ApiResult<Response> {
    let id = parse_user_id(&id)?;
    let post_id = parse_user_id(&post_id)?;

    let post = if state.config.api.strict_filters {
        store::post_detail_for_author(&state.db, post_id, id)?
    } else {
        store::first_post_detail(&state.db)?
    };
    let post = post.ok_or_else(|| ApiError::NotFound("Not found".into()))?;

    Ok(success(json!({ "post": post })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_ids_must_be_nonzero_integers() {
        assert_eq!(parse_user_id("7").unwrap(), 7);
        assert_eq!(parse_user_id(" 12 ").unwrap(), 12);
        assert_eq!(parse_user_id("-3").unwrap(), -3);

        assert!(parse_user_id("0").is_err());
        assert!(parse_user_id("abc").is_err());
        assert!(parse_user_id("").is_err());
        assert!(parse_user_id("1.5").is_err());
    }
}

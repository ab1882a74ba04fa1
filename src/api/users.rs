use axum::{
    extract::State,
    routing::{delete, get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::api::extract::{ApiJson, ApiPath};
use crate::api::response::ApiResponse;
use crate::error::{AppError, Result};
use crate::models::UserProfileView;
use crate::services::users::{self, NewUser, UserEmail};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct BulkDeleteRequest {
    user_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
struct FetchEmailsRequest {
    #[serde(rename = "userIds", default)]
    user_ids: Vec<Uuid>,
}

async fn list_users(State(state): State<AppState>) -> Result<ApiResponse<Vec<UserProfileView>>> {
    let users = users::list_with_emails(&state.pool, &state.auth_admin)
        .await
        .map_err(|e| e.context("Failed to fetch users"))?;

    Ok(ApiResponse::data(users))
}

async fn create_user(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<NewUser>,
) -> Result<ApiResponse<UserProfileView>> {
    let user = users::create(&state.pool, &state.auth_admin, request)
        .await
        .map_err(|e| e.context("Failed to create user"))?;

    Ok(ApiResponse::with_message("User created successfully", user))
}

async fn delete_user(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<Uuid>,
) -> Result<ApiResponse<()>> {
    users::delete(&state.pool, &state.auth_admin, user_id)
        .await
        .map_err(|e| e.context("Failed to delete user"))?;

    Ok(ApiResponse::message("User deleted successfully"))
}

async fn bulk_delete_users(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<BulkDeleteRequest>,
) -> Result<ApiResponse<serde_json::Value>> {
    let count = users::delete_many(&state.pool, &state.auth_admin, &request.user_ids)
        .await
        .map_err(|e| e.context("Failed to bulk delete users"))?;

    Ok(ApiResponse::with_message(
        format!("Successfully deleted {} users", count),
        json!({ "deleted_count": count }),
    ))
}

async fn fetch_emails(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<FetchEmailsRequest>,
) -> Result<ApiResponse<Vec<UserEmail>>> {
    if request.user_ids.is_empty() {
        return Err(AppError::Validation("No user IDs provided".to_string()));
    }

    let emails = users::fetch_emails(&state.auth_admin, &request.user_ids)
        .await
        .map_err(|e| e.context("Failed to fetch user emails"))?;

    Ok(ApiResponse::data(emails))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/bulk-delete", post(bulk_delete_users))
        .route("/users/fetch-emails", post(fetch_emails))
        .route("/users/:user_id", delete(delete_user))
}

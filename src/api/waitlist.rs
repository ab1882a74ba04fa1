use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::api::extract::ApiJson;
use crate::api::response::ApiResponse;
use crate::error::{AppError, Result};
use crate::models::WaitlistEntry;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
struct ArchiveRequest {
    user_ids: Option<Vec<Uuid>>,
}

async fn list_waitlist(State(state): State<AppState>) -> Result<ApiResponse<Vec<WaitlistEntry>>> {
    let entries = WaitlistEntry::list(&state.pool)
        .await
        .map_err(|e| AppError::from(e).context("Failed to fetch waitlist users"))?;

    Ok(ApiResponse::data(entries))
}

/// Archives the given entries, or every notified entry when none are given
async fn archive_waitlist(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ArchiveRequest>,
) -> Result<ApiResponse<serde_json::Value>> {
    let result = match request.user_ids.filter(|ids| !ids.is_empty()) {
        Some(ids) => WaitlistEntry::archive_many(&state.pool, &ids).await,
        None => WaitlistEntry::archive_notified(&state.pool).await,
    };
    let count = result.map_err(|e| AppError::from(e).context("Failed to archive waitlist users"))?;

    tracing::info!(count, "Waitlist entries archived");
    Ok(ApiResponse::with_message(
        format!("Successfully archived {} waitlist users", count),
        json!({ "archived_count": count }),
    ))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/waitlist", get(list_waitlist))
        .route("/waitlist/archive", post(archive_waitlist))
}

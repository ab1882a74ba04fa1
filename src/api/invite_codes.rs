use axum::{
    extract::State,
    routing::{delete, get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::response::ApiResponse;
use crate::error::{AppError, Result};
use crate::models::InviteCode;
use crate::services::email::templates::InviteKind;
use crate::services::invite_codes::{self, GenerateOptions};
use crate::state::AppState;

fn default_max_uses() -> i32 {
    1
}

fn default_expires_in_days() -> i64 {
    30
}

fn default_count() -> usize {
    1
}

#[derive(Debug, Deserialize)]
struct GenerateRequest {
    #[serde(default = "default_max_uses")]
    max_uses: i32,
    #[serde(default = "default_expires_in_days")]
    expires_in_days: i64,
    #[serde(default = "default_count")]
    count: usize,
}

#[derive(Debug, Deserialize)]
struct DeleteQuery {
    ids: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BulkDeleteRequest {
    code_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CodeIdRequest {
    code_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct SendInviteRequest {
    code_id: Uuid,
    recipient_email: String,
    #[serde(default)]
    recipient_name: String,
}

async fn list_codes(State(state): State<AppState>) -> Result<ApiResponse<Vec<InviteCode>>> {
    let codes = InviteCode::list(&state.pool)
        .await
        .map_err(|e| AppError::from(e).context("Failed to fetch invite codes"))?;

    Ok(ApiResponse::data(codes))
}

async fn generate_codes(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<GenerateRequest>,
) -> Result<ApiResponse<serde_json::Value>> {
    let options = GenerateOptions {
        max_uses: request.max_uses,
        expires_in_days: request.expires_in_days,
        count: request.count,
    };

    let created = invite_codes::generate(&state.pool, options)
        .await
        .map_err(|e| e.context("Failed to generate invite code"))?;

    let codes: Vec<&str> = created.iter().map(|c| c.code.as_str()).collect();
    let message = if codes.len() == 1 {
        "Invite code generated successfully".to_string()
    } else {
        format!("Generated {} invite codes successfully", codes.len())
    };

    Ok(ApiResponse::with_message(
        message,
        json!({ "code": codes.first(), "codes": codes }),
    ))
}

async fn delete_code(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<ApiResponse<()>> {
    let deleted = InviteCode::delete_by_id(&state.pool, id)
        .await
        .map_err(|e| AppError::from(e).context("Failed to delete invite code"))?;

    if deleted == 0 {
        return Err(AppError::NotFound("Invite code not found".to_string()));
    }

    tracing::info!(code_id = %id, "Invite code deleted");
    Ok(ApiResponse::message("Invite code deleted successfully"))
}

async fn delete_codes_by_query(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<DeleteQuery>,
) -> Result<ApiResponse<serde_json::Value>> {
    let raw_ids = query.ids.unwrap_or_default();
    let count = invite_codes::delete_by_id_list(&state.pool, &raw_ids)
        .await
        .map_err(|e| e.context("Failed to delete invite codes"))?;

    Ok(ApiResponse::with_message(
        format!("Successfully deleted {} invite codes", count),
        json!({ "deleted_count": count }),
    ))
}

async fn bulk_delete_codes(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<BulkDeleteRequest>,
) -> Result<ApiResponse<serde_json::Value>> {
    if request.code_ids.is_empty() {
        return Err(AppError::Validation("No code IDs provided".to_string()));
    }

    let count = invite_codes::delete_many(&state.pool, request.code_ids.iter().map(String::as_str))
        .await
        .map_err(|e| e.context("Failed to bulk delete invite codes"))?;

    Ok(ApiResponse::with_message(
        format!("Successfully deleted {} invite codes", count),
        json!({ "deleted_count": count }),
    ))
}

async fn set_archived(state: &AppState, id: Uuid, archived: bool) -> Result<()> {
    let updated = InviteCode::set_archived(&state.pool, id, archived).await?;
    if updated == 0 {
        return Err(AppError::NotFound("Invite code not found".to_string()));
    }
    tracing::info!(code_id = %id, archived, "Invite code archive flag updated");
    Ok(())
}

async fn archive_code(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CodeIdRequest>,
) -> Result<ApiResponse<()>> {
    set_archived(&state, request.code_id, true)
        .await
        .map_err(|e| e.context("Failed to archive invite code"))?;

    Ok(ApiResponse::message("Invite code archived successfully"))
}

async fn unarchive_code(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CodeIdRequest>,
) -> Result<ApiResponse<()>> {
    set_archived(&state, request.code_id, false)
        .await
        .map_err(|e| e.context("Failed to unarchive invite code"))?;

    Ok(ApiResponse::message("Invite code unarchived successfully"))
}

async fn bulk_archive_used(State(state): State<AppState>) -> Result<ApiResponse<serde_json::Value>> {
    let count = InviteCode::archive_used(&state.pool)
        .await
        .map_err(|e| AppError::from(e).context("Failed to bulk archive used codes"))?;

    Ok(ApiResponse::with_message(
        format!("Successfully archived {} used invite codes", count),
        json!({ "archived_count": count }),
    ))
}

async fn deliver_invite(state: &AppState, kind: InviteKind, request: &SendInviteRequest) -> Result<()> {
    if request.recipient_email.trim().parse::<lettre::Address>().is_err() {
        return Err(AppError::Validation("Invalid recipient email".to_string()));
    }

    let code = InviteCode::find_by_id(&state.pool, request.code_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Invite code not found".to_string()))?;

    state
        .email
        .send_invite(
            &state.pool,
            kind,
            &code,
            request.recipient_email.trim(),
            &request.recipient_name,
        )
        .await?;

    Ok(())
}

async fn send_invite(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SendInviteRequest>,
) -> Result<ApiResponse<()>> {
    deliver_invite(&state, InviteKind::Invitation, &request)
        .await
        .map_err(|e| e.context("Failed to send invite email"))?;

    Ok(ApiResponse::message(format!(
        "Invite sent successfully to {}",
        request.recipient_email.trim()
    )))
}

async fn send_reminder(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SendInviteRequest>,
) -> Result<ApiResponse<()>> {
    deliver_invite(&state, InviteKind::Reminder, &request)
        .await
        .map_err(|e| e.context("Failed to send reminder email"))?;

    Ok(ApiResponse::message(format!(
        "Reminder sent successfully to {}",
        request.recipient_email.trim()
    )))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/invite-codes",
            get(list_codes).delete(delete_codes_by_query),
        )
        .route("/invite-codes/generate", post(generate_codes))
        .route("/invite-codes/bulk-delete", post(bulk_delete_codes))
        .route("/invite-codes/archive", post(archive_code))
        .route("/invite-codes/unarchive", post(unarchive_code))
        .route("/invite-codes/bulk-archive-used", post(bulk_archive_used))
        .route("/invite-codes/send", post(send_invite))
        .route("/invite-codes/remind", post(send_reminder))
        .route("/invite-codes/:id", delete(delete_code))
}

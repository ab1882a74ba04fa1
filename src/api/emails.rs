use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::extract::ApiJson;
use crate::api::response::ApiResponse;
use crate::error::{AppError, Result};
use crate::services::email::{images::EmailImageUris, BulkEmailReport, EmailContent, EmailError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct BulkEmailRequest {
    custom_email: Option<EmailContent>,
    selected_user_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Deserialize)]
struct IndividualEmailRequest {
    individual_email: String,
    subject: String,
    text_content: String,
    html_content: String,
}

#[derive(Debug, Serialize)]
struct EmailImagesResponse {
    success: bool,
    images: EmailImageUris,
}

async fn send_bulk(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<BulkEmailRequest>,
) -> Result<ApiResponse<BulkEmailReport>> {
    let report = state
        .email
        .send_bulk(
            &state.pool,
            &state.auth_admin,
            request.custom_email,
            request.selected_user_ids.as_deref(),
        )
        .await
        .map_err(|e| match e {
            EmailError::NoRecipients => {
                AppError::NotFound("No users found to send emails to".to_string())
            }
            other => AppError::from(other).context("Failed to send bulk emails"),
        })?;

    Ok(ApiResponse::with_message(
        format!(
            "Emails processed: {} sent successfully, {} failed",
            report.success_count, report.error_count
        ),
        report,
    ))
}

async fn send_individual(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<IndividualEmailRequest>,
) -> Result<ApiResponse<()>> {
    let to = request.individual_email.trim();
    if to.parse::<lettre::Address>().is_err() {
        return Err(AppError::Validation("Invalid email address".to_string()));
    }
    if request.subject.trim().is_empty() {
        return Err(AppError::Validation("Subject is required".to_string()));
    }

    state
        .email
        .send_individual(to, &request.subject, &request.text_content, &request.html_content)
        .await
        .map_err(|e| AppError::from(e).context("Failed to send email"))?;

    Ok(ApiResponse::message(format!("Email sent successfully to {}", to)))
}

async fn email_images(State(state): State<AppState>) -> Json<EmailImagesResponse> {
    Json(EmailImagesResponse {
        success: true,
        images: state.email.assets.data_uris().await,
    })
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/emails/bulk", post(send_bulk))
        .route("/emails/individual", post(send_individual))
        .route("/emails/images", get(email_images))
}

use axum::{extract::State, routing::get, Router};
use serde::Serialize;

use crate::api::response::ApiResponse;
use crate::error::{AppError, Result};
use crate::models::InviteCode;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub total_codes: i64,
    pub usage_rate: f64,
    pub active_codes: i64,
    pub emails_sent: i64,
}

async fn dashboard_stats(State(state): State<AppState>) -> Result<ApiResponse<DashboardStats>> {
    let stats = InviteCode::stats(&state.pool)
        .await
        .map_err(|e| AppError::from(e).context("Failed to fetch dashboard stats"))?;

    Ok(ApiResponse::data(DashboardStats {
        total_codes: stats.total_codes,
        usage_rate: stats.usage_rate(),
        active_codes: stats.active_codes,
        emails_sent: stats.emails_sent,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/dashboard/stats", get(dashboard_stats))
}

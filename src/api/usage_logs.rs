use axum::{extract::State, routing::post, Json, Router};

use crate::api::extract::ApiJson;
use crate::error::Result;
use crate::services::usage_logs::{self, UsageLogFilter, UsageLogPage};
use crate::state::AppState;

async fn aggregated_usage(
    State(state): State<AppState>,
    ApiJson(filter): ApiJson<UsageLogFilter>,
) -> Result<Json<UsageLogPage>> {
    let page = usage_logs::aggregated(&state.pool, &filter)
        .await
        .map_err(|e| e.context("Failed to fetch usage logs"))?;

    Ok(Json(page))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/usage-logs/aggregated", post(aggregated_usage))
}

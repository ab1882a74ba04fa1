use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::api::extract::{ApiJson, ApiQuery};
use crate::api::response::ApiResponse;
use crate::error::Result;
use crate::models::{CreditBalance, CreditPurchase};
use crate::services::credits;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct BalanceQuery {
    user_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
struct PurchaseQuery {
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AssignRequest {
    user_id: Uuid,
    credits_to_add: f64,
    notes: Option<String>,
}

async fn list_balances(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<BalanceQuery>,
) -> Result<ApiResponse<Vec<CreditBalance>>> {
    let balances = credits::balances(&state.pool, &state.auth_admin, query.user_id)
        .await
        .map_err(|e| e.context("Failed to fetch credit balances"))?;

    Ok(ApiResponse::data(balances))
}

async fn assign_credits(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<AssignRequest>,
) -> Result<ApiResponse<serde_json::Value>> {
    let balance = credits::assign(
        &state.pool,
        &state.auth_admin,
        &state.email,
        request.user_id,
        request.credits_to_add,
        request.notes.as_deref(),
    )
    .await
    .map_err(|e| e.context("Failed to assign credits"))?;

    Ok(ApiResponse::with_message(
        format!("Successfully assigned {} credits to user", request.credits_to_add),
        json!({
            "userId": balance.user_id,
            "balanceDollars": balance.balance_dollars,
            "totalPurchased": balance.total_purchased,
            "totalUsed": balance.total_used,
        }),
    ))
}

async fn list_purchases(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PurchaseQuery>,
) -> Result<ApiResponse<Vec<CreditPurchase>>> {
    let purchases = credits::purchases(&state.pool, &state.auth_admin, query.status.as_deref())
        .await
        .map_err(|e| e.context("Failed to fetch credit purchases"))?;

    Ok(ApiResponse::data(purchases))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/credits/balances", get(list_balances))
        .route("/credits/assign", post(assign_credits))
        .route("/credits/purchases", get(list_purchases))
}

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// Filters accepted by `get_aggregated_usage_logs`
#[derive(Debug, Clone)]
pub struct UsageLogQuery {
    pub search_query: String,
    /// Empty string means every activity level
    pub activity_level: String,
    pub page: i32,
    pub page_size: i32,
    pub user_type: String,
}

/// One row of the aggregation function. Window totals repeat on every row.
#[derive(Debug, Clone, FromRow)]
pub struct UsageLogRow {
    pub user_id: Uuid,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
    pub total_prompt_tokens: Option<i64>,
    pub total_completion_tokens: Option<i64>,
    pub total_tokens: Option<i64>,
    pub total_estimated_cost: Option<f64>,
    pub usage_count: Option<i64>,
    pub earliest_activity: Option<DateTime<Utc>>,
    pub latest_activity: Option<DateTime<Utc>>,
    pub has_completed_payment: Option<bool>,
    pub activity_level: Option<String>,
    pub days_since_last_activity: Option<i64>,
    pub activity_score: Option<f64>,
    pub user_type: Option<String>,
    pub total_count: Option<i64>,
    pub grand_total_tokens: Option<i64>,
    pub grand_total_cost: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UsageLogSummary {
    pub user_id: Uuid,
    pub user_name: String,
    pub user_email: String,
    pub total_prompt_tokens: i64,
    pub total_completion_tokens: i64,
    pub total_tokens: i64,
    pub total_estimated_cost: f64,
    pub usage_count: i64,
    pub earliest_activity: DateTime<Utc>,
    pub latest_activity: DateTime<Utc>,
    pub has_completed_payment: bool,
    pub activity_level: String,
    pub days_since_last_activity: i64,
    pub activity_score: f64,
    pub user_type: String,
}

impl UsageLogRow {
    /// Calls the aggregation function with named arguments
    pub async fn aggregate(pool: &PgPool, query: &UsageLogQuery) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT
                user_id,
                user_name::text AS user_name,
                user_email::text AS user_email,
                total_prompt_tokens::bigint AS total_prompt_tokens,
                total_completion_tokens::bigint AS total_completion_tokens,
                total_tokens::bigint AS total_tokens,
                total_estimated_cost::float8 AS total_estimated_cost,
                usage_count::bigint AS usage_count,
                earliest_activity::timestamptz AS earliest_activity,
                latest_activity::timestamptz AS latest_activity,
                has_completed_payment,
                activity_level::text AS activity_level,
                days_since_last_activity::bigint AS days_since_last_activity,
                activity_score::float8 AS activity_score,
                user_type::text AS user_type,
                total_count::bigint AS total_count,
                grand_total_tokens::bigint AS grand_total_tokens,
                grand_total_cost::float8 AS grand_total_cost
            FROM get_aggregated_usage_logs(
                search_query => $1,
                activity_level_filter => $2,
                page_number => $3,
                page_size => $4,
                user_type_filter => $5
            )
            "#,
        )
        .bind(&query.search_query)
        .bind(&query.activity_level)
        .bind(query.page)
        .bind(query.page_size)
        .bind(&query.user_type)
        .fetch_all(pool)
        .await
    }

    pub fn into_summary(self, now: DateTime<Utc>) -> UsageLogSummary {
        UsageLogSummary {
            user_id: self.user_id,
            user_name: self.user_name.unwrap_or_default(),
            user_email: self.user_email.unwrap_or_default(),
            total_prompt_tokens: self.total_prompt_tokens.unwrap_or(0),
            total_completion_tokens: self.total_completion_tokens.unwrap_or(0),
            total_tokens: self.total_tokens.unwrap_or(0),
            total_estimated_cost: self.total_estimated_cost.unwrap_or(0.0),
            usage_count: self.usage_count.unwrap_or(0),
            earliest_activity: self.earliest_activity.unwrap_or(now),
            latest_activity: self.latest_activity.unwrap_or(now),
            has_completed_payment: self.has_completed_payment.unwrap_or(false),
            activity_level: self
                .activity_level
                .unwrap_or_else(|| "inactive".to_string()),
            days_since_last_activity: self.days_since_last_activity.unwrap_or(0),
            activity_score: self.activity_score.unwrap_or(0.0),
            user_type: self.user_type.unwrap_or_else(|| "external".to_string()),
        }
    }
}

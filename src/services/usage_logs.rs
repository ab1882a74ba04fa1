use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::error::AppError;
use crate::models::usage_log::{UsageLogQuery, UsageLogRow, UsageLogSummary};

const ACTIVITY_FILTERS: [&str; 5] = ["all", "high", "medium", "low", "inactive"];
const USER_TYPE_FILTERS: [&str; 2] = ["internal", "external"];

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UsageLogFilter {
    pub page: i32,
    pub limit: i32,
    pub search_query: String,
    pub activity_filter: String,
    pub user_type_filter: String,
}

impl Default for UsageLogFilter {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 10,
            search_query: String::new(),
            activity_filter: "all".to_string(),
            user_type_filter: "external".to_string(),
        }
    }
}

impl UsageLogFilter {
    /// Validates the filter and turns it into the aggregation's arguments
    pub fn to_query(&self) -> Result<UsageLogQuery, AppError> {
        if self.page < 1 {
            return Err(AppError::Validation("page must be at least 1".to_string()));
        }
        if !(1..=100).contains(&self.limit) {
            return Err(AppError::Validation(
                "limit must be between 1 and 100".to_string(),
            ));
        }
        if !ACTIVITY_FILTERS.contains(&self.activity_filter.as_str()) {
            return Err(AppError::Validation(format!(
                "activity_filter must be one of: {}",
                ACTIVITY_FILTERS.join(", ")
            )));
        }
        if !USER_TYPE_FILTERS.contains(&self.user_type_filter.as_str()) {
            return Err(AppError::Validation(format!(
                "user_type_filter must be one of: {}",
                USER_TYPE_FILTERS.join(", ")
            )));
        }

        let activity_level = match self.activity_filter.as_str() {
            "all" => String::new(),
            level => level.to_string(),
        };

        Ok(UsageLogQuery {
            search_query: self.search_query.clone(),
            activity_level,
            page: self.page,
            page_size: self.limit,
            user_type: self.user_type_filter.clone(),
        })
    }
}

/// One page of per-user usage plus totals across the whole filtered set
#[derive(Debug, Clone, Serialize)]
pub struct UsageLogPage {
    pub success: bool,
    pub data: Vec<UsageLogSummary>,
    pub total_count: i64,
    pub grand_total_tokens: i64,
    pub grand_total_cost: f64,
    pub page: i32,
    pub limit: i32,
}

impl UsageLogPage {
    fn from_rows(rows: Vec<UsageLogRow>, page: i32, limit: i32) -> Self {
        let (total_count, grand_total_tokens, grand_total_cost) = rows
            .first()
            .map(|row| {
                (
                    row.total_count.unwrap_or(0),
                    row.grand_total_tokens.unwrap_or(0),
                    row.grand_total_cost.unwrap_or(0.0),
                )
            })
            .unwrap_or((0, 0, 0.0));

        let now = Utc::now();
        Self {
            success: true,
            data: rows.into_iter().map(|row| row.into_summary(now)).collect(),
            total_count,
            grand_total_tokens,
            grand_total_cost,
            page,
            limit,
        }
    }
}

pub async fn aggregated(pool: &PgPool, filter: &UsageLogFilter) -> Result<UsageLogPage, AppError> {
    let query = filter.to_query()?;
    let rows = UsageLogRow::aggregate(pool, &query).await?;

    tracing::debug!(rows = rows.len(), page = filter.page, "Fetched aggregated usage logs");
    Ok(UsageLogPage::from_rows(rows, filter.page, filter.limit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn row(total_tokens: i64) -> UsageLogRow {
        UsageLogRow {
            user_id: Uuid::new_v4(),
            user_name: Some("Ada".to_string()),
            user_email: None,
            total_prompt_tokens: Some(total_tokens / 2),
            total_completion_tokens: Some(total_tokens / 2),
            total_tokens: Some(total_tokens),
            total_estimated_cost: Some(0.5),
            usage_count: Some(3),
            earliest_activity: None,
            latest_activity: None,
            has_completed_payment: None,
            activity_level: None,
            days_since_last_activity: Some(2),
            activity_score: None,
            user_type: None,
            total_count: Some(42),
            grand_total_tokens: Some(9000),
            grand_total_cost: Some(12.5),
        }
    }

    #[test]
    fn test_all_activity_maps_to_empty_filter() {
        let query = UsageLogFilter::default().to_query().unwrap();
        assert_eq!(query.activity_level, "");
        assert_eq!(query.page, 1);
        assert_eq!(query.page_size, 10);
        assert_eq!(query.user_type, "external");

        let filter = UsageLogFilter {
            activity_filter: "high".to_string(),
            ..Default::default()
        };
        assert_eq!(filter.to_query().unwrap().activity_level, "high");
    }

    #[test]
    fn test_invalid_filters() {
        let cases = [
            UsageLogFilter { page: 0, ..Default::default() },
            UsageLogFilter { limit: 0, ..Default::default() },
            UsageLogFilter { limit: 101, ..Default::default() },
            UsageLogFilter { activity_filter: "extreme".to_string(), ..Default::default() },
            UsageLogFilter { user_type_filter: "staff".to_string(), ..Default::default() },
        ];
        for filter in cases {
            assert!(matches!(filter.to_query(), Err(AppError::Validation(_))));
        }
    }

    #[test]
    fn test_totals_come_from_first_row() {
        let page = UsageLogPage::from_rows(vec![row(100), row(50)], 2, 10);
        assert_eq!(page.total_count, 42);
        assert_eq!(page.grand_total_tokens, 9000);
        assert_eq!(page.grand_total_cost, 12.5);
        assert_eq!(page.data.len(), 2);
        assert_eq!(page.data[0].activity_level, "inactive");
        assert_eq!(page.data[0].user_type, "external");
        assert_eq!(page.page, 2);
    }

    #[test]
    fn test_empty_result_is_zeroed() {
        let page = UsageLogPage::from_rows(Vec::new(), 1, 10);
        assert_eq!(page.total_count, 0);
        assert_eq!(page.grand_total_cost, 0.0);
        assert!(page.data.is_empty());
    }
}

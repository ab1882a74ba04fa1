use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{types::Json, FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

pub const PURCHASE_STATUSES: [&str; 4] = ["completed", "pending", "failed", "refunded"];

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CreditBalance {
    pub user_id: Uuid,
    pub balance_dollars: f64,
    pub total_purchased: f64,
    pub total_used: f64,
    pub last_updated: DateTime<Utc>,
    pub metadata: Value,
    pub user_name: Option<String>,
    #[sqlx(default)]
    pub user_email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CreditPurchase {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount_dollars: f64,
    pub stripe_payment_intent_id: Option<String>,
    pub stripe_charge_id: Option<String>,
    pub status: String,
    pub description: Option<String>,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub user_name: Option<String>,
    #[sqlx(default)]
    pub user_email: Option<String>,
}

const BALANCE_COLUMNS: &str = r#"
    cb.user_id,
    cb.balance_dollars::float8 AS balance_dollars,
    cb.total_purchased::float8 AS total_purchased,
    cb.total_used::float8 AS total_used,
    cb.last_updated,
    COALESCE(cb.metadata, '{}'::jsonb) AS metadata,
    up.full_name AS user_name
"#;

impl CreditBalance {
    /// Lists balances, most recently updated first
    pub async fn list(pool: &PgPool, user_id: Option<Uuid>) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT {}
            FROM credit_balance cb
            LEFT JOIN user_profiles up ON up.user_id = cb.user_id
            WHERE ($1::uuid IS NULL OR cb.user_id = $1)
            ORDER BY cb.last_updated DESC
            "#,
            BALANCE_COLUMNS
        );
        sqlx::query_as::<_, Self>(&sql)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Adds `amount` to a user's balance inside `tx`, creating the row on the
    /// first assignment. A single upsert, so concurrent first assignments
    /// serialize on the `user_id` key instead of racing to insert.
    pub async fn add_credits(
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        amount: f64,
        notes: Option<&str>,
    ) -> Result<Self, sqlx::Error> {
        let now = Utc::now();
        let assignment = serde_json::json!({
            "amount": amount,
            "timestamp": now.to_rfc3339(),
            "notes": notes,
        });

        sqlx::query_as::<_, Self>(&upsert_balance_sql())
            .bind(user_id)
            .bind(amount)
            .bind(now)
            .bind(Json(assignment))
            .fetch_one(&mut **tx)
            .await
    }
}

fn upsert_balance_sql() -> String {
    format!(
        r#"
        WITH cb AS (
            INSERT INTO credit_balance (
                user_id, balance_dollars, total_purchased, total_used, last_updated, metadata
            )
            VALUES ($1, $2, $2, 0, $3, jsonb_build_object('initial_assignment', $4::jsonb))
            ON CONFLICT (user_id) DO UPDATE
            SET balance_dollars = credit_balance.balance_dollars + EXCLUDED.balance_dollars,
                total_purchased = credit_balance.total_purchased + EXCLUDED.total_purchased,
                last_updated = EXCLUDED.last_updated,
                metadata = COALESCE(credit_balance.metadata, '{{}}'::jsonb)
                    || jsonb_build_object('last_assignment', $4::jsonb)
            RETURNING *
        )
        SELECT {} FROM cb LEFT JOIN user_profiles up ON up.user_id = cb.user_id
        "#,
        BALANCE_COLUMNS
    )
}

impl CreditPurchase {
    /// Lists purchases, newest first, optionally filtered by status
    pub async fn list(pool: &PgPool, status: Option<&str>) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT
                cp.id, cp.user_id,
                cp.amount_dollars::float8 AS amount_dollars,
                cp.stripe_payment_intent_id, cp.stripe_charge_id,
                cp.status, cp.description,
                COALESCE(cp.metadata, '{}'::jsonb) AS metadata,
                cp.created_at, cp.completed_at, cp.expires_at,
                up.full_name AS user_name
            FROM credit_purchases cp
            LEFT JOIN user_profiles up ON up.user_id = cp.user_id
            WHERE ($1::text IS NULL OR cp.status = $1)
            ORDER BY cp.created_at DESC
            "#,
        )
        .bind(status)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assignment_is_one_upsert() {
        let sql = upsert_balance_sql();
        assert!(sql.contains("ON CONFLICT (user_id) DO UPDATE"));
        assert!(sql.contains("jsonb_build_object('initial_assignment', $4::jsonb)"));
        assert!(sql.contains("jsonb_build_object('last_assignment', $4::jsonb)"));
        assert!(sql.contains("COALESCE(credit_balance.metadata, '{}'::jsonb)"));
        assert!(!sql.contains("FOR UPDATE"));
    }
}

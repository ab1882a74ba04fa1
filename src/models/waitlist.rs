use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WaitlistEntry {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub company: Option<String>,
    pub phone_number: String,
    pub country_code: String,
    pub reference: Option<String>,
    pub referral_source: Option<String>,
    pub referral_source_other: Option<String>,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub joined_at: DateTime<Utc>,
    pub notified_at: Option<DateTime<Utc>>,
    pub is_notified: bool,
    pub is_archived: bool,
}

impl WaitlistEntry {
    /// Lists the waitlist, most recent sign-ups first
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT
                id, full_name, email, company, phone_number, country_code,
                reference, referral_source, referral_source_other, user_agent,
                ip_address::text AS ip_address,
                joined_at, notified_at, is_notified,
                COALESCE(is_archived, FALSE) AS is_archived
            FROM waitlist
            ORDER BY joined_at DESC
            "#,
        )
        .fetch_all(pool)
        .await
    }

    /// Archives the given entries; rows already archived are left alone
    pub async fn archive_many(pool: &PgPool, ids: &[Uuid]) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE waitlist
            SET is_archived = TRUE
            WHERE id = ANY($1) AND COALESCE(is_archived, FALSE) = FALSE
            "#,
        )
        .bind(ids)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Archives every entry that has already been notified
    pub async fn archive_notified(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE waitlist
            SET is_archived = TRUE
            WHERE is_notified = TRUE AND COALESCE(is_archived, FALSE) = FALSE
            "#,
        )
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }
}

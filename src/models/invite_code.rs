use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

const INVITE_CODE_COLUMNS: &str = r#"
    id, code, is_used, used_by, used_at, created_at, expires_at,
    max_uses, current_uses,
    COALESCE(email_sent_to, '{}'::text[]) AS email_sent_to,
    reminder_sent_at,
    COALESCE(is_archived, FALSE) AS is_archived
"#;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InviteCode {
    pub id: Uuid,
    pub code: String,
    pub is_used: bool,
    pub used_by: Option<Uuid>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub max_uses: i32,
    pub current_uses: i32,
    pub email_sent_to: Vec<String>,
    pub reminder_sent_at: Option<DateTime<Utc>>,
    pub is_archived: bool,
}

/// Aggregate figures for the dashboard cards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, FromRow)]
pub struct InviteCodeStats {
    pub total_codes: i64,
    pub used_codes: i64,
    pub active_codes: i64,
    pub emails_sent: i64,
}

impl InviteCode {
    /// Lists every invite code, newest first
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM invite_codes ORDER BY created_at DESC",
            INVITE_CODE_COLUMNS
        );
        sqlx::query_as::<_, Self>(&sql).fetch_all(pool).await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM invite_codes WHERE id = $1",
            INVITE_CODE_COLUMNS
        );
        sqlx::query_as::<_, Self>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Inserts a batch of fresh, unused codes sharing the same limits
    pub async fn insert_batch(
        pool: &PgPool,
        codes: &[String],
        max_uses: i32,
        expires_at: DateTime<Utc>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO invite_codes (code, is_used, max_uses, current_uses, expires_at, email_sent_to)
            SELECT code, FALSE, $2, 0, $3, '{{}}'::text[]
            FROM UNNEST($1::text[]) AS batch(code)
            RETURNING {}
            "#,
            INVITE_CODE_COLUMNS
        );
        sqlx::query_as::<_, Self>(&sql)
            .bind(codes)
            .bind(max_uses)
            .bind(expires_at)
            .fetch_all(pool)
            .await
    }

    pub async fn delete_by_id(pool: &PgPool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM invite_codes WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Deletes all listed codes in a single statement
    pub async fn delete_many(pool: &PgPool, ids: &[Uuid]) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM invite_codes WHERE id = ANY($1)")
            .bind(ids)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn set_archived(pool: &PgPool, id: Uuid, is_archived: bool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE invite_codes SET is_archived = $2 WHERE id = $1")
            .bind(id)
            .bind(is_archived)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Archives every used code that is not archived yet
    pub async fn archive_used(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE invite_codes
            SET is_archived = TRUE
            WHERE is_used = TRUE AND COALESCE(is_archived, FALSE) = FALSE
            "#,
        )
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Appends a recipient to `email_sent_to`, keeping the list free of duplicates
    pub async fn record_email_sent(pool: &PgPool, id: Uuid, email: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE invite_codes
            SET email_sent_to = array_append(COALESCE(email_sent_to, '{}'::text[]), $2)
            WHERE id = $1 AND NOT ($2 = ANY(COALESCE(email_sent_to, '{}'::text[])))
            "#,
        )
        .bind(id)
        .bind(email)
        .execute(pool)
        .await?;

        Ok(())
    }

    pub async fn mark_reminder_sent(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE invite_codes SET reminder_sent_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(())
    }

    pub async fn stats(pool: &PgPool) -> Result<InviteCodeStats, sqlx::Error> {
        sqlx::query_as::<_, InviteCodeStats>(
            r#"
            SELECT
                COUNT(*)::bigint AS total_codes,
                COUNT(*) FILTER (WHERE is_used)::bigint AS used_codes,
                COUNT(*) FILTER (
                    WHERE NOT is_used
                      AND NOT COALESCE(is_archived, FALSE)
                      AND (expires_at IS NULL OR expires_at > NOW())
                )::bigint AS active_codes,
                COALESCE(SUM(COALESCE(cardinality(email_sent_to), 0)), 0)::bigint AS emails_sent
            FROM invite_codes
            "#,
        )
        .fetch_one(pool)
        .await
    }
}

impl InviteCodeStats {
    /// Share of codes that have been used, as a percentage
    pub fn usage_rate(&self) -> f64 {
        if self.total_codes == 0 {
            return 0.0;
        }
        (self.used_codes as f64 / self.total_codes as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_rate_with_no_codes() {
        assert_eq!(InviteCodeStats::default().usage_rate(), 0.0);
    }

    #[test]
    fn test_usage_rate_percentage() {
        let stats = InviteCodeStats {
            total_codes: 8,
            used_codes: 2,
            active_codes: 5,
            emails_sent: 3,
        };
        assert_eq!(stats.usage_rate(), 25.0);
    }
}

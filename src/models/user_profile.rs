use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{types::Json, FromRow, PgPool};
use uuid::Uuid;

pub const DEFAULT_PLAN_TYPE: &str = "seed";
pub const DEFAULT_ACCOUNT_TYPE: &str = "individual";

const PROFILE_COLUMNS: &str = r#"
    id, user_id, full_name, preferred_name, work_description,
    personal_references, created_at, updated_at, avatar_url,
    referral_source, consent_given, consent_date, metadata,
    plan_type, account_type
"#;

#[derive(Debug, Clone, FromRow)]
pub struct UserProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub full_name: String,
    pub preferred_name: Option<String>,
    pub work_description: Option<String>,
    pub personal_references: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub avatar_url: Option<String>,
    pub referral_source: Option<String>,
    pub consent_given: Option<bool>,
    pub consent_date: Option<DateTime<Utc>>,
    pub metadata: Option<Json<Value>>,
    pub plan_type: Option<String>,
    pub account_type: Option<String>,
}

/// Profile as returned to the dashboard, with the auth email joined in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfileView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub full_name: String,
    pub preferred_name: String,
    pub work_description: String,
    pub personal_references: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub avatar_url: Option<String>,
    pub referral_source: Option<String>,
    pub consent_given: Option<bool>,
    pub consent_date: Option<DateTime<Utc>>,
    pub email: String,
    pub metadata: Option<Value>,
    pub plan_type: String,
    pub account_type: String,
}

#[derive(Debug, Clone)]
pub struct CreateProfileData {
    pub user_id: Uuid,
    pub full_name: String,
    pub preferred_name: String,
    pub work_description: String,
    pub metadata: Value,
}

/// Minimal profile row used when addressing emails
#[derive(Debug, Clone, FromRow)]
pub struct ProfileContact {
    pub user_id: Uuid,
    pub full_name: String,
}

impl UserProfile {
    pub fn into_view(self, email: Option<String>) -> UserProfileView {
        UserProfileView {
            id: self.id,
            user_id: self.user_id,
            full_name: self.full_name,
            preferred_name: self.preferred_name.unwrap_or_default(),
            work_description: self.work_description.unwrap_or_default(),
            personal_references: self.personal_references,
            created_at: self.created_at,
            updated_at: self.updated_at,
            avatar_url: self.avatar_url,
            referral_source: self.referral_source,
            consent_given: self.consent_given,
            consent_date: self.consent_date,
            email: email.unwrap_or_else(|| "Email not available".to_string()),
            metadata: self.metadata.map(|Json(value)| value),
            plan_type: self
                .plan_type
                .filter(|p| !p.is_empty())
                .unwrap_or_else(|| DEFAULT_PLAN_TYPE.to_string()),
            account_type: self
                .account_type
                .filter(|a| !a.is_empty())
                .unwrap_or_else(|| DEFAULT_ACCOUNT_TYPE.to_string()),
        }
    }

    /// Lists every profile, newest first
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM user_profiles ORDER BY created_at DESC",
            PROFILE_COLUMNS
        );
        sqlx::query_as::<_, Self>(&sql).fetch_all(pool).await
    }

    pub async fn create(pool: &PgPool, data: CreateProfileData) -> Result<Self, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO user_profiles (
                user_id, full_name, preferred_name, work_description,
                metadata, plan_type, account_type
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            PROFILE_COLUMNS
        );
        sqlx::query_as::<_, Self>(&sql)
            .bind(data.user_id)
            .bind(&data.full_name)
            .bind(&data.preferred_name)
            .bind(&data.work_description)
            .bind(Json(&data.metadata))
            .bind(DEFAULT_PLAN_TYPE)
            .bind(DEFAULT_ACCOUNT_TYPE)
            .fetch_one(pool)
            .await
    }

    pub async fn delete_by_user_id(pool: &PgPool, user_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM user_profiles WHERE user_id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Profiles that can receive email, optionally limited to `user_ids`
    pub async fn contacts(
        pool: &PgPool,
        user_ids: Option<&[Uuid]>,
    ) -> Result<Vec<ProfileContact>, sqlx::Error> {
        match user_ids {
            Some(ids) => {
                sqlx::query_as::<_, ProfileContact>(
                    r#"
                    SELECT user_id, full_name FROM user_profiles
                    WHERE user_id IS NOT NULL AND user_id = ANY($1)
                    "#,
                )
                .bind(ids)
                .fetch_all(pool)
                .await
            }
            None => {
                sqlx::query_as::<_, ProfileContact>(
                    "SELECT user_id, full_name FROM user_profiles WHERE user_id IS NOT NULL",
                )
                .fetch_all(pool)
                .await
            }
        }
    }

    /// Merges `patch` into the profile metadata and bumps `updated_at`
    pub async fn merge_metadata(pool: &PgPool, user_id: Uuid, patch: &Value) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE user_profiles
            SET metadata = COALESCE(metadata, '{}'::jsonb) || $2,
                updated_at = NOW()
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(Json(patch))
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> UserProfile {
        UserProfile {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            full_name: "Ada Lovelace".to_string(),
            preferred_name: None,
            work_description: None,
            personal_references: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            avatar_url: None,
            referral_source: None,
            consent_given: None,
            consent_date: None,
            metadata: None,
            plan_type: Some(String::new()),
            account_type: None,
        }
    }

    #[test]
    fn test_view_fills_defaults() {
        let view = profile().into_view(None);
        assert_eq!(view.email, "Email not available");
        assert_eq!(view.plan_type, "seed");
        assert_eq!(view.account_type, "individual");
        assert_eq!(view.preferred_name, "");
    }

    #[test]
    fn test_view_keeps_email() {
        let view = profile().into_view(Some("ada@example.com".to_string()));
        assert_eq!(view.email, "ada@example.com");
    }
}

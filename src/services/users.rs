use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::user_profile::{CreateProfileData, UserProfile, UserProfileView};
use crate::services::auth_admin::{AuthAdminClient, AuthAdminError};

pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub preferred_name: Option<String>,
    pub work_description: Option<String>,
    pub metadata: Option<Value>,
}

impl NewUser {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.email.trim().parse::<lettre::Address>().is_err() {
            return Err(AppError::Validation("Invalid email address".to_string()));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::Validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        if self.full_name.trim().is_empty() {
            return Err(AppError::Validation("Full name is required".to_string()));
        }
        Ok(())
    }

    /// Falls back to the first word of the full name
    pub fn preferred_name(&self) -> String {
        self.preferred_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .or_else(|| self.full_name.split_whitespace().next())
            .unwrap_or_default()
            .to_string()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserEmail {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
}

/// All profiles with their auth email attached
pub async fn list_with_emails(
    pool: &PgPool,
    auth: &AuthAdminClient,
) -> Result<Vec<UserProfileView>, AppError> {
    let profiles = UserProfile::list(pool).await?;
    let mut directory = auth.email_directory().await?;

    Ok(profiles
        .into_iter()
        .map(|profile| {
            let email = directory.remove(&profile.user_id);
            profile.into_view(email)
        })
        .collect())
}

/// Creates the auth account, then the profile. A failed profile insert
/// removes the auth account again so no orphan is left behind.
#[tracing::instrument(skip(pool, auth, new_user), fields(email = %new_user.email))]
pub async fn create(
    pool: &PgPool,
    auth: &AuthAdminClient,
    new_user: NewUser,
) -> Result<UserProfileView, AppError> {
    new_user.validate()?;

    let email = new_user.email.trim().to_string();
    let auth_user = auth
        .create_user(&email, &new_user.password)
        .await
        .map_err(|e| match e {
            AuthAdminError::ApiError { status, message } if status.is_client_error() => {
                AppError::Validation(format!("Failed to create auth user: {}", message))
            }
            other => AppError::AuthAdmin(other),
        })?;

    let data = CreateProfileData {
        user_id: auth_user.id,
        full_name: new_user.full_name.trim().to_string(),
        preferred_name: new_user.preferred_name(),
        work_description: new_user
            .work_description
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string(),
        metadata: new_user
            .metadata
            .clone()
            .unwrap_or_else(|| Value::Object(Default::default())),
    };

    match UserProfile::create(pool, data).await {
        Ok(profile) => {
            tracing::info!(user_id = %auth_user.id, "User created");
            Ok(profile.into_view(Some(email)))
        }
        Err(e) => {
            tracing::error!(user_id = %auth_user.id, error = %e, "Profile insert failed, removing auth user");
            if let Err(cleanup) = auth.delete_user(auth_user.id).await {
                tracing::error!(user_id = %auth_user.id, error = %cleanup, "Failed to remove auth user");
            }
            Err(e.into())
        }
    }
}

/// Deletes the profile, then the auth account
#[tracing::instrument(skip(pool, auth))]
pub async fn delete(pool: &PgPool, auth: &AuthAdminClient, user_id: Uuid) -> Result<(), AppError> {
    let removed = UserProfile::delete_by_user_id(pool, user_id).await?;

    match auth.delete_user(user_id).await {
        Ok(()) => {}
        // A profile without an auth account still counts as deleted
        Err(AuthAdminError::UserNotFound(_)) if removed > 0 => {
            tracing::warn!(%user_id, "Auth user already absent");
        }
        Err(AuthAdminError::UserNotFound(_)) => {
            return Err(AppError::NotFound("User not found".to_string()));
        }
        Err(e) => return Err(e.into()),
    }

    tracing::info!(%user_id, "User deleted");
    Ok(())
}

/// Deletes each user in turn, stopping at the first failure
pub async fn delete_many(
    pool: &PgPool,
    auth: &AuthAdminClient,
    user_ids: &[Uuid],
) -> Result<usize, AppError> {
    if user_ids.is_empty() {
        return Err(AppError::Validation("No user IDs provided".to_string()));
    }

    for &user_id in user_ids {
        delete(pool, auth, user_id).await?;
    }

    Ok(user_ids.len())
}

/// Looks up email and display name for each ID. Users missing from the
/// auth service, or without an email, are left out.
pub async fn fetch_emails(auth: &AuthAdminClient, user_ids: &[Uuid]) -> Result<Vec<UserEmail>, AppError> {
    let mut results = Vec::with_capacity(user_ids.len());

    for &id in user_ids {
        match auth.get_user(id).await {
            Ok(user) => {
                let full_name = user.full_name();
                match user.email.filter(|email| !email.trim().is_empty()) {
                    Some(email) => results.push(UserEmail { id, email, full_name }),
                    None => tracing::debug!(user_id = %id, "User has no email, skipping"),
                }
            }
            Err(AuthAdminError::UserNotFound(_)) => {
                tracing::debug!(user_id = %id, "User not found, skipping");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(results)
}

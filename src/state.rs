use axum::extract::FromRef;
use sqlx::PgPool;

use crate::config::Config;
use crate::services::auth_admin::{AuthAdminClient, AuthAdminError};
use crate::services::email::{images::EmailAssets, mailer::Mailer, EmailError, EmailService};

/// Shared handles passed to every handler
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub auth_admin: AuthAdminClient,
    pub email: EmailService,
}

#[derive(thiserror::Error, Debug)]
pub enum StateError {
    #[error(transparent)]
    AuthAdmin(#[from] AuthAdminError),

    #[error(transparent)]
    Email(#[from] EmailError),
}

impl AppState {
    /// Builds the outbound clients from `config`. Nothing connects yet.
    pub fn new(pool: PgPool, config: Config) -> Result<Self, StateError> {
        let auth_admin =
            AuthAdminClient::new(&config.supabase_url, config.supabase_service_role_key.clone())?;
        let mailer = Mailer::from_config(&config)?;
        let assets = EmailAssets::new(config.email_assets_dir.clone());

        Ok(Self {
            pool,
            config,
            auth_admin,
            email: EmailService::new(mailer, assets),
        })
    }
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> PgPool {
        state.pool.clone()
    }
}

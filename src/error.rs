use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::{auth_admin::AuthAdminError, email::EmailError};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(&'static str),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Auth admin API error: {0}")]
    AuthAdmin(#[from] AuthAdminError),

    #[error("Email error: {0}")]
    Email(EmailError),

    /// A failed operation, reported to the client with a fixed message.
    #[error("{message}: {source}")]
    Operation {
        message: &'static str,
        #[source]
        source: Box<AppError>,
    },

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Wraps a server-side failure so the client sees `message` while the
    /// cause is still logged. Client errors pass through untouched.
    pub fn context(self, message: &'static str) -> Self {
        match self {
            AppError::Validation(_)
            | AppError::Unauthorized(_)
            | AppError::NotFound(_)
            | AppError::Operation { .. } => self,
            other => AppError::Operation {
                message,
                source: Box::new(other),
            },
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::AuthAdmin(_) | AppError::Email(_) => StatusCode::BAD_GATEWAY,
            AppError::Operation { source, .. } => source.status(),
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = match &self {
            AppError::Validation(msg) | AppError::NotFound(msg) => msg.clone(),
            AppError::Unauthorized(msg) => msg.to_string(),
            AppError::Operation { message, source } => {
                tracing::error!(error = %source, "{}", message);
                message.to_string()
            }
            AppError::Database(e) => {
                tracing::error!(error = %e, "Database error");
                "Database error".to_string()
            }
            AppError::AuthAdmin(e) => {
                tracing::error!(error = %e, "Auth admin API error");
                "Authentication service error".to_string()
            }
            AppError::Email(e) => {
                tracing::error!(error = %e, "Email delivery error");
                "Email delivery failed".to_string()
            }
            AppError::Internal(e) => {
                tracing::error!(error = %e, "Internal server error");
                "Internal server error".to_string()
            }
        };

        let body = Json(json!({
            "success": false,
            "message": message,
        }));

        (status, body).into_response()
    }
}

impl From<EmailError> for AppError {
    fn from(err: EmailError) -> Self {
        // Failures outside the mail path keep their own status
        match err {
            EmailError::Database(e) => AppError::Database(e),
            EmailError::AuthAdmin(e) => AppError::AuthAdmin(e),
            other => AppError::Email(other),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_keeps_client_errors() {
        let err = AppError::Validation("ids parameter is required".to_string())
            .context("Failed to delete invite codes");
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_context_wraps_server_errors() {
        let err = AppError::Database(sqlx::Error::RowNotFound).context("Failed to fetch users");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err
            .to_string()
            .starts_with("Failed to fetch users: Database error"));
    }

    #[test]
    fn test_email_database_failure_is_a_server_error() {
        let err = AppError::from(EmailError::Database(sqlx::Error::PoolTimedOut))
            .context("Failed to send bulk emails");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err
            .to_string()
            .starts_with("Failed to send bulk emails: Database error"));
    }

    #[test]
    fn test_context_keeps_upstream_status() {
        let err = AppError::Email(EmailError::NotConfigured("SMTP host is not configured"))
            .context("Failed to send email");
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }
}

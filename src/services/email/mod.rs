// Email delivery - templates, inline assets and SMTP

pub mod images;
pub mod mailer;
pub mod parser;
pub mod templates;

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{user_profile::UserProfile, InviteCode};
use crate::services::auth_admin::{AuthAdminClient, AuthAdminError};
use images::{referenced_images, EmailAssets, EmailImage};
use mailer::{Mailer, OutgoingEmail};
use templates::{ImageSource, InviteKind};

#[derive(thiserror::Error, Debug)]
pub enum EmailError {
    #[error("Email is not configured: {0}")]
    NotConfigured(&'static str),

    #[error("Invalid email address: {0}")]
    InvalidAddress(#[from] lettre::address::AddressError),

    #[error("Invalid content type: {0}")]
    InvalidContentType(String),

    #[error("Failed to build message: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    #[error("No users found to send emails to")]
    NoRecipients,

    #[error("User {0} not found or has no email")]
    MissingRecipient(Uuid),

    #[error(transparent)]
    AuthAdmin(#[from] AuthAdminError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Custom content supplied by the dashboard
#[derive(Debug, Clone, Deserialize)]
pub struct EmailContent {
    pub subject: String,
    pub text_content: String,
    pub html_content: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BulkEmailReport {
    pub total: usize,
    pub success_count: usize,
    pub error_count: usize,
    pub errors: Option<Vec<String>>,
}

/// Shared handles needed to send any email
#[derive(Clone)]
pub struct EmailService {
    pub mailer: Mailer,
    pub assets: EmailAssets,
}

impl EmailService {
    pub fn new(mailer: Mailer, assets: EmailAssets) -> Self {
        Self { mailer, assets }
    }

    /// Wraps caller-supplied HTML, attaching every image it references by `cid:`
    async fn compose(&self, subject: &str, text: Option<&str>, html: String) -> OutgoingEmail {
        let inline_images = self.assets.inline_images(&referenced_images(&html)).await;
        OutgoingEmail {
            subject: subject.to_string(),
            text: text.filter(|t| !t.trim().is_empty()).map(str::to_string),
            html,
            inline_images,
        }
    }

    /// Sends one message to a single address (the dashboard's test email)
    #[tracing::instrument(skip(self, text_content, html_content))]
    pub async fn send_individual(
        &self,
        to: &str,
        subject: &str,
        text_content: &str,
        html_content: &str,
    ) -> Result<(), EmailError> {
        let email = self
            .compose(subject, Some(text_content), html_content.to_string())
            .await;
        self.mailer.send(to, &email).await
    }

    /// Sends the same message to every selected profile. Individual delivery
    /// failures are collected in the report rather than aborting the run.
    #[tracing::instrument(skip(self, pool, auth, custom))]
    pub async fn send_bulk(
        &self,
        pool: &PgPool,
        auth: &AuthAdminClient,
        custom: Option<EmailContent>,
        selected_user_ids: Option<&[Uuid]>,
    ) -> Result<BulkEmailReport, EmailError> {
        let selected = selected_user_ids.filter(|ids| !ids.is_empty());
        let contacts = UserProfile::contacts(pool, selected).await?;
        if contacts.is_empty() {
            return Err(EmailError::NoRecipients);
        }

        let directory = auth.email_directory().await?;

        let email = match custom {
            Some(content) => {
                self.compose(
                    &content.subject,
                    Some(&content.text_content),
                    content.html_content,
                )
                .await
            }
            None => {
                let html = templates::render_downtime(
                    templates::DOWNTIME_TEXT,
                    ImageSource::Cid,
                    ImageSource::Cid,
                )?;
                self.compose(templates::DOWNTIME_SUBJECT, Some(templates::DOWNTIME_TEXT), html)
                    .await
            }
        };

        let mut report = BulkEmailReport {
            total: contacts.len(),
            ..Default::default()
        };
        let mut errors = Vec::new();

        for contact in &contacts {
            let Some(address) = directory.get(&contact.user_id) else {
                report.error_count += 1;
                errors.push(format!("User {}: No email found", contact.user_id));
                continue;
            };

            match self.mailer.send(address, &email).await {
                Ok(()) => report.success_count += 1,
                Err(e) => {
                    report.error_count += 1;
                    errors.push(format!("{}: {}", address, e));
                }
            }
        }

        if !errors.is_empty() {
            report.errors = Some(errors);
        }

        tracing::info!(
            total = report.total,
            sent = report.success_count,
            failed = report.error_count,
            "Bulk email finished"
        );

        Ok(report)
    }

    /// Notifies a user that credits were added, then records it on the profile
    #[tracing::instrument(skip(self, pool, auth))]
    pub async fn send_credits_email(
        &self,
        pool: &PgPool,
        auth: &AuthAdminClient,
        user_id: Uuid,
    ) -> Result<(), EmailError> {
        let user = auth.get_user(user_id).await?;
        let address = user
            .email
            .filter(|e| !e.trim().is_empty())
            .ok_or(EmailError::MissingRecipient(user_id))?;

        let html = templates::render_credits(ImageSource::Cid, ImageSource::Cid)?;
        let email = OutgoingEmail {
            subject: templates::CREDITS_SUBJECT.to_string(),
            text: Some(templates::CREDITS_TEXT.to_string()),
            html,
            inline_images: self
                .assets
                .inline_images(&[EmailImage::Logo, EmailImage::CreditsBody])
                .await,
        };

        self.mailer.send(&address, &email).await?;

        let patch = serde_json::json!({
            "credits_email_sent_at": chrono::Utc::now().to_rfc3339(),
            "credits_assigned": true,
        });
        UserProfile::merge_metadata(pool, user_id, &patch).await?;

        Ok(())
    }

    /// Sends an invitation or reminder for `code` and records the delivery
    #[tracing::instrument(skip(self, pool, code), fields(code_id = %code.id))]
    pub async fn send_invite(
        &self,
        pool: &PgPool,
        kind: InviteKind,
        code: &InviteCode,
        recipient_email: &str,
        recipient_name: &str,
    ) -> Result<(), EmailError> {
        let rendered = templates::render_invite(
            kind,
            recipient_name,
            &code.code,
            code.expires_at,
            ImageSource::Cid,
        )?;

        let email = OutgoingEmail {
            subject: rendered.subject,
            text: Some(rendered.text),
            html: rendered.html,
            inline_images: self.assets.inline_images(&[EmailImage::Logo]).await,
        };

        self.mailer.send(recipient_email, &email).await?;

        match kind {
            InviteKind::Invitation => {
                InviteCode::record_email_sent(pool, code.id, recipient_email.trim()).await?
            }
            InviteKind::Reminder => InviteCode::mark_reminder_sent(pool, code.id).await?,
        }

        Ok(())
    }
}

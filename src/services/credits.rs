use std::collections::HashMap;

use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::credit::{CreditBalance, CreditPurchase, PURCHASE_STATUSES};
use crate::services::auth_admin::AuthAdminClient;
use crate::services::email::EmailService;

/// Credit rows that carry their owner's auth email
trait OwnerEmail {
    fn owner_id(&self) -> Uuid;
    fn set_owner_email(&mut self, email: Option<String>);
}

impl OwnerEmail for CreditBalance {
    fn owner_id(&self) -> Uuid {
        self.user_id
    }

    fn set_owner_email(&mut self, email: Option<String>) {
        self.user_email = email;
    }
}

impl OwnerEmail for CreditPurchase {
    fn owner_id(&self) -> Uuid {
        self.user_id
    }

    fn set_owner_email(&mut self, email: Option<String>) {
        self.user_email = email;
    }
}

fn attach_emails<T: OwnerEmail>(rows: &mut [T], directory: &HashMap<Uuid, String>) {
    for row in rows {
        let email = directory.get(&row.owner_id()).cloned();
        row.set_owner_email(email);
    }
}

async fn with_emails<T: OwnerEmail>(
    auth: &AuthAdminClient,
    mut rows: Vec<T>,
) -> Result<Vec<T>, AppError> {
    if rows.is_empty() {
        return Ok(rows);
    }

    let directory = auth.email_directory().await?;
    attach_emails(&mut rows, &directory);
    Ok(rows)
}

/// Balances with the owner's auth email attached
pub async fn balances(
    pool: &PgPool,
    auth: &AuthAdminClient,
    user_id: Option<Uuid>,
) -> Result<Vec<CreditBalance>, AppError> {
    let balances = CreditBalance::list(pool, user_id).await?;
    with_emails(auth, balances).await
}

pub fn validate_amount(credits_to_add: f64) -> Result<(), AppError> {
    if !credits_to_add.is_finite() || credits_to_add <= 0.0 {
        return Err(AppError::Validation(
            "credits_to_add must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

/// Adds credits in a single transaction, then notifies the user. The email
/// is best-effort: a delivery failure is logged and the assignment stands.
#[tracing::instrument(skip(pool, auth, email, notes))]
pub async fn assign(
    pool: &PgPool,
    auth: &AuthAdminClient,
    email: &EmailService,
    user_id: Uuid,
    credits_to_add: f64,
    notes: Option<&str>,
) -> Result<CreditBalance, AppError> {
    validate_amount(credits_to_add)?;

    let notes = notes.map(str::trim).filter(|n| !n.is_empty());

    let mut tx = pool.begin().await?;
    let balance = CreditBalance::add_credits(&mut tx, user_id, credits_to_add, notes).await?;
    tx.commit().await?;

    tracing::info!(
        %user_id,
        amount = credits_to_add,
        balance = balance.balance_dollars,
        "Credits assigned"
    );

    if let Err(e) = email.send_credits_email(pool, auth, user_id).await {
        tracing::warn!(%user_id, error = %e, "Credits assigned but notification email failed");
    }

    Ok(balance)
}

pub fn validate_status(status: Option<&str>) -> Result<Option<&str>, AppError> {
    match status.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(status) if PURCHASE_STATUSES.contains(&status) => Ok(Some(status)),
        Some(_) => Err(AppError::Validation(format!(
            "Invalid status. Must be one of: {}",
            PURCHASE_STATUSES.join(", ")
        ))),
    }
}

/// Purchases with the buyer's auth email attached
pub async fn purchases(
    pool: &PgPool,
    auth: &AuthAdminClient,
    status: Option<&str>,
) -> Result<Vec<CreditPurchase>, AppError> {
    let status = validate_status(status)?;
    let purchases = CreditPurchase::list(pool, status).await?;
    with_emails(auth, purchases).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_must_be_positive() {
        assert!(validate_amount(10.0).is_ok());
        assert!(validate_amount(0.0).is_err());
        assert!(validate_amount(-5.0).is_err());
        assert!(validate_amount(f64::NAN).is_err());
    }

    fn purchase(user_id: Uuid) -> CreditPurchase {
        CreditPurchase {
            id: Uuid::new_v4(),
            user_id,
            amount_dollars: 25.0,
            stripe_payment_intent_id: None,
            stripe_charge_id: None,
            status: "completed".to_string(),
            description: None,
            metadata: serde_json::json!({}),
            created_at: chrono::Utc::now(),
            completed_at: None,
            expires_at: None,
            user_name: Some("Ada Lovelace".to_string()),
            user_email: None,
        }
    }

    #[test]
    fn test_purchases_get_buyer_email() {
        let known = Uuid::new_v4();
        let unknown = Uuid::new_v4();
        let directory = HashMap::from([(known, "ada@example.com".to_string())]);

        let mut purchases = vec![purchase(known), purchase(unknown)];
        attach_emails(&mut purchases, &directory);

        assert_eq!(purchases[0].user_email.as_deref(), Some("ada@example.com"));
        assert_eq!(purchases[1].user_email, None);
    }

    #[test]
    fn test_status_filter() {
        assert_eq!(validate_status(None).unwrap(), None);
        assert_eq!(validate_status(Some("")).unwrap(), None);
        assert_eq!(validate_status(Some("refunded")).unwrap(), Some("refunded"));
        assert!(validate_status(Some("cancelled")).is_err());
    }
}

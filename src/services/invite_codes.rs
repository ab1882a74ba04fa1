use chrono::{Duration, Utc};
use ring::rand::{SecureRandom, SystemRandom};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::InviteCode;

pub const CODE_PREFIX: &str = "NA";
pub const CODE_SUFFIX_LEN: usize = 5;
const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const MAX_INSERT_ATTEMPTS: usize = 3;

/// Ids the dashboard assigns to rows that only exist client-side
pub const PREVIEW_ID_PREFIX: &str = "preview-";

#[derive(Debug, Clone, Copy)]
pub struct GenerateOptions {
    pub max_uses: i32,
    pub expires_in_days: i64,
    pub count: usize,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            max_uses: 1,
            expires_in_days: 30,
            count: 1,
        }
    }
}

impl GenerateOptions {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.max_uses < 1 {
            return Err(AppError::Validation(
                "max_uses must be at least 1".to_string(),
            ));
        }
        if !(1..=365).contains(&self.expires_in_days) {
            return Err(AppError::Validation(
                "expires_in_days must be between 1 and 365".to_string(),
            ));
        }
        if !(1..=100).contains(&self.count) {
            return Err(AppError::Validation(
                "count must be between 1 and 100".to_string(),
            ));
        }
        Ok(())
    }
}

const CODE_LEN: usize = CODE_PREFIX.len() + CODE_SUFFIX_LEN;

/// Appends alphabet characters drawn from `bytes` until `code` is complete.
/// Bytes that would bias the alphabet are skipped.
fn extend_code(code: &mut String, bytes: &[u8]) {
    let limit = 256 - (256 % CODE_ALPHABET.len());
    for &byte in bytes {
        if code.len() == CODE_LEN {
            break;
        }
        if (byte as usize) < limit {
            code.push(CODE_ALPHABET[byte as usize % CODE_ALPHABET.len()] as char);
        }
    }
}

/// Generates a code such as `NA7K2QZ`
pub fn generate_code(rng: &dyn SecureRandom) -> Result<String, AppError> {
    let mut code = String::with_capacity(CODE_LEN);
    code.push_str(CODE_PREFIX);

    let mut buf = [0u8; 16];
    while code.len() < CODE_LEN {
        rng.fill(&mut buf)
            .map_err(|_| anyhow::anyhow!("Failed to generate random bytes"))?;
        extend_code(&mut code, &buf);
    }

    Ok(code)
}

fn generate_batch(rng: &dyn SecureRandom, count: usize) -> Result<Vec<String>, AppError> {
    let mut codes: Vec<String> = Vec::with_capacity(count);
    while codes.len() < count {
        let code = generate_code(rng)?;
        if !codes.contains(&code) {
            codes.push(code);
        }
    }
    Ok(codes)
}

/// Creates `options.count` codes in one insert. A collision with an existing
/// code rolls the whole batch and draws fresh codes, up to three attempts.
#[tracing::instrument(skip(pool))]
pub async fn generate(pool: &PgPool, options: GenerateOptions) -> Result<Vec<InviteCode>, AppError> {
    options.validate()?;

    let rng = SystemRandom::new();
    let expires_at = Utc::now() + Duration::days(options.expires_in_days);

    let mut attempt = 1;
    loop {
        let codes = generate_batch(&rng, options.count)?;

        match InviteCode::insert_batch(pool, &codes, options.max_uses, expires_at).await {
            Ok(created) => {
                tracing::info!(count = created.len(), "Invite codes generated");
                return Ok(created);
            }
            Err(sqlx::Error::Database(e))
                if e.is_unique_violation() && attempt < MAX_INSERT_ATTEMPTS =>
            {
                tracing::warn!(attempt, "Invite code collision, retrying");
                attempt += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Drops blanks and preview rows from a list of ids
pub fn filter_preview_ids<'a, I>(ids: I) -> Vec<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    ids.into_iter()
        .map(str::trim)
        .filter(|id| !id.is_empty() && !id.starts_with(PREVIEW_ID_PREFIX))
        .collect()
}

pub fn parse_ids(ids: &[&str]) -> Result<Vec<Uuid>, AppError> {
    ids.iter()
        .map(|id| {
            Uuid::parse_str(id)
                .map_err(|_| AppError::Validation(format!("Invalid invite code id: {}", id)))
        })
        .collect()
}

/// Deletes the listed codes in one statement. Preview ids are ignored, and
/// a list holding nothing else deletes nothing.
#[tracing::instrument(skip(pool, ids))]
pub async fn delete_many<'a, I>(pool: &PgPool, ids: I) -> Result<u64, AppError>
where
    I: IntoIterator<Item = &'a str>,
{
    let kept = filter_preview_ids(ids);
    if kept.is_empty() {
        tracing::debug!("Only preview ids supplied, nothing to delete");
        return Ok(0);
    }

    let ids = parse_ids(&kept)?;
    let deleted = InviteCode::delete_many(pool, &ids).await?;
    tracing::info!(requested = ids.len(), deleted, "Invite codes deleted");
    Ok(deleted)
}

/// Splits a comma-separated `ids` query value, dropping blank entries
pub fn split_id_list(raw_ids: &str) -> Result<Vec<&str>, AppError> {
    let ids: Vec<&str> = raw_ids
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .collect();

    if ids.is_empty() {
        return Err(AppError::Validation("ids parameter is required".to_string()));
    }
    Ok(ids)
}

/// Same as [`delete_many`] for a comma-separated `ids` query value
pub async fn delete_by_id_list(pool: &PgPool, raw_ids: &str) -> Result<u64, AppError> {
    let ids = split_id_list(raw_ids)?;
    delete_many(pool, ids).await
}

use sqlx::{PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::tokens::repo_types::UserAccount;

pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<UserAccount>> {
    let account = sqlx::query_as::<_, UserAccount>(
        r#"
        SELECT id, email, password_hash, totp_secret, referral_code, referred_users,
               token_status, token_expiry, referral_applied, created_at
        FROM users
        WHERE email = $1
        "#,
    )
    .bind(email)
    .fetch_optional(db)
    .await?;
    Ok(account)
}

pub async fn find_by_email_tx(
    tx: &mut Transaction<'_, Postgres>,
    email: &str,
) -> anyhow::Result<Option<UserAccount>> {
    let account = sqlx::query_as::<_, UserAccount>(
        r#"
        SELECT id, email, password_hash, totp_secret, referral_code, referred_users,
               token_status, token_expiry, referral_applied, created_at
        FROM users
        WHERE email = $1
        "#,
    )
    .bind(email)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(account)
}

/// Locks the referrer row so concurrent extensions serialize instead of
/// overwriting each other.
pub async fn find_by_referral_code_for_update(
    tx: &mut Transaction<'_, Postgres>,
    referral_code: &str,
) -> anyhow::Result<Option<UserAccount>> {
    let account = sqlx::query_as::<_, UserAccount>(
        r#"
        SELECT id, email, password_hash, totp_secret, referral_code, referred_users,
               token_status, token_expiry, referral_applied, created_at
        FROM users
        WHERE referral_code = $1
        FOR UPDATE
        "#,
    )
    .bind(referral_code)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(account)
}

/// Creates the account in its initial state: token inactive, no expiry.
pub async fn insert_account_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    email: &str,
    password_hash: &str,
    totp_secret: &str,
    referral_code: &str,
    referral_applied: bool,
) -> anyhow::Result<UserAccount> {
    let account = sqlx::query_as::<_, UserAccount>(
        r#"
        INSERT INTO users (id, email, password_hash, totp_secret, referral_code, referral_applied)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, email, password_hash, totp_secret, referral_code, referred_users,
                  token_status, token_expiry, referral_applied, created_at
        "#,
    )
    .bind(id)
    .bind(email)
    .bind(password_hash)
    .bind(totp_secret)
    .bind(referral_code)
    .bind(referral_applied)
    .fetch_one(&mut **tx)
    .await?;
    Ok(account)
}

/// Claims the referee's one-shot referral flag. Returns false when the flag
/// was already consumed (or the account does not exist).
pub async fn claim_referral_flag_tx(
    tx: &mut Transaction<'_, Postgres>,
    email: &str,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE users
        SET referral_applied = TRUE
        WHERE email = $1 AND referral_applied = FALSE
        "#,
    )
    .bind(email)
    .execute(&mut **tx)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Writes the referrer's extension: activates the token, moves the expiry,
/// and records the referee with set semantics (a duplicate referee never
/// grows the array).
pub async fn apply_extension_tx(
    tx: &mut Transaction<'_, Postgres>,
    referrer_email: &str,
    referee_email: &str,
    new_expiry: OffsetDateTime,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        UPDATE users
        SET token_status = 'active',
            token_expiry = $2,
            referred_users = CASE WHEN $3 = ANY(referred_users)
                                  THEN referred_users
                                  ELSE array_append(referred_users, $3)
                             END
        WHERE email = $1
        "#,
    )
    .bind(referrer_email)
    .bind(new_expiry)
    .bind(referee_email)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Guarded activation in one conditional statement: only fires when the
/// token is inactive or its grant has lapsed. Returns the updated row, or
/// `None` when the guard rejected the write (still-valid grant, or no such
/// account — the caller distinguishes the two).
pub async fn activate_if_lapsed(
    db: &PgPool,
    email: &str,
    now: OffsetDateTime,
    new_expiry: OffsetDateTime,
) -> anyhow::Result<Option<UserAccount>> {
    let account = sqlx::query_as::<_, UserAccount>(
        r#"
        UPDATE users
        SET token_status = 'active', token_expiry = $2
        WHERE email = $1
          AND (token_status = 'inactive' OR token_expiry IS NULL OR token_expiry <= $3)
        RETURNING id, email, password_hash, totp_secret, referral_code, referred_users,
                  token_status, token_expiry, referral_applied, created_at
        "#,
    )
    .bind(email)
    .bind(new_expiry)
    .bind(now)
    .fetch_optional(db)
    .await?;
    Ok(account)
}

/// Lazy-expiry write-back. Conditional on the expiry still being stale so a
/// concurrent activation is never clobbered.
pub async fn clear_if_expired(
    db: &PgPool,
    email: &str,
    now: OffsetDateTime,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE users
        SET token_status = 'inactive', token_expiry = NULL
        WHERE email = $1 AND token_expiry IS NOT NULL AND token_expiry <= $2
        "#,
    )
    .bind(email)
    .bind(now)
    .execute(db)
    .await?;
    Ok(result.rows_affected() > 0)
}

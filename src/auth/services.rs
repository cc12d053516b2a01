use argon2::{password_hash::SaltString, Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use regex::Regex;
use time::{Duration, OffsetDateTime};
use tracing::{error, info};
use uuid::Uuid;

use crate::auth::repo_types::PendingRegistration;
use crate::auth::totp;
use crate::error::ApiError;
use crate::state::AppState;
use crate::tokens;
use crate::tokens::repo_types::UserAccount;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

/// Four random bytes, hex uppercase. The code space is large enough that a
/// collision is negligible; the unique index backstops it anyway.
pub(crate) fn generate_referral_code() -> String {
    let bytes: [u8; 4] = rand::random();
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}

/// First half of enrollment: stash a pending registration and hand the
/// caller the TOTP secret plus its QR encoding.
pub async fn register_init(
    state: &AppState,
    email: &str,
    password: &str,
    referral_code_input: Option<&str>,
) -> Result<totp::Enrollment, ApiError> {
    if tokens::repo::find_by_email(&state.db, email).await?.is_some() {
        return Err(ApiError::Conflict("account already exists"));
    }

    let enrollment = totp::begin_enrollment(&state.config.totp_issuer, email)?;
    let password_hash = hash_password(password)?;
    PendingRegistration::upsert(
        &state.db,
        email,
        &password_hash,
        &enrollment.secret,
        referral_code_input,
    )
    .await?;

    info!(%email, "pending registration stored");
    Ok(enrollment)
}

/// Second half of enrollment: verify the first TOTP code, then commit the
/// account in one transaction — referral extension for the referrer (when
/// the stashed code resolves), account insert, pending-row delete.
pub async fn register_verify(
    state: &AppState,
    email: &str,
    code: &str,
) -> Result<UserAccount, ApiError> {
    let pending = PendingRegistration::find_by_email(&state.db, email)
        .await?
        .ok_or(ApiError::NotFound("pending registration"))?;

    if !totp::check(&pending.totp_secret, &state.config.totp_issuer, email, code)? {
        return Err(ApiError::InvalidCode);
    }

    let referral_code = generate_referral_code();
    let mut tx = state.db.begin().await?;

    let mut referral_applied = false;
    if let Some(input) = pending.referral_code_input.as_deref() {
        // An unresolvable code at signup is ignored; the signup still succeeds.
        if let Some(referrer) =
            tokens::repo::find_by_referral_code_for_update(&mut tx, input).await?
        {
            let now = OffsetDateTime::now_utc();
            let extension = Duration::minutes(state.config.token.referral_extension_minutes);
            let new_expiry = tokens::services::next_expiry(now, referrer.token_expiry, extension);
            tokens::repo::apply_extension_tx(&mut tx, &referrer.email, email, new_expiry).await?;
            referral_applied = true;
            info!(referrer = %referrer.email, referee = %email, "signup referral applied");
        }
    }

    let account = tokens::repo::insert_account_tx(
        &mut tx,
        Uuid::new_v4(),
        email,
        &pending.password_hash,
        &pending.totp_secret,
        &referral_code,
        referral_applied,
    )
    .await?;
    PendingRegistration::delete_tx(&mut tx, email).await?;
    tx.commit().await?;

    info!(
        account_id = %account.id,
        %email,
        referral_code = %account.referral_code,
        "account registered"
    );
    Ok(account)
}

/// Password-only login. Unknown email and wrong password are deliberately
/// indistinguishable to the caller.
pub async fn login(state: &AppState, email: &str, password: &str) -> Result<UserAccount, ApiError> {
    let account = tokens::repo::find_by_email(&state.db, email)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    if !verify_password(password, &account.password_hash)? {
        return Err(ApiError::InvalidCredentials);
    }
    Ok(account)
}

/// Password + TOTP login.
pub async fn login_verify(
    state: &AppState,
    email: &str,
    password: &str,
    code: &str,
) -> Result<UserAccount, ApiError> {
    let account = tokens::repo::find_by_email(&state.db, email)
        .await?
        .ok_or(ApiError::NotFound("account"))?;

    if !verify_password(password, &account.password_hash)? {
        return Err(ApiError::InvalidCredentials);
    }
    if !totp::check(&account.totp_secret, &state.config.totp_issuer, email, code)? {
        return Err(ApiError::InvalidCode);
    }
    Ok(account)
}

#[cfg(test)]
mod password_tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let password = "Secur3P@ssw0rd!";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(verify_password(password, &hash).expect("verify should succeed"));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let password = "correct-horse-battery-staple";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(!verify_password("wrong-password", &hash).expect("verify should not error"));
    }

    #[test]
    fn verify_errors_on_malformed_hash() {
        let err = verify_password("anything", "not-a-valid-hash").unwrap_err();
        assert!(!err.to_string().is_empty());
    }
}

#[cfg(test)]
mod referral_code_tests {
    use super::*;

    #[test]
    fn codes_are_eight_uppercase_hex_chars() {
        let code = generate_referral_code();
        assert_eq!(code.len(), 8);
        assert!(code.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }

    #[test]
    fn codes_vary_between_calls() {
        // 2^32 values; two equal draws in a row would be astonishing
        assert_ne!(generate_referral_code(), generate_referral_code());
    }
}

#[cfg(test)]
mod email_tests {
    use super::*;

    #[test]
    fn accepts_plain_addresses() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("first.last@sub.domain.org"));
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("missing@tld"));
        assert!(!is_valid_email("two@@example.com"));
        assert!(!is_valid_email("spaces in@example.com"));
    }
}

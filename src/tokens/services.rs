use time::{Duration, OffsetDateTime};
use tracing::info;

use crate::error::ApiError;
use crate::state::AppState;
use crate::tokens::repo;
use crate::tokens::repo_types::{TokenStatus, UserAccount};

/// Logical token state at `now`. A persisted `active` row past its expiry
/// counts as inactive; persisting that correction is the caller's job.
pub fn evaluate(
    status: TokenStatus,
    token_expiry: Option<OffsetDateTime>,
    now: OffsetDateTime,
) -> TokenStatus {
    match (status, token_expiry) {
        (TokenStatus::Active, Some(expiry)) if now < expiry => TokenStatus::Active,
        _ => TokenStatus::Inactive,
    }
}

/// Referral extensions stack: a still-valid grant is extended from its
/// current expiry, a lapsed or missing grant starts a fresh window from now.
pub fn next_expiry(
    now: OffsetDateTime,
    current_expiry: Option<OffsetDateTime>,
    extension: Duration,
) -> OffsetDateTime {
    let base = current_expiry.unwrap_or(now).max(now);
    base + extension
}

/// Corrected view of an account's token state, after lazy expiry.
pub struct StatusView {
    pub account: UserAccount,
    pub token_status: TokenStatus,
    pub token_expiry: Option<OffsetDateTime>,
}

pub async fn get_status(state: &AppState, email: &str) -> Result<StatusView, ApiError> {
    let account = repo::find_by_email(&state.db, email)
        .await?
        .ok_or(ApiError::NotFound("account"))?;

    let now = OffsetDateTime::now_utc();
    let status = evaluate(account.token_status, account.token_expiry, now);

    let mut expiry = account.token_expiry;
    if status == TokenStatus::Inactive && account.token_expiry.is_some() {
        // This reader observed a stale row; write the correction back.
        if repo::clear_if_expired(&state.db, email, now).await? {
            info!(%email, "expired token lazily deactivated");
        }
        expiry = None;
    }

    Ok(StatusView {
        account,
        token_status: status,
        token_expiry: expiry,
    })
}

pub enum Activation {
    Fresh(UserAccount),
    AlreadyActive(UserAccount),
}

/// Guarded activation: grants `activation_grant_minutes` from now, but never
/// shortens or resets a grant that is still running.
pub async fn activate(state: &AppState, email: &str) -> Result<Activation, ApiError> {
    let grant = Duration::minutes(state.config.token.activation_grant_minutes);
    let now = OffsetDateTime::now_utc();

    match repo::activate_if_lapsed(&state.db, email, now, now + grant).await? {
        Some(account) => {
            info!(%email, expiry = ?account.token_expiry, "token activated");
            Ok(Activation::Fresh(account))
        }
        None => {
            // Guard rejected the write: either the grant is still valid or
            // the account does not exist.
            let account = repo::find_by_email(&state.db, email)
                .await?
                .ok_or(ApiError::NotFound("account"))?;
            Ok(Activation::AlreadyActive(account))
        }
    }
}

/// Post-hoc referral: the referee consumes their one-shot referral against
/// an existing referrer code. Both sides mutate inside one transaction; the
/// referrer row is locked so concurrent extensions stack instead of racing.
pub async fn apply_referral(
    state: &AppState,
    referral_code: &str,
    referee_email: &str,
) -> Result<(), ApiError> {
    let extension = Duration::minutes(state.config.token.referral_extension_minutes);
    let mut tx = state.db.begin().await?;

    if !repo::claim_referral_flag_tx(&mut tx, referee_email).await? {
        return Err(match repo::find_by_email_tx(&mut tx, referee_email).await? {
            Some(_) => ApiError::Conflict("referral already applied"),
            None => ApiError::NotFound("account"),
        });
    }

    let referrer = repo::find_by_referral_code_for_update(&mut tx, referral_code)
        .await?
        .ok_or(ApiError::NotFound("referral code"))?;

    let now = OffsetDateTime::now_utc();
    let new_expiry = next_expiry(now, referrer.token_expiry, extension);
    repo::apply_extension_tx(&mut tx, &referrer.email, referee_email, new_expiry).await?;

    tx.commit().await?;
    info!(
        referrer = %referrer.email,
        referee = %referee_email,
        prior_referrals = referrer.referred_users.len(),
        expiry = %new_expiry,
        "referral applied, referrer token extended"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    const T: OffsetDateTime = datetime!(2025-06-01 12:00 UTC);

    #[test]
    fn evaluate_active_with_future_expiry() {
        let status = evaluate(TokenStatus::Active, Some(T + Duration::minutes(5)), T);
        assert_eq!(status, TokenStatus::Active);
    }

    #[test]
    fn evaluate_treats_lapsed_active_as_inactive() {
        let status = evaluate(TokenStatus::Active, Some(T - Duration::seconds(1)), T);
        assert_eq!(status, TokenStatus::Inactive);
    }

    #[test]
    fn evaluate_active_without_expiry_is_inactive() {
        assert_eq!(evaluate(TokenStatus::Active, None, T), TokenStatus::Inactive);
    }

    #[test]
    fn evaluate_inactive_ignores_expiry() {
        let status = evaluate(TokenStatus::Inactive, Some(T + Duration::hours(1)), T);
        assert_eq!(status, TokenStatus::Inactive);
    }

    #[test]
    fn extension_without_prior_expiry_starts_from_now() {
        let ext = Duration::minutes(10);
        assert_eq!(next_expiry(T, None, ext), T + ext);
    }

    #[test]
    fn extension_after_lapse_starts_from_now() {
        let ext = Duration::minutes(10);
        let lapsed = Some(T - Duration::hours(2));
        assert_eq!(next_expiry(T, lapsed, ext), T + ext);
    }

    #[test]
    fn extension_of_running_grant_stacks_on_remaining_time() {
        let ext = Duration::minutes(10);
        let running = Some(T + Duration::minutes(3));
        assert_eq!(next_expiry(T, running, ext), T + Duration::minutes(13));
    }

    #[test]
    fn back_to_back_extensions_accumulate() {
        let ext = Duration::minutes(10);
        let first = next_expiry(T, None, ext);
        let second = next_expiry(T, Some(first), ext);
        // stacked, not reset to now + ext
        assert_eq!(second, T + Duration::minutes(20));
    }
}

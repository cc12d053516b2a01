use axum::{extract::State, routing::post, Json, Router};
use rand::Rng;
use time::{Duration, OffsetDateTime};
use tracing::{info, instrument, warn};

use crate::auth::services::{hash_password, is_valid_email};
use crate::error::ApiError;
use crate::otp::dto::{OtpSendRequest, OtpSendResponse, OtpVerifyRequest, OtpVerifyResponse};
use crate::otp::repo::EmailOtp;
use crate::state::AppState;

pub fn otp_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/otp/send", post(send_otp))
        .route("/auth/otp/verify", post(verify_otp))
}

fn generate_otp() -> String {
    rand::thread_rng().gen_range(100_000..=999_999).to_string()
}

#[instrument(skip(state, payload))]
pub async fn send_otp(
    State(state): State<AppState>,
    Json(mut payload): Json<OtpSendRequest>,
) -> Result<Json<OtpSendResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::Validation("Invalid email".into()));
    }
    if payload.password.len() < 8 {
        warn!("password too short");
        return Err(ApiError::Validation("Password too short".into()));
    }

    let referral_code = payload
        .referral_code
        .as_deref()
        .map(|c| c.trim().to_uppercase())
        .filter(|c| !c.is_empty());

    // Never keep the plaintext around, even in a five-minute record.
    let password_hash = hash_password(&payload.password)?;
    let otp = generate_otp();
    let ttl = Duration::minutes(state.config.token.otp_ttl_minutes);
    let expires_at = OffsetDateTime::now_utc() + ttl;

    EmailOtp::upsert(
        &state.db,
        &payload.email,
        &password_hash,
        referral_code.as_deref(),
        &otp,
        expires_at,
    )
    .await?;

    let body = format!(
        "<div style=\"font-family:Arial,sans-serif;line-height:1.4\">\
         <h3>Your verification code</h3>\
         <p><strong>{otp}</strong></p>\
         <p>This code expires in {} minutes.</p>\
         </div>",
        state.config.token.otp_ttl_minutes
    );
    state
        .mailer
        .send(&payload.email, "Your verification OTP", &body)
        .await
        .map_err(ApiError::Delivery)?;

    info!(email = %payload.email, "verification code sent");
    Ok(Json(OtpSendResponse {
        message: "OTP sent to email".into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(mut payload): Json<OtpVerifyRequest>,
) -> Result<Json<OtpVerifyResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    if payload.email.is_empty() || payload.otp.trim().is_empty() {
        return Err(ApiError::Validation("Email and OTP required".into()));
    }

    let record = EmailOtp::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or(ApiError::NotFound("verification code"))?;

    if record.otp != payload.otp.trim() {
        warn!(email = %payload.email, "otp mismatch");
        return Err(ApiError::InvalidCode);
    }

    if record.expires_at <= OffsetDateTime::now_utc() {
        // clean up the stale record on detection
        EmailOtp::delete(&state.db, &payload.email).await?;
        return Err(ApiError::CodeExpired);
    }

    // single use: a verified code is gone
    EmailOtp::delete(&state.db, &payload.email).await?;

    info!(email = %payload.email, "email otp verified");
    Ok(Json(OtpVerifyResponse { verified: true }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn otp_is_six_digits() {
        for _ in 0..50 {
            let otp = generate_otp();
            assert_eq!(otp.len(), 6);
            let value: u32 = otp.parse().expect("numeric");
            assert!((100_000..=999_999).contains(&value));
        }
    }
}

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use tracing::{instrument, warn};

use crate::error::ApiError;
use crate::state::AppState;
use crate::tokens::dto::{
    ActivateRequest, ActivateResponse, ApplyReferralRequest, ApplyReferralResponse,
    StatusQuery, StatusResponse,
};
use crate::tokens::services::{self, Activation};

pub fn token_routes() -> Router<AppState> {
    Router::new()
        .route("/token/status", get(get_status))
        .route("/token/activate", post(activate))
        .route("/token/referral", post(apply_referral))
}

#[instrument(skip(state))]
pub async fn get_status(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<StatusResponse>, ApiError> {
    let email = query.email.trim().to_lowercase();
    if email.is_empty() {
        return Err(ApiError::Validation("Email required".into()));
    }

    let view = services::get_status(&state, &email).await?;
    Ok(Json(StatusResponse {
        email: view.account.email,
        referral_code: view.account.referral_code,
        token_status: view.token_status,
        token_expiry: view.token_expiry,
        referral_applied: view.account.referral_applied,
    }))
}

#[instrument(skip(state, payload))]
pub async fn activate(
    State(state): State<AppState>,
    Json(payload): Json<ActivateRequest>,
) -> Result<Json<ActivateResponse>, ApiError> {
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() {
        return Err(ApiError::Validation("Email required".into()));
    }

    match services::activate(&state, &email).await? {
        Activation::Fresh(account) => Ok(Json(ActivateResponse {
            message: "Token activated".into(),
            token_status: account.token_status,
            token_expiry: account.token_expiry,
        })),
        Activation::AlreadyActive(account) => Ok(Json(ActivateResponse {
            message: "Token already active. No update done.".into(),
            token_status: account.token_status,
            token_expiry: account.token_expiry,
        })),
    }
}

#[instrument(skip(state, payload))]
pub async fn apply_referral(
    State(state): State<AppState>,
    Json(payload): Json<ApplyReferralRequest>,
) -> Result<Json<ApplyReferralResponse>, ApiError> {
    let email = payload.email.trim().to_lowercase();
    let referral_code = payload.referral_code.trim().to_uppercase();
    if email.is_empty() || referral_code.is_empty() {
        warn!("apply_referral with missing fields");
        return Err(ApiError::Validation("Email and referral code required".into()));
    }

    services::apply_referral(&state, &referral_code, &email).await?;
    Ok(Json(ApplyReferralResponse {
        message: "Referral applied, referrer token extended".into(),
    }))
}

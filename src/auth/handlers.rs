use axum::{
    extract::State,
    routing::post,
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::auth::dto::{
    LoginRequest, LoginResponse, LoginVerifyRequest, RegisterInitRequest, RegisterInitResponse,
    RegisterVerifyRequest, RegisterVerifyResponse,
};
use crate::auth::services::{self, is_valid_email};
use crate::error::ApiError;
use crate::state::AppState;

pub fn register_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register/init", post(register_init))
        .route("/auth/register/verify", post(register_verify))
}

pub fn login_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/login/verify", post(login_verify))
}

#[instrument(skip(state, payload))]
pub async fn register_init(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterInitRequest>,
) -> Result<Json<RegisterInitResponse>, ApiError> {
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

    let enrollment = services::register_init(
        &state,
        &payload.email,
        &payload.password,
        referral_code.as_deref(),
    )
    .await?;

    Ok(Json(RegisterInitResponse {
        message: "Scan the QR with an authenticator app and enter the code to verify.".into(),
        manual_key: enrollment.secret,
        otpauth_url: enrollment.otpauth_url,
        qr: enrollment.qr_png_base64,
    }))
}

#[instrument(skip(state, payload))]
pub async fn register_verify(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterVerifyRequest>,
) -> Result<Json<RegisterVerifyResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    if payload.email.is_empty() || payload.code.trim().is_empty() {
        return Err(ApiError::Validation("Email and code required".into()));
    }

    let account = services::register_verify(&state, &payload.email, payload.code.trim()).await?;
    info!(email = %account.email, "registration verified");
    Ok(Json(RegisterVerifyResponse {
        email: account.email,
        referral_code: account.referral_code,
    }))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::Validation("Invalid email".into()));
    }

    let account = services::login(&state, &payload.email, &payload.password).await?;
    info!(email = %account.email, "user logged in");
    Ok(Json(LoginResponse {
        email: account.email,
        referral_code: account.referral_code,
    }))
}

#[instrument(skip(state, payload))]
pub async fn login_verify(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginVerifyRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    if payload.email.is_empty() || payload.password.is_empty() || payload.code.trim().is_empty() {
        return Err(ApiError::Validation("Missing email, password or code".into()));
    }

    let account =
        services::login_verify(&state, &payload.email, &payload.password, payload.code.trim())
            .await?;
    info!(email = %account.email, "two-factor login verified");
    Ok(Json(LoginResponse {
        email: account.email,
        referral_code: account.referral_code,
    }))
}

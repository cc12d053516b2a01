use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::tokens::repo_types::TokenStatus;

/// Corrected token view returned by the status endpoint.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub email: String,
    pub referral_code: String,
    pub token_status: TokenStatus,
    #[serde(with = "time::serde::rfc3339::option")]
    pub token_expiry: Option<OffsetDateTime>,
    pub referral_applied: bool,
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ActivateRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct ActivateResponse {
    pub message: String,
    pub token_status: TokenStatus,
    #[serde(with = "time::serde::rfc3339::option")]
    pub token_expiry: Option<OffsetDateTime>,
}

/// Request body for consuming a referral code against an existing account.
#[derive(Debug, Deserialize)]
pub struct ApplyReferralRequest {
    pub email: String,
    pub referral_code: String,
}

#[derive(Debug, Serialize)]
pub struct ApplyReferralResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn status_serializes_enum_lowercase_and_expiry_rfc3339() {
        let response = StatusResponse {
            email: "a@example.com".into(),
            referral_code: "AB12CD34".into(),
            token_status: TokenStatus::Active,
            token_expiry: Some(datetime!(2025-06-01 12:10 UTC)),
            referral_applied: false,
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains(r#""token_status":"active""#));
        assert!(json.contains("2025-06-01T12:10:00Z"));
    }

    #[test]
    fn status_serializes_missing_expiry_as_null() {
        let response = StatusResponse {
            email: "a@example.com".into(),
            referral_code: "AB12CD34".into(),
            token_status: TokenStatus::Inactive,
            token_expiry: None,
            referral_applied: true,
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains(r#""token_expiry":null"#));
        assert!(json.contains(r#""token_status":"inactive""#));
    }
}

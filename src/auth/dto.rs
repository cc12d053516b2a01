use serde::{Deserialize, Serialize};

/// Request body for the first half of signup.
#[derive(Debug, Deserialize)]
pub struct RegisterInitRequest {
    pub email: String,
    pub password: String,
    pub referral_code: Option<String>,
}

/// The raw TOTP secret and its scannable encodings. Shown exactly once.
#[derive(Debug, Serialize)]
pub struct RegisterInitResponse {
    pub message: String,
    pub manual_key: String,
    pub otpauth_url: String,
    pub qr: String,
}

/// Request body for the second half of signup.
#[derive(Debug, Deserialize)]
pub struct RegisterVerifyRequest {
    pub email: String,
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterVerifyResponse {
    pub email: String,
    pub referral_code: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginVerifyRequest {
    pub email: String,
    pub password: String,
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub email: String,
    pub referral_code: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_response_carries_secret_and_qr() {
        let response = RegisterInitResponse {
            message: "scan the QR".into(),
            manual_key: "JBSWY3DPEHPK3PXP".into(),
            otpauth_url: "otpauth://totp/x".into(),
            qr: "data:image/png;base64,AAAA".into(),
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("manual_key"));
        assert!(json.contains("JBSWY3DPEHPK3PXP"));
        assert!(json.contains("data:image/png;base64"));
    }

    #[test]
    fn referral_code_is_optional_on_init() {
        let parsed: RegisterInitRequest =
            serde_json::from_str(r#"{"email":"a@b.co","password":"hunter2hunter2"}"#).unwrap();
        assert!(parsed.referral_code.is_none());
    }
}

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct OtpSendRequest {
    pub email: String,
    pub password: String,
    pub referral_code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OtpSendResponse {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct OtpVerifyRequest {
    pub email: String,
    pub otp: String,
}

#[derive(Debug, Serialize)]
pub struct OtpVerifyResponse {
    pub verified: bool,
}

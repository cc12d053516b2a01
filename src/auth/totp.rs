use anyhow::anyhow;
use totp_rs::{Algorithm, Secret, TOTP};

const DIGITS: usize = 6;
const STEP_SECONDS: u64 = 30;
// Accept the previous and next time step to absorb clock drift between the
// authenticator app and the server.
const SKEW_STEPS: u8 = 1;

/// Everything the client needs to finish 2FA setup. The raw secret is only
/// ever exposed here, at enrollment time.
pub struct Enrollment {
    pub secret: String,
    pub otpauth_url: String,
    pub qr_png_base64: String,
}

fn build(secret_base32: &str, issuer: &str, account: &str) -> anyhow::Result<TOTP> {
    let secret = Secret::Encoded(secret_base32.to_string())
        .to_bytes()
        .map_err(|e| anyhow!("bad totp secret: {e:?}"))?;
    TOTP::new(
        Algorithm::SHA1,
        DIGITS,
        SKEW_STEPS,
        STEP_SECONDS,
        secret,
        Some(issuer.to_string()),
        account.to_string(),
    )
    .map_err(|e| anyhow!("totp init: {e}"))
}

/// Generates a fresh shared secret plus its otpauth URL and QR code
/// (PNG as a base64 data URL, ready for an `<img src=...>`).
pub fn begin_enrollment(issuer: &str, account: &str) -> anyhow::Result<Enrollment> {
    let raw = Secret::generate_secret()
        .to_bytes()
        .map_err(|e| anyhow!("secret gen: {e:?}"))?;
    let totp = TOTP::new(
        Algorithm::SHA1,
        DIGITS,
        SKEW_STEPS,
        STEP_SECONDS,
        raw,
        Some(issuer.to_string()),
        account.to_string(),
    )
    .map_err(|e| anyhow!("totp init: {e}"))?;

    let qr = totp.get_qr_base64().map_err(|e| anyhow!("qr gen: {e}"))?;
    Ok(Enrollment {
        secret: totp.get_secret_base32(),
        otpauth_url: totp.get_url(),
        qr_png_base64: format!("data:image/png;base64,{qr}"),
    })
}

/// Checks a submitted code against the stored secret, tolerating one time
/// step of skew either side.
pub fn check(secret_base32: &str, issuer: &str, account: &str, code: &str) -> anyhow::Result<bool> {
    let totp = build(secret_base32, issuer, account)?;
    Ok(totp.check_current(code).unwrap_or(false))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ISSUER: &str = "refergate-test";
    const ACCOUNT: &str = "user@example.com";

    #[test]
    fn enrollment_produces_labelled_url_and_qr() {
        let enrollment = begin_enrollment(ISSUER, ACCOUNT).expect("enrollment");
        assert!(!enrollment.secret.is_empty());
        assert!(enrollment.otpauth_url.starts_with("otpauth://totp/"));
        assert!(enrollment.otpauth_url.contains(ISSUER));
        assert!(enrollment
            .qr_png_base64
            .starts_with("data:image/png;base64,"));
    }

    #[test]
    fn current_code_verifies() {
        let enrollment = begin_enrollment(ISSUER, ACCOUNT).expect("enrollment");
        let totp = build(&enrollment.secret, ISSUER, ACCOUNT).expect("rebuild");
        let code = totp.generate_current().expect("current code");
        assert!(check(&enrollment.secret, ISSUER, ACCOUNT, &code).expect("check"));
    }

    #[test]
    fn wrong_shaped_code_is_rejected() {
        let enrollment = begin_enrollment(ISSUER, ACCOUNT).expect("enrollment");
        // eight digits can never match a six-digit code
        assert!(!check(&enrollment.secret, ISSUER, ACCOUNT, "00000000").expect("check"));
    }

    #[test]
    fn garbage_secret_errors() {
        assert!(check("not base32 at all!!!", ISSUER, ACCOUNT, "123456").is_err());
    }
}

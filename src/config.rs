use serde::Deserialize;

/// Durations governing the token lifecycle. All of them are deliberately
/// configuration rather than constants baked into call sites.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    pub activation_grant_minutes: i64,
    pub referral_extension_minutes: i64,
    pub otp_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub from_address: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub totp_issuer: String,
    pub token: TokenConfig,
    pub mail: MailConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let totp_issuer = std::env::var("TOTP_ISSUER").unwrap_or_else(|_| "refergate".into());
        let token = TokenConfig {
            activation_grant_minutes: env_i64("ACTIVATION_GRANT_MINUTES", 10),
            referral_extension_minutes: env_i64("REFERRAL_EXTENSION_MINUTES", 10),
            otp_ttl_minutes: env_i64("OTP_TTL_MINUTES", 5),
        };
        let mail = MailConfig {
            api_url: std::env::var("MAIL_API_URL").ok(),
            api_key: std::env::var("MAIL_API_KEY").ok(),
            from_address: std::env::var("MAIL_FROM")
                .unwrap_or_else(|_| "no-reply@refergate.dev".into()),
        };
        Ok(Self {
            database_url,
            totp_issuer,
            token,
            mail,
        })
    }
}

fn env_i64(key: &str, default: i64) -> i64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(default)
}

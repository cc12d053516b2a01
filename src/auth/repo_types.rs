use sqlx::FromRow;
use time::OffsetDateTime;

/// Transient half of the two-phase signup, keyed by email. Overwritten on
/// every register-init and deleted the moment the account is created.
#[derive(Debug, Clone, FromRow)]
pub struct PendingRegistration {
    pub email: String,
    pub password_hash: String,
    pub totp_secret: String,
    pub referral_code_input: Option<String>,
    pub created_at: OffsetDateTime,
}

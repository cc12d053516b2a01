use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Access-token state as persisted. An `Active` row whose expiry has passed
/// must be read as inactive; readers correct it lazily.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "token_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TokenStatus {
    Inactive,
    Active,
}

/// Account record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct UserAccount {
    pub id: Uuid,
    pub email: String,                        // unique, immutable
    pub password_hash: String,                // argon2 PHC string
    pub totp_secret: String,                  // base32, set once at enrollment
    pub referral_code: String,                // unique, handed out to invitees
    pub referred_users: Vec<String>,          // set semantics, no duplicates
    pub token_status: TokenStatus,
    pub token_expiry: Option<OffsetDateTime>, // only meaningful while active
    pub referral_applied: bool,               // flips false -> true at most once
    pub created_at: OffsetDateTime,
}

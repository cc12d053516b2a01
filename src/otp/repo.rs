use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;

/// One pending email passcode per address; resending overwrites.
#[derive(Debug, Clone, FromRow)]
pub struct EmailOtp {
    pub email: String,
    pub password_hash: String,
    pub referral_code_input: Option<String>,
    pub otp: String,
    pub expires_at: OffsetDateTime,
}

impl EmailOtp {
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<EmailOtp>> {
        let record = sqlx::query_as::<_, EmailOtp>(
            r#"
            SELECT email, password_hash, referral_code_input, otp, expires_at
            FROM email_otps
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(record)
    }

    pub async fn upsert(
        db: &PgPool,
        email: &str,
        password_hash: &str,
        referral_code_input: Option<&str>,
        otp: &str,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO email_otps (email, password_hash, referral_code_input, otp, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (email) DO UPDATE
            SET password_hash = EXCLUDED.password_hash,
                referral_code_input = EXCLUDED.referral_code_input,
                otp = EXCLUDED.otp,
                expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .bind(referral_code_input)
        .bind(otp)
        .bind(expires_at)
        .execute(db)
        .await?;
        Ok(())
    }

    pub async fn delete(db: &PgPool, email: &str) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM email_otps WHERE email = $1")
            .bind(email)
            .execute(db)
            .await?;
        Ok(())
    }
}

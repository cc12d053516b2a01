use sqlx::{PgPool, Postgres, Transaction};

use crate::auth::repo_types::PendingRegistration;

impl PendingRegistration {
    pub async fn find_by_email(
        db: &PgPool,
        email: &str,
    ) -> anyhow::Result<Option<PendingRegistration>> {
        let pending = sqlx::query_as::<_, PendingRegistration>(
            r#"
            SELECT email, password_hash, totp_secret, referral_code_input, created_at
            FROM pending_registrations
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(pending)
    }

    /// Upsert keyed by email: a repeated init simply replaces the earlier
    /// attempt, so enrollment stays retryable until it is verified.
    pub async fn upsert(
        db: &PgPool,
        email: &str,
        password_hash: &str,
        totp_secret: &str,
        referral_code_input: Option<&str>,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO pending_registrations (email, password_hash, totp_secret, referral_code_input)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (email) DO UPDATE
            SET password_hash = EXCLUDED.password_hash,
                totp_secret = EXCLUDED.totp_secret,
                referral_code_input = EXCLUDED.referral_code_input,
                created_at = now()
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .bind(totp_secret)
        .bind(referral_code_input)
        .execute(db)
        .await?;
        Ok(())
    }

    pub async fn delete_tx(tx: &mut Transaction<'_, Postgres>, email: &str) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM pending_registrations WHERE email = $1")
            .bind(email)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}

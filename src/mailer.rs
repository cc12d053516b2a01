use anyhow::Context;
use async_trait::async_trait;
use serde_json::json;
use tracing::info;

/// Email delivery seam. The OTP path only needs fire-and-forget sends;
/// a failed send surfaces as a delivery error to the caller.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> anyhow::Result<()>;
}

/// Delivers through a transactional-mail HTTP API (Brevo-style JSON endpoint).
pub struct ApiMailer {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl ApiMailer {
    pub fn new(api_url: &str, api_key: &str, from: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: api_url.to_string(),
            api_key: api_key.to_string(),
            from: from.to_string(),
        }
    }
}

#[async_trait]
impl Mailer for ApiMailer {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> anyhow::Result<()> {
        let body = json!({
            "sender": { "email": self.from },
            "to": [{ "email": to }],
            "subject": subject,
            "htmlContent": html_body,
        });
        self.http
            .post(&self.api_url)
            .header("api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .context("mail api request")?
            .error_for_status()
            .context("mail api response")?;
        Ok(())
    }
}

/// Local dev fallback: logs the send and reports success.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, _html_body: &str) -> anyhow::Result<()> {
        info!(%to, %subject, "mail delivery skipped (log-only mailer)");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn log_mailer_always_succeeds() {
        let mailer = LogMailer;
        mailer
            .send("user@example.com", "subject", "<p>body</p>")
            .await
            .expect("log mailer never fails");
    }
}

//! SendGrid email channel.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::config::EmailConfig;

use super::Notifier;

const SENDGRID_SEND_URL: &str = "https://api.sendgrid.com/v3/mail/send";
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

pub struct SendgridNotifier {
    client: reqwest::Client,
    config: EmailConfig,
    url: String,
}

impl SendgridNotifier {
    pub fn new(config: EmailConfig) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        Self::with_url(config, SENDGRID_SEND_URL.to_string())
    }

    /// Point the client at a different endpoint (tests, proxies).
    pub fn with_url(
        config: EmailConfig,
        url: String,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let client = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(Self {
            client,
            config,
            url,
        })
    }
}

#[async_trait]
impl Notifier for SendgridNotifier {
    fn channel(&self) -> &'static str {
        "email"
    }

    async fn send(
        &self,
        subject: &str,
        body: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let payload = json!({
            "personalizations": [{ "to": [{ "email": self.config.recipient }] }],
            "from": { "email": self.config.sender },
            "subject": subject,
            "content": [{ "type": "text/plain", "value": body }],
        });
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await?;
        // SendGrid answers 202 Accepted on success.
        if !response.status().is_success() {
            return Err(format!("SendGrid returned {}", response.status()).into());
        }
        Ok(())
    }
}

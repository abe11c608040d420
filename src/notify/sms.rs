//! Twilio SMS channel.

use std::time::Duration;

use async_trait::async_trait;

use crate::config::SmsConfig;

use super::Notifier;

const TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01";
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

pub struct TwilioNotifier {
    client: reqwest::Client,
    config: SmsConfig,
    base_url: String,
}

impl TwilioNotifier {
    pub fn new(config: SmsConfig) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        Self::with_base_url(config, TWILIO_API_BASE.to_string())
    }

    /// Point the client at a different endpoint (tests, proxies).
    pub fn with_base_url(
        config: SmsConfig,
        base_url: String,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let client = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(Self {
            client,
            config,
            base_url,
        })
    }

    fn message_url(&self) -> String {
        format!(
            "{}/Accounts/{}/Messages.json",
            self.base_url, self.config.account_sid
        )
    }
}

#[async_trait]
impl Notifier for TwilioNotifier {
    fn channel(&self) -> &'static str {
        "sms"
    }

    async fn send(
        &self,
        _subject: &str,
        body: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        // SMS has no subject line; the body carries everything.
        let params = [
            ("To", self.config.to_number.as_str()),
            ("From", self.config.from_number.as_str()),
            ("Body", body),
        ];
        let response = self
            .client
            .post(self.message_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&params)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(format!("Twilio returned {}", response.status()).into());
        }
        Ok(())
    }
}

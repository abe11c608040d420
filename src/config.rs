//! Process configuration.
//!
//! Everything comes from the environment (the binaries load a `.env` file
//! first). The config is built once at startup and handed into the
//! coordinator and dispatcher; core logic never reads the environment
//! itself. Only the market-data credential is fatal when missing, every
//! other setting has a default or degrades a single feature.

use std::env;
use std::time::Duration;

use crate::market::detector::{DEFAULT_PRICE_Z_THRESHOLD, DEFAULT_VOLUME_Z_THRESHOLD};

pub const DEFAULT_INSTRUMENTS: &[&str] =
    &["BINANCE:BTCUSDT", "BINANCE:ETHUSDT", "BINANCE:SOLUSDT"];
pub const DEFAULT_WINDOW_SIZE: usize = 60;
pub const DEFAULT_RECONNECT_BACKOFF_SECS: f64 = 5.0;
pub const DEFAULT_DB_PATH: &str = "anomalies.db";

#[derive(Debug)]
pub enum ConfigError {
    MissingVariable(String),
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingVariable(var) => write!(f, "Missing environment variable: {}", var),
            ConfigError::InvalidValue(msg) => write!(f, "Invalid configuration value: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Email channel credentials. All three variables must be present
/// together; a partial set disables the channel with a warning.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub api_key: String,
    pub sender: String,
    pub recipient: String,
}

/// SMS channel credentials, same all-or-nothing rule as email.
#[derive(Debug, Clone)]
pub struct SmsConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
    pub to_number: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Market-data credential. The service refuses to start without it.
    pub finnhub_api_key: String,
    /// News credential. Absent means every anomaly carries the
    /// no-news placeholder instead of a headline.
    pub gnews_api_key: Option<String>,
    pub instruments: Vec<String>,
    pub window_size: usize,
    pub price_z_threshold: f64,
    pub volume_z_threshold: f64,
    pub reconnect_backoff_secs: f64,
    pub db_path: String,
    pub news_timeout_secs: u64,
    pub notify_timeout_secs: u64,
    /// Capacity of the coordinator -> dispatcher anomaly channel.
    pub event_channel_capacity: usize,
    /// Concurrent enrichment tasks the dispatcher allows.
    pub max_in_flight: usize,
    pub email: Option<EmailConfig>,
    pub sms: Option<SmsConfig>,
}

impl Default for Config {
    /// Built-in defaults with no credentials. `from_env` is the production
    /// path; this exists for the simulator and for tests.
    fn default() -> Self {
        Self {
            finnhub_api_key: String::new(),
            gnews_api_key: None,
            instruments: DEFAULT_INSTRUMENTS.iter().map(|s| s.to_string()).collect(),
            window_size: DEFAULT_WINDOW_SIZE,
            price_z_threshold: DEFAULT_PRICE_Z_THRESHOLD,
            volume_z_threshold: DEFAULT_VOLUME_Z_THRESHOLD,
            reconnect_backoff_secs: DEFAULT_RECONNECT_BACKOFF_SECS,
            db_path: DEFAULT_DB_PATH.to_string(),
            news_timeout_secs: 5,
            notify_timeout_secs: 10,
            event_channel_capacity: 256,
            max_in_flight: 8,
            email: None,
            sms: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let finnhub_api_key = env::var("FINNHUB_API_KEY")
            .map_err(|_| ConfigError::MissingVariable("FINNHUB_API_KEY".to_string()))?;

        let gnews_api_key = env::var("GNEWS_API_KEY").ok();

        // Comma-separated instrument list; defaults to the major pairs.
        let instruments: Vec<String> = match env::var("INSTRUMENTS") {
            Ok(raw) => raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            Err(_) => DEFAULT_INSTRUMENTS.iter().map(|s| s.to_string()).collect(),
        };

        let window_size = env::var("WINDOW_SIZE")
            .unwrap_or_else(|_| DEFAULT_WINDOW_SIZE.to_string())
            .parse::<usize>()
            .unwrap_or(DEFAULT_WINDOW_SIZE);

        let price_z_threshold = env::var("PRICE_Z_THRESHOLD")
            .unwrap_or_else(|_| DEFAULT_PRICE_Z_THRESHOLD.to_string())
            .parse::<f64>()
            .unwrap_or(DEFAULT_PRICE_Z_THRESHOLD);

        let volume_z_threshold = env::var("VOLUME_Z_THRESHOLD")
            .unwrap_or_else(|_| DEFAULT_VOLUME_Z_THRESHOLD.to_string())
            .parse::<f64>()
            .unwrap_or(DEFAULT_VOLUME_Z_THRESHOLD);

        let reconnect_backoff_secs = env::var("RECONNECT_BACKOFF_SECS")
            .unwrap_or_else(|_| DEFAULT_RECONNECT_BACKOFF_SECS.to_string())
            .parse::<f64>()
            .unwrap_or(DEFAULT_RECONNECT_BACKOFF_SECS);

        let db_path = env::var("DB_PATH").unwrap_or_else(|_| DEFAULT_DB_PATH.to_string());

        let news_timeout_secs = env::var("NEWS_TIMEOUT_SECS")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u64>()
            .unwrap_or(5);

        let notify_timeout_secs = env::var("NOTIFY_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u64>()
            .unwrap_or(10);

        let event_channel_capacity = env::var("EVENT_CHANNEL_CAPACITY")
            .unwrap_or_else(|_| "256".to_string())
            .parse::<usize>()
            .unwrap_or(256)
            .max(1);

        let max_in_flight = env::var("MAX_IN_FLIGHT")
            .unwrap_or_else(|_| "8".to_string())
            .parse::<usize>()
            .unwrap_or(8)
            .max(1);

        let email = match (
            env::var("SENDGRID_API_KEY").ok(),
            env::var("SENDER_EMAIL").ok(),
            env::var("RECIPIENT_EMAIL").ok(),
        ) {
            (Some(api_key), Some(sender), Some(recipient)) => Some(EmailConfig {
                api_key,
                sender,
                recipient,
            }),
            (None, None, None) => None,
            _ => {
                log::warn!(
                    "Partial SendGrid configuration (need SENDGRID_API_KEY, SENDER_EMAIL, RECIPIENT_EMAIL), email alerts disabled"
                );
                None
            }
        };

        let sms = match (
            env::var("TWILIO_ACCOUNT_SID").ok(),
            env::var("TWILIO_AUTH_TOKEN").ok(),
            env::var("TWILIO_FROM_NUMBER").ok(),
            env::var("TWILIO_TO_NUMBER").ok(),
        ) {
            (Some(account_sid), Some(auth_token), Some(from_number), Some(to_number)) => {
                Some(SmsConfig {
                    account_sid,
                    auth_token,
                    from_number,
                    to_number,
                })
            }
            (None, None, None, None) => None,
            _ => {
                log::warn!(
                    "Partial Twilio configuration (need TWILIO_ACCOUNT_SID, TWILIO_AUTH_TOKEN, TWILIO_FROM_NUMBER, TWILIO_TO_NUMBER), SMS alerts disabled"
                );
                None
            }
        };

        let config = Self {
            finnhub_api_key,
            gnews_api_key,
            instruments,
            window_size,
            price_z_threshold,
            volume_z_threshold,
            reconnect_backoff_secs,
            db_path,
            news_timeout_secs,
            notify_timeout_secs,
            event_channel_capacity,
            max_in_flight,
            email,
            sms,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.instruments.is_empty() {
            return Err(ConfigError::InvalidValue(
                "INSTRUMENTS must name at least one symbol".to_string(),
            ));
        }

        // One sample gives no deviation to measure against.
        if self.window_size < 2 {
            return Err(ConfigError::InvalidValue(format!(
                "WINDOW_SIZE must be at least 2, got {}",
                self.window_size
            )));
        }

        if !(self.price_z_threshold > 0.0) || !(self.volume_z_threshold > 0.0) {
            return Err(ConfigError::InvalidValue(
                "z-score thresholds must be positive".to_string(),
            ));
        }

        if !self.reconnect_backoff_secs.is_finite() || self.reconnect_backoff_secs < 0.0 {
            return Err(ConfigError::InvalidValue(format!(
                "RECONNECT_BACKOFF_SECS must be a non-negative number, got {}",
                self.reconnect_backoff_secs
            )));
        }

        Ok(())
    }

    pub fn reconnect_backoff(&self) -> Duration {
        Duration::from_secs_f64(self.reconnect_backoff_secs)
    }

    pub fn news_timeout(&self) -> Duration {
        Duration::from_secs(self.news_timeout_secs)
    }

    pub fn notify_timeout(&self) -> Duration {
        Duration::from_secs(self.notify_timeout_secs)
    }
}

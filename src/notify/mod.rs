//! Outbound alert channels.
//!
//! Channels are constructed at startup only when their credentials are
//! fully configured; an absent channel is logged once and never consulted
//! again. The dispatcher fans out to all of them and isolates failures,
//! so implementations just report errors honestly.

pub mod email;
pub mod sms;

pub use email::SendgridNotifier;
pub use sms::TwilioNotifier;

use async_trait::async_trait;

/// One outbound alert channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Short channel name for log lines ("email", "sms").
    fn channel(&self) -> &'static str;

    async fn send(
        &self,
        subject: &str,
        body: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

//! Notification channels

use crate::error::NotifyError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

/// Telegram Bot API base URL
pub const TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// Trait for notification channel implementations
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one rendered message to one recipient
    async fn send(&self, recipient_id: i64, text: &str) -> Result<(), NotifyError>;

    /// Channel name for logs
    fn name(&self) -> &'static str;
}

/// Writes alerts to the log instead of delivering them
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, recipient_id: i64, text: &str) -> Result<(), NotifyError> {
        tracing::info!(recipient_id, message = %text, "Alert");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
    disable_web_page_preview: bool,
}

/// Telegram Bot API `sendMessage` channel
pub struct TelegramNotifier {
    client: Client,
    endpoint: String,
}

impl TelegramNotifier {
    /// Create a notifier for a bot token; `api_url` overrides the public API
    pub fn new(bot_token: &str, api_url: Option<&str>) -> Result<Self, NotifyError> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        let base = api_url.unwrap_or(TELEGRAM_API_URL).trim_end_matches('/');

        Ok(Self {
            client,
            endpoint: format!("{}/bot{}/sendMessage", base, bot_token),
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, recipient_id: i64, text: &str) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&SendMessage {
                chat_id: recipient_id,
                text,
                disable_web_page_preview: true,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                recipient: recipient_id,
                status,
                body,
            });
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "telegram"
    }
}

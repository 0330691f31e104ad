use super::{NotificationChannel, OutboundMessage};
use crate::config::TelegramConfig;
use crate::error::{MonitorError, Result};
use async_trait::async_trait;
use log::info;
use reqwest::Client;
use std::time::Duration;

pub struct TelegramChannel {
    url: String,
    chat_id: String,
    client: Client,
}

impl TelegramChannel {
    pub fn new(config: &TelegramConfig, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url: format!(
                "{}/bot{}/sendMessage",
                config.api_url.trim_end_matches('/'),
                config.bot_token
            ),
            chat_id: config.chat_id.clone(),
            client,
        })
    }
}

#[async_trait]
impl NotificationChannel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn deliver(&self, message: &OutboundMessage) -> Result<()> {
        let params = [("chat_id", self.chat_id.as_str()), ("text", message.body.as_str())];
        // The URL carries the bot token; keep it out of errors and logs.
        let response = self
            .client
            .post(&self.url)
            .form(&params)
            .send()
            .await
            .map_err(|e| MonitorError::from(e.without_url()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(MonitorError::RemoteError {
                service: "telegram".to_string(),
                reason: format!("{}: {}", status, body),
            });
        }

        let preview: String = message.body.chars().take(50).collect();
        info!("Telegram message sent: {}...", preview);
        Ok(())
    }
}

//! Telegram Bot API alert channel.
//!
//! Messages are posted with `sendMessage`, passing the chat id and text as
//! query parameters.

use anyhow::{Context, Result};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use super::AlertChannel;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

pub struct TelegramChannel {
    client: Client,
    base_url: String,
    bot_token: SecretString,
}

impl TelegramChannel {
    pub fn new(bot_token: SecretString) -> Self {
        Self {
            client: Client::new(),
            base_url: TELEGRAM_API_BASE.to_string(),
            bot_token,
        }
    }

    /// Creates a channel with a custom reqwest client.
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Points the channel at another API host (used by tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn send_message_url(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.base_url,
            self.bot_token.expose_secret()
        )
    }
}

#[async_trait::async_trait]
impl AlertChannel for TelegramChannel {
    async fn send(&self, text: &str, destination: &str) -> Result<bool> {
        let response = self
            .client
            .post(self.send_message_url())
            .query(&[("chat_id", destination), ("text", text)])
            .send()
            .await
            // reqwest errors can echo the URL, which carries the token.
            .map_err(|err| err.without_url())
            .context("Telegram sendMessage request failed")?;

        let status = response.status();
        debug!(status = %status, chat_id = %destination, "telegram sendMessage response");
        Ok(status.is_success())
    }

    fn name(&self) -> &str {
        "telegram"
    }
}

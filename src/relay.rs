use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{Credentials, TelegramConfig};
use crate::error::RelayError;

/// Delivers a finished message somewhere. The handler only sees this trait.
#[async_trait]
pub trait Relay: Send + Sync {
    async fn send_text(&self, text: &str) -> Result<(), RelayError>;
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    disable_web_page_preview: bool,
}

#[derive(Debug, Deserialize)]
struct SendMessageResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Posts to the Bot API `sendMessage` method.
pub struct TelegramRelay {
    client: reqwest::Client,
    api_base_url: String,
    credentials: Credentials,
}

impl TelegramRelay {
    pub fn new(config: &TelegramConfig, credentials: Credentials) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    fn send_message_url(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.api_base_url, self.credentials.bot_token
        )
    }
}

#[async_trait]
impl Relay for TelegramRelay {
    async fn send_text(&self, text: &str) -> Result<(), RelayError> {
        let request = SendMessageRequest {
            chat_id: &self.credentials.chat_id,
            text,
            disable_web_page_preview: true,
        };

        debug!(
            "Sending message to Telegram chat {} ({} chars)",
            self.credentials.chat_id,
            text.chars().count()
        );

        // Strip the URL from transport errors, it embeds the bot token.
        let response = self
            .client
            .post(self.send_message_url())
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| e.without_url())
            .context("Failed to send request to Telegram")?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            warn!("Telegram API error ({}): {}", status, body);
            return Err(RelayError::Downstream {
                status: status.as_u16(),
                detail: body,
            });
        }

        // A 2xx with "ok": false still means the message was not delivered.
        if let Ok(parsed) = serde_json::from_str::<SendMessageResponse>(&body) {
            if !parsed.ok {
                warn!("Telegram rejected message: {}", body);
                return Err(RelayError::Downstream {
                    status: status.as_u16(),
                    detail: parsed.description.unwrap_or(body),
                });
            }
        }

        Ok(())
    }
}

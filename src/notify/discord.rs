//! Posts notifications to a Discord channel through the REST API.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::config::NotifyConfig;
use crate::error::NotifyError;
use crate::notify::{Notifier, split_message};

/// Discord rejects message content longer than this.
const MAX_MESSAGE_CHARS: usize = 2000;

/// Sent instead of blank text.
const EMPTY_MESSAGE: &str = "(empty message)";

/// Bot-token authenticated channel poster.
pub struct DiscordNotifier {
    client: Client,
    api_base: String,
    channel_id: String,
    token: SecretString,
}

#[derive(Debug, Serialize)]
struct CreateMessage<'a> {
    content: &'a str,
}

impl DiscordNotifier {
    pub fn new(
        api_base: impl Into<String>,
        channel_id: impl Into<String>,
        token: SecretString,
    ) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            api_base: api_base.into(),
            channel_id: channel_id.into(),
            token,
        }
    }

    /// Build from config, or `None` when no token/channel is configured.
    pub fn from_config(config: &NotifyConfig) -> Option<Self> {
        let token = config.discord_token.clone()?;
        let channel_id = config.channel_id.clone()?;
        Some(Self::new(config.api_base.clone(), channel_id, token))
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/channels/{}/messages",
            self.api_base.trim_end_matches('/'),
            self.channel_id
        )
    }

    async fn post(&self, content: &str) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(self.messages_url())
            .header(
                "Authorization",
                format!("Bot {}", self.token.expose_secret()),
            )
            .json(&CreateMessage { content })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    fn name(&self) -> &str {
        "discord"
    }

    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        // Discord rejects empty content.
        let text = if text.trim().is_empty() {
            EMPTY_MESSAGE
        } else {
            text
        };
        for chunk in split_message(text, MAX_MESSAGE_CHARS) {
            self.post(&chunk).await?;
        }
        tracing::debug!("Posted notification to channel {}", self.channel_id);
        Ok(())
    }
}

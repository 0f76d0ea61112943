//! Webex `ChatPoster`: `POST {base}/messages` with a bot bearer token.
//!
//! Mentions are rendered as `<@personEmail:addr>` tags in front of the
//! markdown body; Webex resolves them to people.

use herald_core::channel::ChatPoster;
use herald_types::config::WebexConfig;
use herald_types::error::PostError;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateMessage<'a> {
    room_id: &'a str,
    text: &'a str,
    markdown: String,
}

/// Posts messages to a Webex room as a bot.
pub struct WebexChatPoster {
    client: reqwest::Client,
    base_url: String,
    access_token: SecretString,
}

impl WebexChatPoster {
    pub fn new(base_url: impl Into<String>, access_token: SecretString) -> Result<Self, PostError> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| PostError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token,
        })
    }

    pub fn from_config(config: &WebexConfig) -> Result<Self, PostError> {
        let token = config
            .access_token
            .as_ref()
            .filter(|t| !t.is_empty())
            .ok_or(PostError::MissingCredential("webex.access_token"))?;
        Self::new(
            config.base_url.clone(),
            SecretString::from(token.expose().to_string()),
        )
    }
}

impl ChatPoster for WebexChatPoster {
    async fn post(&self, message: &str, room: &str, mentions: &[String]) -> Result<(), PostError> {
        let payload = CreateMessage {
            room_id: room,
            text: message,
            markdown: with_mentions(message, mentions),
        };
        debug!(mentions = mentions.len(), "posting chat message");

        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .bearer_auth(self.access_token.expose_secret())
            .json(&payload)
            .send()
            .await
            .map_err(|e| PostError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PostError::Status {
                status: status.as_u16(),
                body,
            });
        }

        info!("chat message posted");
        Ok(())
    }
}

/// Prefix `markdown` with one mention tag per non-empty address.
pub fn with_mentions(markdown: &str, mentions: &[String]) -> String {
    let tags: Vec<String> = mentions
        .iter()
        .map(|m| m.trim())
        .filter(|m| !m.is_empty())
        .map(|m| format!("<@personEmail:{m}>"))
        .collect();
    if tags.is_empty() {
        markdown.to_string()
    } else {
        format!("{}\n\n{markdown}", tags.join(" "))
    }
}

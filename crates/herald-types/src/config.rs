//! Configuration types for Herald.
//!
//! `HeraldConfig` represents `config.toml` plus environment overrides. All
//! fields have defaults so a partial file still parses; required credentials
//! are reported by [`HeraldConfig::validate`] instead of failing the parse.

use serde::{Deserialize, Serialize};

use crate::secret::Redacted;
use crate::workflow::DeliveryTargets;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeraldConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub smtp: SmtpConfig,
    #[serde(default)]
    pub webex: WebexConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
    #[serde(default)]
    pub engine: EngineConfig,
}

/// LLM gateway reached through an OAuth2 client-credentials token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<Redacted>,
    #[serde(default)]
    pub app_key: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Refresh this many seconds before the token's reported expiry.
    #[serde(default = "default_token_safety_margin_secs")]
    pub token_safety_margin_secs: u64,
}

fn default_token_url() -> String {
    "https://id.cisco.com/oauth2/default/v1/token".to_string()
}

fn default_api_url() -> String {
    "https://chat-ai.cisco.com/openai/deployments/gpt-4o-mini/chat/completions".to_string()
}

fn default_temperature() -> f64 {
    0.7
}

fn default_token_safety_margin_secs() -> u64 {
    300
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: None,
            app_key: String::new(),
            token_url: default_token_url(),
            api_url: default_api_url(),
            temperature: default_temperature(),
            max_tokens: None,
            token_safety_margin_secs: default_token_safety_margin_secs(),
        }
    }
}

/// SMTP submission settings (STARTTLS).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    #[serde(default = "default_smtp_host")]
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<Redacted>,
    #[serde(default)]
    pub from: String,
}

fn default_smtp_host() -> String {
    "smtp.gmail.com".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: default_smtp_host(),
            port: default_smtp_port(),
            username: String::new(),
            password: None,
            from: String::new(),
        }
    }
}

/// Webex bot settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebexConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<Redacted>,
    #[serde(default)]
    pub room_id: String,
    #[serde(default)]
    pub mentions: Vec<String>,
    #[serde(default = "default_webex_base_url")]
    pub base_url: String,
}

fn default_webex_base_url() -> String {
    "https://webexapis.com/v1".to_string()
}

impl Default for WebexConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            room_id: String::new(),
            mentions: Vec::new(),
            base_url: default_webex_base_url(),
        }
    }
}

/// Default delivery targets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeliveryConfig {
    #[serde(default)]
    pub email_recipients: Vec<String>,
}

/// Workflow engine tuning.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Deadline applied to every collaborator call. Unset means no deadline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_timeout_secs: Option<u64>,
    /// Delete terminal runs from the store after they are returned.
    #[serde(default)]
    pub evict_terminal: bool,
}

impl HeraldConfig {
    /// Default targets, overridden per field by the caller's choices.
    pub fn targets(
        &self,
        email_recipients: Option<Vec<String>>,
        chat_room: Option<String>,
        chat_mentions: Option<Vec<String>>,
    ) -> DeliveryTargets {
        let room = chat_room.unwrap_or_else(|| self.webex.room_id.clone());
        DeliveryTargets {
            email_recipients: email_recipients
                .unwrap_or_else(|| self.delivery.email_recipients.clone()),
            chat_room: (!room.is_empty()).then_some(room),
            chat_mentions: chat_mentions.unwrap_or_else(|| self.webex.mentions.clone()),
        }
    }

    /// Names of required settings that are missing.
    pub fn validate(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.gateway.client_id.trim().is_empty() {
            missing.push("gateway.client_id");
        }
        if self.gateway.client_secret.as_ref().is_none_or(Redacted::is_empty) {
            missing.push("gateway.client_secret");
        }
        if self.gateway.app_key.trim().is_empty() {
            missing.push("gateway.app_key");
        }
        if self.smtp.username.trim().is_empty() {
            missing.push("smtp.username");
        }
        if self.smtp.password.as_ref().is_none_or(Redacted::is_empty) {
            missing.push("smtp.password");
        }
        if self.smtp.from.trim().is_empty() {
            missing.push("smtp.from");
        }
        if self.delivery.email_recipients.is_empty() {
            missing.push("delivery.email_recipients");
        }
        if self.webex.access_token.as_ref().is_none_or(Redacted::is_empty) {
            missing.push("webex.access_token");
        }
        if self.webex.room_id.trim().is_empty() {
            missing.push("webex.room_id");
        }
        missing
    }
}

/// Split a comma-separated list, trimming entries and dropping empties.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

//! Data shapes exchanged with the channel collaborators (generator, mailer,
//! chat poster).

use serde::{Deserialize, Serialize};

use crate::secret::Redacted;

/// Input to a text generation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub message: String,
    pub sender_name: String,
    /// Addresses the chat message will mention; used to address the draft.
    #[serde(default)]
    pub mentions: Vec<String>,
}

/// Output of a text generation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedContent {
    pub subject: String,
    pub body: String,
    pub chat_message: String,
}

/// Bearer token returned by an OAuth2 client-credentials exchange.
#[derive(Debug, Clone)]
pub struct TokenGrant {
    pub access_token: Redacted,
    /// Lifetime in seconds as reported by the identity provider.
    pub expires_in_secs: u64,
}

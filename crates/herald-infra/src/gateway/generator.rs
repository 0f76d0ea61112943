//! Chat-completions `TextGenerator` behind the OAuth2 gateway.
//!
//! Each generation makes two completions: a formal email (subject and body)
//! and a short markdown chat message addressed to the mentioned people. The
//! bearer token comes from a shared [`TokenCache`] and is sent in the
//! `api-key` header.

use herald_core::auth::{TokenCache, TokenExchange};
use herald_core::channel::TextGenerator;
use herald_types::channel::{GeneratedContent, GenerationRequest};
use herald_observe::attrs;
use herald_types::config::GatewayConfig;
use herald_types::error::{AuthError, GenerationError};
use tracing::field::Empty;
use tracing::{Instrument, Span, debug, info_span, warn};

use super::HTTP_TIMEOUT;
use super::types::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage};

/// Subject used when the completion does not yield one.
pub const FALLBACK_SUBJECT: &str = "Update";

/// Stop sequence expected by the gateway's chat template.
const STOP_SEQUENCE: &str = "<|im_end|>";

const EMAIL_SYSTEM_PROMPT: &str = "\
You are a professional communication assistant. Rewrite informal messages as \
formal, professional emails.

Guidelines:
- Keep the core message and intent
- Use professional language and tone
- Include an appropriate greeting and closing
- Be concise but complete
- Do not add information that is not in the original message

Output format:
SUBJECT: <a concise, professional subject line>
---
<the formal email body>";

const CHAT_SYSTEM_PROMPT: &str = "\
You are a professional communication assistant. Rewrite messages as clear, \
concise posts for a team chat space.

Guidelines:
- Keep it brief and actionable
- Use a friendly but professional tone
- Make it easy to read (bullet points are fine)
- Skip greetings and get straight to the point
- End with action items or next steps if there are any

Reply in markdown.";

/// `TextGenerator` for an OpenAI-style chat-completions gateway.
pub struct GatewayTextGenerator<E: TokenExchange> {
    client: reqwest::Client,
    api_url: String,
    app_key: String,
    temperature: f64,
    max_tokens: Option<u32>,
    tokens: TokenCache<E>,
}

impl<E: TokenExchange> GatewayTextGenerator<E> {
    pub fn new(config: &GatewayConfig, tokens: TokenCache<E>) -> Result<Self, GenerationError> {
        if config.app_key.trim().is_empty() {
            return Err(AuthError::MissingCredential("gateway.app_key").into());
        }
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| GenerationError::Provider {
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            app_key: config.app_key.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            tokens,
        })
    }

    pub fn tokens(&self) -> &TokenCache<E> {
        &self.tokens
    }

    /// One chat completion inside a `gen_ai` span. Returns the trimmed
    /// content of the first choice.
    async fn complete(
        &self,
        completion: &'static str,
        messages: Vec<ChatMessage>,
    ) -> Result<String, GenerationError> {
        let span = info_span!(
            "gen_ai.chat",
            gen_ai.operation.name = attrs::OP_CHAT,
            gen_ai.request.temperature = self.temperature,
            gen_ai.request.max_tokens = Empty,
            gen_ai.response.finish_reasons = Empty,
            herald.completion = completion,
        );
        if let Some(max_tokens) = self.max_tokens {
            span.record(attrs::GEN_AI_REQUEST_MAX_TOKENS, max_tokens);
        }
        self.send_completion(messages).instrument(span).await
    }

    async fn send_completion(&self, messages: Vec<ChatMessage>) -> Result<String, GenerationError> {
        let token = self.tokens.get_token().await?;
        let body = ChatCompletionRequest {
            messages,
            user: serde_json::json!({ "appkey": self.app_key }).to_string(),
            temperature: self.temperature,
            stop: vec![STOP_SEQUENCE.to_string()],
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("api-key", token.expose())
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::Provider {
                message: format!("HTTP request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 => {
                    // The gateway revoked the token before its reported expiry.
                    self.tokens.invalidate();
                    AuthError::Status {
                        status: 401,
                        body: error_body,
                    }
                    .into()
                }
                429 => GenerationError::RateLimited,
                _ => GenerationError::Provider {
                    message: format!("HTTP {status}: {error_body}"),
                },
            });
        }

        let completion: ChatCompletionResponse = response.json().await.map_err(|e| {
            GenerationError::Deserialization(format!("failed to parse response: {e}"))
        })?;

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or(GenerationError::EmptyCompletion)?;
        if let Some(reason) = choice.finish_reason.as_deref() {
            Span::current().record(attrs::GEN_AI_RESPONSE_FINISH_REASONS, reason);
        }
        debug!(finish_reason = ?choice.finish_reason, "completion received");

        choice
            .message
            .content
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or(GenerationError::EmptyCompletion)
    }
}

impl<E: TokenExchange> TextGenerator for GatewayTextGenerator<E> {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GeneratedContent, GenerationError> {
        let email_prompt = format!(
            "Rewrite this message as a formal email:\n\nOriginal message: {}\n\nSign the email as: {}",
            request.message, request.sender_name
        );
        let email = self
            .complete(
                "email",
                vec![
                    ChatMessage::system(EMAIL_SYSTEM_PROMPT),
                    ChatMessage::user(email_prompt),
                ],
            )
            .await
            .inspect_err(|e| warn!(error = %e, "email completion failed"))?;
        let (subject, body) = parse_email(&email);

        let chat_prompt = format!(
            "Rewrite this message as a chat post addressed to {}:\n\nOriginal message: {}\n\nFrom: {}",
            mention_names(&request.mentions),
            request.message,
            request.sender_name
        );
        let chat_message = self
            .complete(
                "chat",
                vec![
                    ChatMessage::system(CHAT_SYSTEM_PROMPT),
                    ChatMessage::user(chat_prompt),
                ],
            )
            .await
            .inspect_err(|e| warn!(error = %e, "chat completion failed"))?;

        Ok(GeneratedContent {
            subject,
            body,
            chat_message,
        })
    }
}

/// Split a `SUBJECT: ...\n---\nbody` completion.
///
/// Without a `---` separator the first line is the subject and the rest is
/// the body; a single-line completion is used as the body as well.
pub fn parse_email(content: &str) -> (String, String) {
    let (subject, body) = match content.split_once("---") {
        Some((head, tail)) => (strip_subject(head), tail.trim().to_string()),
        None => {
            let trimmed = content.trim();
            match trimmed.split_once('\n') {
                Some((first, rest)) => (strip_subject(first), rest.trim().to_string()),
                None => (strip_subject(trimmed), trimmed.to_string()),
            }
        }
    };

    let subject = if subject.is_empty() {
        FALLBACK_SUBJECT.to_string()
    } else {
        subject
    };
    (subject, body)
}

fn strip_subject(line: &str) -> String {
    line.replace("SUBJECT:", "").trim().to_string()
}

/// How the chat prompt addresses the mentioned people: the local part of
/// each address, or "the team".
pub fn mention_names(mentions: &[String]) -> String {
    let names: Vec<&str> = mentions
        .iter()
        .filter_map(|m| m.split('@').next())
        .filter(|n| !n.is_empty())
        .collect();
    if names.is_empty() {
        "the team".to_string()
    } else {
        names.join(", ")
    }
}

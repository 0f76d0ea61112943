//! Collaborator capability traits consumed by the workflow engine.
//!
//! Each trait wraps exactly one external call. The engine treats every call
//! as fallible and never inspects the implementation behind it; concrete
//! adapters (gateway LLM, SMTP, Webex) live in herald-infra.
//!
//! Uses RPITIT (native async fn in traits, Rust 2024 edition).

use herald_types::channel::{GeneratedContent, GenerationRequest};
use herald_types::error::{GenerationError, PostError, SendError};

/// Produces the email subject/body and the chat message for a run.
pub trait TextGenerator: Send + Sync {
    fn generate(
        &self,
        request: &GenerationRequest,
    ) -> impl std::future::Future<Output = Result<GeneratedContent, GenerationError>> + Send;
}

/// Sends one email to every recipient.
pub trait Mailer: Send + Sync {
    fn send(
        &self,
        subject: &str,
        body: &str,
        recipients: &[String],
    ) -> impl std::future::Future<Output = Result<(), SendError>> + Send;
}

/// Posts one message to a chat room, mentioning the given people.
pub trait ChatPoster: Send + Sync {
    fn post(
        &self,
        message: &str,
        room: &str,
        mentions: &[String],
    ) -> impl std::future::Future<Output = Result<(), PostError>> + Send;
}

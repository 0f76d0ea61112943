use std::time::Duration;

use thiserror::Error;

use crate::workflow::WorkflowStatus;

/// Control-flow misuse and persistence failures raised by the workflow engine.
///
/// Collaborator failures (generation, delivery, authentication, timeouts) are
/// never surfaced through this type; they are recorded on the state instead.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("thread '{0}' already exists")]
    DuplicateThread(String),

    #[error("thread '{0}' not found")]
    UnknownThread(String),

    #[error("cannot {operation} thread '{thread_id}' in status '{status}'")]
    InvalidTransition {
        thread_id: String,
        status: WorkflowStatus,
        operation: &'static str,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("workflow store error: {0}")]
    Store(#[from] RepositoryError),
}

/// Errors from store operations (used by trait definitions in herald-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("entity not found")]
    NotFound,
}

/// Failure of an OAuth2 token exchange.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("token request failed: {0}")]
    Transport(String),

    #[error("token endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed token response: {0}")]
    MalformedResponse(String),

    #[error("missing credential: {0}")]
    MissingCredential(&'static str),
}

/// Failure of the text generator.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("authentication failed: {0}")]
    Authentication(#[from] AuthError),

    #[error("provider error: {message}")]
    Provider { message: String },

    #[error("rate limited")]
    RateLimited,

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("empty completion")]
    EmptyCompletion,
}

/// Failure of the mailer.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("SMTP authentication failed: {0}")]
    Authentication(String),

    #[error("SMTP error: {0}")]
    Transport(String),

    #[error("failed to build message: {0}")]
    Message(String),
}

/// Failure of the chat poster.
#[derive(Debug, Error)]
pub enum PostError {
    #[error("chat API error: HTTP {status} - {body}")]
    Status { status: u16, body: String },

    #[error("failed to post message: {0}")]
    Transport(String),

    #[error("missing credential: {0}")]
    MissingCredential(&'static str),
}

/// A collaborator call exceeded the caller-supplied deadline.
#[derive(Debug, Clone, Error)]
#[error("{operation} timed out after {after:?}")]
pub struct TimeoutError {
    pub operation: &'static str,
    pub after: Duration,
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("failed to parse {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error("failed to write {path}: {reason}")]
    Write { path: String, reason: String },

    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

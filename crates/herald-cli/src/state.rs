//! Application state wiring the engine to its concrete collaborators.
//!
//! The engine is generic over store and collaborator traits; AppState pins
//! it to the infra implementations. A collaborator that cannot be built from
//! the current configuration is replaced by [`Configured::Missing`], so
//! `show`/`pending` and chat-only runs work without SMTP credentials.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use herald_core::auth::TokenCache;
use herald_core::channel::{ChatPoster, Mailer, TextGenerator};
use herald_core::workflow::{EngineOptions, RetentionPolicy, WorkflowEngine};
use herald_infra::gateway::{GatewayTextGenerator, GatewayTokenExchange};
use herald_infra::smtp::SmtpMailer;
use herald_infra::sqlite::{DatabasePool, SqliteWorkflowStore};
use herald_infra::webex::WebexChatPoster;
use herald_types::channel::{GeneratedContent, GenerationRequest};
use herald_types::config::HeraldConfig;
use herald_types::error::{GenerationError, PostError, SendError};
use tracing::debug;

pub type ConcreteGenerator = Configured<GatewayTextGenerator<GatewayTokenExchange>>;

pub type ConcreteEngine = WorkflowEngine<
    SqliteWorkflowStore,
    ConcreteGenerator,
    Configured<SmtpMailer>,
    Configured<WebexChatPoster>,
>;

/// Shared application state used by every command handler.
pub struct AppState {
    pub engine: Arc<ConcreteEngine>,
    pub config: HeraldConfig,
}

impl AppState {
    /// Open the database in `data_dir` and build the engine from `config`.
    pub async fn init(data_dir: &Path, config: HeraldConfig) -> anyhow::Result<Self> {
        let pool = DatabasePool::open_in(data_dir)
            .await
            .with_context(|| format!("failed to open database in {}", data_dir.display()))?;

        let generator = Configured::from_result(build_generator(&config));
        let mailer = Configured::from_result(SmtpMailer::from_config(&config.smtp));
        let chat = Configured::from_result(WebexChatPoster::from_config(&config.webex));

        let engine = WorkflowEngine::with_options(
            SqliteWorkflowStore::new(pool),
            generator,
            mailer,
            chat,
            engine_options(&config),
        );

        Ok(Self {
            engine: Arc::new(engine),
            config,
        })
    }
}

fn build_generator(
    config: &HeraldConfig,
) -> Result<GatewayTextGenerator<GatewayTokenExchange>, GenerationError> {
    let exchange = GatewayTokenExchange::from_config(&config.gateway)?;
    let tokens = TokenCache::new(exchange).with_safety_margin(Duration::from_secs(
        config.gateway.token_safety_margin_secs,
    ));
    GatewayTextGenerator::new(&config.gateway, tokens)
}

pub fn engine_options(config: &HeraldConfig) -> EngineOptions {
    EngineOptions {
        call_timeout: config.engine.call_timeout_secs.map(Duration::from_secs),
        retention: if config.engine.evict_terminal {
            RetentionPolicy::EvictTerminal
        } else {
            RetentionPolicy::KeepTerminal
        },
    }
}

// ---------------------------------------------------------------------------
// Configured
// ---------------------------------------------------------------------------

/// A collaborator, or the reason it could not be built.
///
/// Calls on a missing collaborator fail with that reason, which the engine
/// records on the run like any other collaborator failure.
pub enum Configured<T> {
    Ready(T),
    Missing(String),
}

impl<T> Configured<T> {
    fn from_result<E: std::fmt::Display>(result: Result<T, E>) -> Self {
        match result {
            Ok(inner) => Self::Ready(inner),
            Err(e) => {
                debug!(error = %e, "collaborator not configured");
                Self::Missing(e.to_string())
            }
        }
    }
}

impl<T: TextGenerator> TextGenerator for Configured<T> {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GeneratedContent, GenerationError> {
        match self {
            Self::Ready(inner) => inner.generate(request).await,
            Self::Missing(reason) => Err(GenerationError::Provider {
                message: format!("not configured: {reason}"),
            }),
        }
    }
}

impl<T: Mailer> Mailer for Configured<T> {
    async fn send(&self, subject: &str, body: &str, recipients: &[String]) -> Result<(), SendError> {
        match self {
            Self::Ready(inner) => inner.send(subject, body, recipients).await,
            Self::Missing(reason) => Err(SendError::Transport(format!("not configured: {reason}"))),
        }
    }
}

impl<T: ChatPoster> ChatPoster for Configured<T> {
    async fn post(&self, message: &str, room: &str, mentions: &[String]) -> Result<(), PostError> {
        match self {
            Self::Ready(inner) => inner.post(message, room, mentions).await,
            Self::Missing(reason) => Err(PostError::Transport(format!("not configured: {reason}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use herald_types::error::AuthError;

    use super::*;

    struct Echo;

    impl TextGenerator for Echo {
        async fn generate(
            &self,
            request: &GenerationRequest,
        ) -> Result<GeneratedContent, GenerationError> {
            Ok(GeneratedContent {
                subject: "Update".to_string(),
                body: request.message.clone(),
                chat_message: request.message.clone(),
            })
        }
    }

    fn request() -> GenerationRequest {
        GenerationRequest {
            message: "hello".to_string(),
            sender_name: "Jane".to_string(),
            mentions: vec![],
        }
    }

    #[tokio::test]
    async fn test_ready_delegates() {
        let generator = Configured::from_result(Ok::<_, AuthError>(Echo));
        let content = generator.generate(&request()).await.unwrap();
        assert_eq!(content.body, "hello");
    }

    #[tokio::test]
    async fn test_missing_fails_with_reason() {
        let generator: Configured<Echo> =
            Configured::from_result(Err(AuthError::MissingCredential("gateway.client_id")));
        let err = generator.generate(&request()).await.unwrap_err();
        assert!(err.to_string().contains("gateway.client_id"));
    }

    #[tokio::test]
    async fn test_missing_mailer_is_a_transport_error() {
        let mailer: Configured<SmtpMailer> = Configured::Missing("smtp.password is not set".into());
        let err = mailer
            .send("s", "b", &["a@example.com".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, SendError::Transport(ref m) if m.contains("smtp.password")));
    }

    #[test]
    fn test_engine_options_follow_config() {
        let mut config = HeraldConfig::default();
        let options = engine_options(&config);
        assert!(options.call_timeout.is_none());
        assert_eq!(options.retention, RetentionPolicy::KeepTerminal);

        config.engine.call_timeout_secs = Some(30);
        config.engine.evict_terminal = true;
        let options = engine_options(&config);
        assert_eq!(options.call_timeout, Some(Duration::from_secs(30)));
        assert_eq!(options.retention, RetentionPolicy::EvictTerminal);
    }

    #[tokio::test]
    async fn test_init_builds_engine_without_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::init(dir.path(), HeraldConfig::default())
            .await
            .unwrap();
        assert!(state.engine.pending().await.unwrap().is_empty());
        assert!(matches!(state.engine.generator(), Configured::Missing(_)));
    }
}

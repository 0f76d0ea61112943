//! Workflow engine: a fixed review-gated delivery pipeline.
//!
//! A run moves `pending -> generating -> awaiting_review`, pauses there with
//! its state persisted, and later continues through `delivering ->
//! completed` on approval or ends `cancelled` on rejection. `failed` is
//! reachable from generation or from a delivery with no channel to attempt.
//!
//! Nothing runs between control calls: the pause is just a record sitting in
//! the store. Control misuse fails the call; collaborator failures are
//! recorded on the returned state.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use herald_types::channel::GenerationRequest;
use herald_types::error::{TimeoutError, WorkflowError};
use herald_types::workflow::{
    Channel, DeliveryOutcome, DeliveryTargets, ReviewDecision, ReviewEdits, WorkflowState,
    WorkflowStatus,
};
use tracing::{debug, info, warn};

use crate::channel::{ChatPoster, Mailer, TextGenerator};
use crate::store::WorkflowStore;

use super::locks::ThreadLocks;
use super::new_thread_id;

/// Reason recorded when a rejection carries none.
pub const DEFAULT_REJECTION_REASON: &str = "unspecified";

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// What happens to a record once its run is terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RetentionPolicy {
    /// Keep terminal records; repeated terminal calls return them unchanged.
    #[default]
    KeepTerminal,
    /// Delete the record after the terminal state has been returned.
    EvictTerminal,
}

#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    /// Deadline applied to each collaborator call. `None` waits forever.
    pub call_timeout: Option<Duration>,
    pub retention: RetentionPolicy,
}

// ---------------------------------------------------------------------------
// StartRequest
// ---------------------------------------------------------------------------

/// Input to [`WorkflowEngine::start`].
#[derive(Debug, Clone)]
pub struct StartRequest {
    pub message: String,
    pub sender_name: String,
    pub thread_id: String,
    pub targets: DeliveryTargets,
    pub skip_review: bool,
}

impl StartRequest {
    /// A request with a freshly generated thread id and no targets.
    pub fn new(message: impl Into<String>, sender_name: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            sender_name: sender_name.into(),
            thread_id: new_thread_id(),
            targets: DeliveryTargets::default(),
            skip_review: false,
        }
    }

    pub fn thread_id(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = thread_id.into();
        self
    }

    pub fn targets(mut self, targets: DeliveryTargets) -> Self {
        self.targets = targets;
        self
    }

    pub fn skip_review(mut self, skip_review: bool) -> Self {
        self.skip_review = skip_review;
        self
    }
}

// ---------------------------------------------------------------------------
// WorkflowEngine
// ---------------------------------------------------------------------------

/// Drives runs through the pipeline against an injected store and
/// collaborators. Holds no cross-run state besides the per-thread locks.
pub struct WorkflowEngine<S, G, M, C> {
    store: S,
    generator: G,
    mailer: M,
    chat: C,
    options: EngineOptions,
    locks: ThreadLocks,
}

impl<S, G, M, C> WorkflowEngine<S, G, M, C>
where
    S: WorkflowStore,
    G: TextGenerator,
    M: Mailer,
    C: ChatPoster,
{
    pub fn new(store: S, generator: G, mailer: M, chat: C) -> Self {
        Self::with_options(store, generator, mailer, chat, EngineOptions::default())
    }

    pub fn with_options(
        store: S,
        generator: G,
        mailer: M,
        chat: C,
        options: EngineOptions,
    ) -> Self {
        Self {
            store,
            generator,
            mailer,
            chat,
            options,
            locks: ThreadLocks::default(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Create a run, generate its content and either pause for review or,
    /// with `skip_review`, deliver immediately.
    ///
    /// Returns a state at `awaiting_review`, `completed` or `failed`.
    pub async fn start(&self, request: StartRequest) -> Result<WorkflowState, WorkflowError> {
        if request.message.trim().is_empty() {
            return Err(WorkflowError::InvalidInput(
                "message must not be empty".to_string(),
            ));
        }
        if request.thread_id.trim().is_empty() {
            return Err(WorkflowError::InvalidInput(
                "thread id must not be empty".to_string(),
            ));
        }

        let _guard = self.locks.acquire(&request.thread_id).await;
        if self.store.load(&request.thread_id).await?.is_some() {
            return Err(WorkflowError::DuplicateThread(request.thread_id));
        }

        let mut state = WorkflowState::new(
            request.thread_id,
            request.message,
            request.sender_name,
            request.targets,
        );
        state.transition(WorkflowStatus::Generating);
        self.store.save(&state).await?;
        info!(thread_id = %state.thread_id, skip_review = request.skip_review, "workflow started");

        let generation = GenerationRequest {
            message: state.original_message.clone(),
            sender_name: state.sender_name.clone(),
            mentions: state.targets.chat_mentions.clone(),
        };
        match self
            .guarded("generation", self.generator.generate(&generation))
            .await
        {
            Ok(content) => state.apply_generated(content),
            Err(error) => {
                warn!(thread_id = %state.thread_id, %error, "generation failed");
                state.record_error(format!("generation: {error}"));
                state.transition(WorkflowStatus::Failed);
                self.store.save(&state).await?;
                return self.finish(state).await;
            }
        }

        if request.skip_review {
            state.review_decision = Some(ReviewDecision::Approved);
            return self.deliver(state).await;
        }

        state.transition(WorkflowStatus::AwaitingReview);
        self.store.save(&state).await?;
        info!(thread_id = %state.thread_id, status = %state.status, "awaiting review");
        Ok(state)
    }

    /// Approve a paused run, applying any reviewer edits, and deliver it.
    ///
    /// A terminal thread is returned unchanged.
    pub async fn approve(
        &self,
        thread_id: &str,
        edits: ReviewEdits,
    ) -> Result<WorkflowState, WorkflowError> {
        let _guard = self.locks.acquire(thread_id).await;
        let mut state = match self.reviewable(thread_id, "approve").await? {
            Reviewable::Terminal(state) => return Ok(state),
            Reviewable::Open(state) => state,
        };

        let decision = if state.apply_edits(edits) {
            ReviewDecision::Edited
        } else {
            ReviewDecision::Approved
        };
        state.review_decision = Some(decision);
        debug!(thread_id, ?decision, "review decision recorded");

        self.deliver(state).await
    }

    /// Cancel a paused run. Nothing is delivered.
    ///
    /// A terminal thread is returned unchanged.
    pub async fn reject(
        &self,
        thread_id: &str,
        reason: Option<String>,
    ) -> Result<WorkflowState, WorkflowError> {
        let _guard = self.locks.acquire(thread_id).await;
        let mut state = match self.reviewable(thread_id, "reject").await? {
            Reviewable::Terminal(state) => return Ok(state),
            Reviewable::Open(state) => state,
        };

        let reason = reason
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_REJECTION_REASON.to_string());
        state.review_decision = Some(ReviewDecision::Rejected);
        state.rejection_reason = Some(reason);
        state.transition(WorkflowStatus::Cancelled);
        self.store.save(&state).await?;
        info!(thread_id, status = %state.status, "workflow rejected");

        self.finish(state).await
    }

    /// Return the persisted state without transitioning it.
    pub async fn resume(&self, thread_id: &str) -> Result<WorkflowState, WorkflowError> {
        self.store
            .load(thread_id)
            .await?
            .ok_or_else(|| WorkflowError::UnknownThread(thread_id.to_string()))
    }

    /// Runs paused at the review gate, oldest first.
    pub async fn pending(&self) -> Result<Vec<WorkflowState>, WorkflowError> {
        Ok(self
            .store
            .list(Some(WorkflowStatus::AwaitingReview))
            .await?)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    async fn reviewable(
        &self,
        thread_id: &str,
        operation: &'static str,
    ) -> Result<Reviewable, WorkflowError> {
        let state = self
            .store
            .load(thread_id)
            .await?
            .ok_or_else(|| WorkflowError::UnknownThread(thread_id.to_string()))?;

        if state.is_terminal() {
            debug!(thread_id, status = %state.status, operation, "thread already terminal");
            return Ok(Reviewable::Terminal(state));
        }
        if state.status != WorkflowStatus::AwaitingReview {
            return Err(WorkflowError::InvalidTransition {
                thread_id: thread_id.to_string(),
                status: state.status,
                operation,
            });
        }
        Ok(Reviewable::Open(state))
    }

    /// Attempt each targeted channel once, email first. A channel failure
    /// never skips the other channel.
    async fn deliver(&self, mut state: WorkflowState) -> Result<WorkflowState, WorkflowError> {
        state.transition(WorkflowStatus::Delivering);
        self.store.save(&state).await?;
        info!(thread_id = %state.thread_id, status = %state.status, "delivering");

        if !state.targets.has_email() && !state.targets.has_chat() {
            warn!(thread_id = %state.thread_id, "no delivery channel configured");
            state.record_error("delivery: no delivery channel configured");
            state.transition(WorkflowStatus::Failed);
            self.store.save(&state).await?;
            return self.finish(state).await;
        }

        if state.targets.has_email() {
            let subject = state.generated_subject.as_deref().unwrap_or_default();
            let body = state.generated_body.as_deref().unwrap_or_default();
            let result = self
                .guarded(
                    "email delivery",
                    self.mailer
                        .send(subject, body, &state.targets.email_recipients),
                )
                .await;
            record_outcome(&mut state, Channel::Email, result);
        }

        if let Some(room) = state.targets.chat_room.clone().filter(|r| !r.is_empty()) {
            let message = state.generated_chat_message.as_deref().unwrap_or_default();
            let result = self
                .guarded(
                    "chat delivery",
                    self.chat.post(message, &room, &state.targets.chat_mentions),
                )
                .await;
            record_outcome(&mut state, Channel::Chat, result);
        }

        state.transition(WorkflowStatus::Completed);
        self.store.save(&state).await?;
        info!(
            thread_id = %state.thread_id,
            status = %state.status,
            email = ?state.delivery_results.get(&Channel::Email),
            chat = ?state.delivery_results.get(&Channel::Chat),
            "workflow completed"
        );

        self.finish(state).await
    }

    /// Apply the retention policy to a terminal state before returning it.
    async fn finish(&self, state: WorkflowState) -> Result<WorkflowState, WorkflowError> {
        if self.options.retention == RetentionPolicy::EvictTerminal && state.is_terminal() {
            self.store.delete(&state.thread_id).await?;
            debug!(thread_id = %state.thread_id, "evicted terminal record");
        }
        Ok(state)
    }

    /// Run a collaborator call under the configured deadline, flattening
    /// both failure kinds into a message.
    async fn guarded<T, E, F>(&self, operation: &'static str, call: F) -> Result<T, String>
    where
        E: Display,
        F: Future<Output = Result<T, E>>,
    {
        let Some(after) = self.options.call_timeout else {
            return call.await.map_err(|e| e.to_string());
        };
        match tokio::time::timeout(after, call).await {
            Ok(result) => result.map_err(|e| e.to_string()),
            Err(_) => Err(TimeoutError { operation, after }.to_string()),
        }
    }
}

enum Reviewable {
    Open(WorkflowState),
    Terminal(WorkflowState),
}

fn record_outcome(state: &mut WorkflowState, channel: Channel, result: Result<(), String>) {
    let outcome = match result {
        Ok(()) => DeliveryOutcome::Sent,
        Err(error) => {
            warn!(thread_id = %state.thread_id, %channel, %error, "delivery failed");
            let error = format!("{channel}: {error}");
            state.record_error(error.clone());
            DeliveryOutcome::Failed { error }
        }
    };
    state.record_delivery(channel, outcome);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use herald_types::channel::GeneratedContent;
    use herald_types::error::{GenerationError, PostError, SendError};

    use super::*;
    use crate::store::InMemoryWorkflowStore;

    // -- mocks --------------------------------------------------------------

    #[derive(Default)]
    struct MockGenerator {
        calls: AtomicUsize,
        fail: AtomicBool,
        delay: Option<Duration>,
    }

    impl TextGenerator for Arc<MockGenerator> {
        async fn generate(
            &self,
            request: &GenerationRequest,
        ) -> Result<GeneratedContent, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(GenerationError::Provider {
                    message: "model unavailable".to_string(),
                });
            }
            Ok(GeneratedContent {
                subject: format!("Update from {}", request.sender_name),
                body: format!("Hello team,\n\n{}", request.message),
                chat_message: format!("**Heads up:** {}", request.message),
            })
        }
    }

    #[derive(Default)]
    struct MockMailer {
        calls: AtomicUsize,
        fail: AtomicBool,
        delay: Option<Duration>,
        last_subject: std::sync::Mutex<Option<String>>,
    }

    impl Mailer for Arc<MockMailer> {
        async fn send(
            &self,
            subject: &str,
            _body: &str,
            _recipients: &[String],
        ) -> Result<(), SendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_subject.lock().unwrap() = Some(subject.to_string());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(SendError::Transport("connection refused".to_string()));
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockChat {
        calls: AtomicUsize,
        fail: AtomicBool,
        last_message: std::sync::Mutex<Option<String>>,
    }

    impl ChatPoster for Arc<MockChat> {
        async fn post(
            &self,
            message: &str,
            _room: &str,
            _mentions: &[String],
        ) -> Result<(), PostError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_message.lock().unwrap() = Some(message.to_string());
            if self.fail.load(Ordering::SeqCst) {
                return Err(PostError::Status {
                    status: 500,
                    body: "internal".to_string(),
                });
            }
            Ok(())
        }
    }

    type TestEngine =
        WorkflowEngine<InMemoryWorkflowStore, Arc<MockGenerator>, Arc<MockMailer>, Arc<MockChat>>;

    struct Harness {
        engine: TestEngine,
        generator: Arc<MockGenerator>,
        mailer: Arc<MockMailer>,
        chat: Arc<MockChat>,
    }

    fn harness_with(
        options: EngineOptions,
        generator: MockGenerator,
        mailer: MockMailer,
    ) -> Harness {
        let generator = Arc::new(generator);
        let mailer = Arc::new(mailer);
        let chat = Arc::new(MockChat::default());
        let engine = WorkflowEngine::with_options(
            InMemoryWorkflowStore::new(),
            Arc::clone(&generator),
            Arc::clone(&mailer),
            Arc::clone(&chat),
            options,
        );
        Harness {
            engine,
            generator,
            mailer,
            chat,
        }
    }

    fn harness() -> Harness {
        harness_with(
            EngineOptions::default(),
            MockGenerator::default(),
            MockMailer::default(),
        )
    }

    fn both_channels() -> DeliveryTargets {
        DeliveryTargets {
            email_recipients: vec!["team@example.com".to_string()],
            chat_room: Some("room-1".to_string()),
            chat_mentions: vec!["bob@example.com".to_string()],
        }
    }

    fn request(thread_id: &str) -> StartRequest {
        StartRequest::new("Reschedule standup to 3pm", "Jane")
            .thread_id(thread_id)
            .targets(both_channels())
    }

    // -- start --------------------------------------------------------------

    #[tokio::test]
    async fn test_start_pauses_at_review() {
        let h = harness();
        let state = h.engine.start(request("t1")).await.unwrap();

        assert_eq!(state.status, WorkflowStatus::AwaitingReview);
        assert!(state.review_decision.is_none());
        assert!(!state.generated_subject.as_deref().unwrap_or_default().is_empty());
        assert!(state.delivery_results.is_empty());
        assert_eq!(h.mailer.calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.chat.calls.load(Ordering::SeqCst), 0);

        let stored = h.engine.store().load("t1").await.unwrap().unwrap();
        assert_eq!(stored, state);
    }

    #[tokio::test]
    async fn test_start_generation_failure_is_recorded() {
        let h = harness();
        h.generator.fail.store(true, Ordering::SeqCst);

        let state = h.engine.start(request("t1")).await.unwrap();
        assert_eq!(state.status, WorkflowStatus::Failed);
        assert_eq!(state.errors.len(), 1);
        assert!(state.errors[0].starts_with("generation: "));
        assert!(state.generated_subject.is_none());

        let stored = h.engine.resume("t1").await.unwrap();
        assert_eq!(stored.status, WorkflowStatus::Failed);
    }

    #[tokio::test]
    async fn test_start_skip_review_delivers_immediately() {
        let h = harness();
        let state = h
            .engine
            .start(request("t2").skip_review(true))
            .await
            .unwrap();

        assert_eq!(state.status, WorkflowStatus::Completed);
        assert_eq!(state.review_decision, Some(ReviewDecision::Approved));
        assert_eq!(state.outcome(Channel::Email), &DeliveryOutcome::Sent);
        assert_eq!(state.outcome(Channel::Chat), &DeliveryOutcome::Sent);
    }

    #[tokio::test]
    async fn test_start_skip_review_with_failed_generation_never_delivers() {
        let h = harness();
        h.generator.fail.store(true, Ordering::SeqCst);

        let state = h
            .engine
            .start(request("t2").skip_review(true))
            .await
            .unwrap();
        assert_eq!(state.status, WorkflowStatus::Failed);
        assert_eq!(h.mailer.calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.chat.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_start_rejects_duplicate_thread() {
        let h = harness();
        h.engine.start(request("t1")).await.unwrap();

        let err = h.engine.start(request("t1")).await.unwrap_err();
        assert!(matches!(err, WorkflowError::DuplicateThread(id) if id == "t1"));
        assert_eq!(h.generator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_start_rejects_reuse_of_terminal_thread() {
        let h = harness();
        h.engine.start(request("t1")).await.unwrap();
        h.engine.reject("t1", None).await.unwrap();

        let err = h.engine.start(request("t1")).await.unwrap_err();
        assert!(matches!(err, WorkflowError::DuplicateThread(_)));
        let stored = h.engine.resume("t1").await.unwrap();
        assert_eq!(stored.status, WorkflowStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_start_rejects_blank_message() {
        let h = harness();
        let err = h
            .engine
            .start(StartRequest::new("   ", "Jane").thread_id("t1"))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidInput(_)));
        assert!(h.engine.store().is_empty());
        assert_eq!(h.generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_start_generates_thread_id_when_not_given() {
        let h = harness();
        let state = h
            .engine
            .start(StartRequest::new("Ship it", "Jane").targets(both_channels()))
            .await
            .unwrap();
        assert!(!state.thread_id.is_empty());
        assert!(h.engine.resume(&state.thread_id).await.is_ok());
    }

    // -- approve ------------------------------------------------------------

    #[tokio::test]
    async fn test_approve_delivers_both_channels() {
        let h = harness();
        h.engine.start(request("t1")).await.unwrap();

        let state = h.engine.approve("t1", ReviewEdits::default()).await.unwrap();
        assert_eq!(state.status, WorkflowStatus::Completed);
        assert_eq!(state.review_decision, Some(ReviewDecision::Approved));
        assert_eq!(state.delivery_results.len(), 2);
        assert_eq!(state.outcome(Channel::Email), &DeliveryOutcome::Sent);
        assert_eq!(state.outcome(Channel::Chat), &DeliveryOutcome::Sent);
        assert!(state.errors.is_empty());
    }

    #[tokio::test]
    async fn test_approve_email_failure_does_not_block_chat() {
        let h = harness();
        h.mailer.fail.store(true, Ordering::SeqCst);
        h.engine.start(request("t1")).await.unwrap();

        let state = h.engine.approve("t1", ReviewEdits::default()).await.unwrap();
        assert_eq!(state.status, WorkflowStatus::Completed);
        assert!(matches!(
            state.outcome(Channel::Email),
            DeliveryOutcome::Failed { error } if error.starts_with("email: ")
        ));
        assert_eq!(state.outcome(Channel::Chat), &DeliveryOutcome::Sent);
        assert_eq!(h.chat.calls.load(Ordering::SeqCst), 1);
        assert_eq!(state.errors.len(), 1);
    }

    #[tokio::test]
    async fn test_approve_both_channels_failing_still_completes() {
        let h = harness();
        h.mailer.fail.store(true, Ordering::SeqCst);
        h.chat.fail.store(true, Ordering::SeqCst);
        h.engine.start(request("t1")).await.unwrap();

        let state = h.engine.approve("t1", ReviewEdits::default()).await.unwrap();
        assert_eq!(state.status, WorkflowStatus::Completed);
        assert!(
            state
                .delivery_results
                .values()
                .all(|o| matches!(o, DeliveryOutcome::Failed { .. }))
        );
        assert_eq!(state.errors.len(), 2);
    }

    #[tokio::test]
    async fn test_approve_with_edits_overwrites_each_field() {
        let h = harness();
        let paused = h.engine.start(request("t1")).await.unwrap();

        let edits = ReviewEdits {
            subject: Some("Standup moved".to_string()),
            body: None,
            chat_message: Some("Standup is at 3pm today".to_string()),
        };
        let state = h.engine.approve("t1", edits).await.unwrap();

        assert_eq!(state.review_decision, Some(ReviewDecision::Edited));
        assert_eq!(state.generated_subject.as_deref(), Some("Standup moved"));
        assert_eq!(state.generated_body, paused.generated_body);
        assert_eq!(
            h.mailer.last_subject.lock().unwrap().as_deref(),
            Some("Standup moved")
        );
        assert_eq!(
            h.chat.last_message.lock().unwrap().as_deref(),
            Some("Standup is at 3pm today")
        );
    }

    #[tokio::test]
    async fn test_approve_is_idempotent_on_terminal_thread() {
        let h = harness();
        h.engine.start(request("t1")).await.unwrap();

        let first = h.engine.approve("t1", ReviewEdits::default()).await.unwrap();
        let second = h.engine.approve("t1", ReviewEdits::default()).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
        assert_eq!(h.mailer.calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.chat.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_approve_unknown_thread_errors() {
        let h = harness();
        let err = h
            .engine
            .approve("missing", ReviewEdits::default())
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::UnknownThread(id) if id == "missing"));
    }

    #[tokio::test]
    async fn test_approve_mid_delivery_is_invalid_transition() {
        let h = harness();
        let mut state = WorkflowState::new("t1", "msg", "Jane", both_channels());
        state.transition(WorkflowStatus::Delivering);
        h.engine.store().save(&state).await.unwrap();

        let err = h
            .engine
            .approve("t1", ReviewEdits::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::InvalidTransition {
                status: WorkflowStatus::Delivering,
                operation: "approve",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_approve_without_targets_fails_run() {
        let h = harness();
        h.engine
            .start(StartRequest::new("msg", "Jane").thread_id("t1"))
            .await
            .unwrap();

        let state = h.engine.approve("t1", ReviewEdits::default()).await.unwrap();
        assert_eq!(state.status, WorkflowStatus::Failed);
        assert!(state.delivery_results.is_empty());
        assert_eq!(
            state.errors,
            vec!["delivery: no delivery channel configured".to_string()]
        );
    }

    #[tokio::test]
    async fn test_approve_chat_only_skips_mailer() {
        let h = harness();
        let targets = DeliveryTargets {
            email_recipients: vec![],
            chat_room: Some("room-1".to_string()),
            chat_mentions: vec![],
        };
        h.engine
            .start(StartRequest::new("msg", "Jane").thread_id("t1").targets(targets))
            .await
            .unwrap();

        let state = h.engine.approve("t1", ReviewEdits::default()).await.unwrap();
        assert_eq!(state.status, WorkflowStatus::Completed);
        assert_eq!(state.delivery_results.len(), 1);
        assert!(!state.delivery_results.contains_key(&Channel::Email));
        assert_eq!(h.mailer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_concurrent_approvals_deliver_once() {
        let h = harness();
        h.engine.start(request("t1")).await.unwrap();
        let engine = Arc::new(h.engine);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let engine = Arc::clone(&engine);
                tokio::spawn(async move { engine.approve("t1", ReviewEdits::default()).await })
            })
            .collect();

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap().unwrap());
        }
        assert!(results.iter().all(|s| s == &results[0]));
        assert_eq!(h.mailer.calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.chat.calls.load(Ordering::SeqCst), 1);
    }

    // -- reject -------------------------------------------------------------

    #[tokio::test]
    async fn test_reject_cancels_without_delivery() {
        let h = harness();
        h.engine.start(request("t1")).await.unwrap();

        let state = h
            .engine
            .reject("t1", Some("not needed".to_string()))
            .await
            .unwrap();
        assert_eq!(state.status, WorkflowStatus::Cancelled);
        assert_eq!(state.review_decision, Some(ReviewDecision::Rejected));
        assert_eq!(state.rejection_reason.as_deref(), Some("not needed"));
        assert!(state.delivery_results.is_empty());
        assert_eq!(h.mailer.calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.chat.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_reject_defaults_reason() {
        let h = harness();
        h.engine.start(request("t1")).await.unwrap();

        let state = h.engine.reject("t1", None).await.unwrap();
        assert_eq!(
            state.rejection_reason.as_deref(),
            Some(DEFAULT_REJECTION_REASON)
        );
    }

    #[tokio::test]
    async fn test_reject_after_approve_returns_completed_state() {
        let h = harness();
        h.engine.start(request("t1")).await.unwrap();
        let approved = h.engine.approve("t1", ReviewEdits::default()).await.unwrap();

        let again = h.engine.reject("t1", Some("too late".to_string())).await.unwrap();
        assert_eq!(again, approved);
        assert!(again.rejection_reason.is_none());
    }

    #[tokio::test]
    async fn test_reject_twice_is_idempotent() {
        let h = harness();
        h.engine.start(request("t1")).await.unwrap();

        let first = h.engine.reject("t1", Some("no".to_string())).await.unwrap();
        let second = h.engine.reject("t1", Some("other".to_string())).await.unwrap();
        assert_eq!(first, second);
    }

    // -- resume / pending ---------------------------------------------------

    #[tokio::test]
    async fn test_resume_returns_paused_state() {
        let h = harness();
        let paused = h.engine.start(request("t1")).await.unwrap();

        let resumed = h.engine.resume("t1").await.unwrap();
        assert_eq!(resumed, paused);
        assert_eq!(h.generator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_resume_unknown_thread_errors() {
        let h = harness();
        assert!(matches!(
            h.engine.resume("nope").await,
            Err(WorkflowError::UnknownThread(_))
        ));
    }

    #[tokio::test]
    async fn test_pending_lists_only_paused_runs() {
        let h = harness();
        h.engine.start(request("a")).await.unwrap();
        h.engine.start(request("b")).await.unwrap();
        h.engine.reject("b", None).await.unwrap();

        let pending = h.engine.pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].thread_id, "a");
    }

    // -- options ------------------------------------------------------------

    #[tokio::test]
    async fn test_evict_terminal_removes_record() {
        let h = harness_with(
            EngineOptions {
                call_timeout: None,
                retention: RetentionPolicy::EvictTerminal,
            },
            MockGenerator::default(),
            MockMailer::default(),
        );
        h.engine.start(request("t1")).await.unwrap();

        let state = h.engine.approve("t1", ReviewEdits::default()).await.unwrap();
        assert_eq!(state.status, WorkflowStatus::Completed);
        assert!(h.engine.store().is_empty());
        assert!(matches!(
            h.engine.approve("t1", ReviewEdits::default()).await,
            Err(WorkflowError::UnknownThread(_))
        ));
        assert_eq!(h.mailer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_generation_timeout_fails_run() {
        let h = harness_with(
            EngineOptions {
                call_timeout: Some(Duration::from_secs(5)),
                retention: RetentionPolicy::KeepTerminal,
            },
            MockGenerator {
                delay: Some(Duration::from_secs(60)),
                ..Default::default()
            },
            MockMailer::default(),
        );

        let state = h.engine.start(request("t1")).await.unwrap();
        assert_eq!(state.status, WorkflowStatus::Failed);
        assert_eq!(state.errors.len(), 1);
        assert!(state.errors[0].contains("timed out"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_mailer_timeout_marks_channel_failed() {
        let h = harness_with(
            EngineOptions {
                call_timeout: Some(Duration::from_secs(5)),
                retention: RetentionPolicy::KeepTerminal,
            },
            MockGenerator::default(),
            MockMailer {
                delay: Some(Duration::from_secs(60)),
                ..Default::default()
            },
        );
        h.engine.start(request("t1")).await.unwrap();

        let state = h.engine.approve("t1", ReviewEdits::default()).await.unwrap();
        assert_eq!(state.status, WorkflowStatus::Completed);
        assert!(matches!(
            state.outcome(Channel::Email),
            DeliveryOutcome::Failed { error } if error.contains("email delivery timed out")
        ));
        assert_eq!(state.outcome(Channel::Chat), &DeliveryOutcome::Sent);
    }
}

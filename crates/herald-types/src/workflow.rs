//! Workflow domain types for Herald.
//!
//! `WorkflowState` is both the unit of persistence (one record per thread id)
//! and the engine's working memory for a single run. It is always handed
//! across crate boundaries by value, so callers never alias engine state.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::channel::GeneratedContent;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Externally visible phase of a workflow run.
///
/// `Pending` and `Generating` are transient: they exist only while `start`
/// is executing and are never returned to a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Pending,
    Generating,
    AwaitingReview,
    Delivering,
    Completed,
    Failed,
    Cancelled,
}

impl WorkflowStatus {
    /// Terminal statuses are immutable once persisted.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            WorkflowStatus::Completed | WorkflowStatus::Failed | WorkflowStatus::Cancelled
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowStatus::Pending => "pending",
            WorkflowStatus::Generating => "generating",
            WorkflowStatus::AwaitingReview => "awaiting_review",
            WorkflowStatus::Delivering => "delivering",
            WorkflowStatus::Completed => "completed",
            WorkflowStatus::Failed => "failed",
            WorkflowStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkflowStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(WorkflowStatus::Pending),
            "generating" => Ok(WorkflowStatus::Generating),
            "awaiting_review" => Ok(WorkflowStatus::AwaitingReview),
            "delivering" => Ok(WorkflowStatus::Delivering),
            "completed" => Ok(WorkflowStatus::Completed),
            "failed" => Ok(WorkflowStatus::Failed),
            "cancelled" => Ok(WorkflowStatus::Cancelled),
            other => Err(format!("invalid workflow status: '{other}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// Review
// ---------------------------------------------------------------------------

/// Outcome of the human review gate. `None` on the state means unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approved,
    Edited,
    Rejected,
}

/// Optional reviewer edits applied at approval time.
///
/// Each field overwrites its generated counterpart independently.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewEdits {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_message: Option<String>,
}

impl ReviewEdits {
    pub fn is_empty(&self) -> bool {
        self.subject.is_none() && self.body.is_none() && self.chat_message.is_none()
    }
}

// ---------------------------------------------------------------------------
// Delivery
// ---------------------------------------------------------------------------

/// A delivery channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Email,
    Chat,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Email => write!(f, "email"),
            Channel::Chat => write!(f, "chat"),
        }
    }
}

/// Result of a single channel attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    NotAttempted,
    Sent,
    Failed { error: String },
}

impl DeliveryOutcome {
    /// Whether this outcome records a finished attempt.
    pub fn is_attempted(&self) -> bool {
        !matches!(self, DeliveryOutcome::NotAttempted)
    }
}

/// Where a run delivers. Fixed at start; empty targets disable a channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryTargets {
    #[serde(default)]
    pub email_recipients: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_room: Option<String>,
    #[serde(default)]
    pub chat_mentions: Vec<String>,
}

impl DeliveryTargets {
    pub fn has_email(&self) -> bool {
        !self.email_recipients.is_empty()
    }

    pub fn has_chat(&self) -> bool {
        self.chat_room.as_deref().is_some_and(|room| !room.is_empty())
    }
}

// ---------------------------------------------------------------------------
// WorkflowState
// ---------------------------------------------------------------------------

/// Persisted state of one workflow run, keyed by `thread_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    pub thread_id: String,
    pub original_message: String,
    pub sender_name: String,
    pub targets: DeliveryTargets,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_chat_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_decision: Option<ReviewDecision>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(default)]
    pub delivery_results: BTreeMap<Channel, DeliveryOutcome>,
    pub status: WorkflowStatus,
    /// Append-only; never cleared.
    #[serde(default)]
    pub errors: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkflowState {
    /// A fresh `pending` run.
    pub fn new(
        thread_id: impl Into<String>,
        original_message: impl Into<String>,
        sender_name: impl Into<String>,
        targets: DeliveryTargets,
    ) -> Self {
        let now = Utc::now();
        Self {
            thread_id: thread_id.into(),
            original_message: original_message.into(),
            sender_name: sender_name.into(),
            targets,
            generated_subject: None,
            generated_body: None,
            generated_chat_message: None,
            review_decision: None,
            rejection_reason: None,
            delivery_results: BTreeMap::new(),
            status: WorkflowStatus::Pending,
            errors: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Store the generator's output.
    pub fn apply_generated(&mut self, content: GeneratedContent) {
        self.generated_subject = Some(content.subject);
        self.generated_body = Some(content.body);
        self.generated_chat_message = Some(content.chat_message);
    }

    /// Overwrite generated fields with reviewer edits. Returns `true` if any
    /// field was edited.
    pub fn apply_edits(&mut self, edits: ReviewEdits) -> bool {
        let edited = !edits.is_empty();
        if let Some(subject) = edits.subject {
            self.generated_subject = Some(subject);
        }
        if let Some(body) = edits.body {
            self.generated_body = Some(body);
        }
        if let Some(chat_message) = edits.chat_message {
            self.generated_chat_message = Some(chat_message);
        }
        edited
    }

    pub fn record_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }

    /// Record a channel outcome. A channel that already holds a finished
    /// attempt is left untouched; returns `false` in that case.
    pub fn record_delivery(&mut self, channel: Channel, outcome: DeliveryOutcome) -> bool {
        if self
            .delivery_results
            .get(&channel)
            .is_some_and(DeliveryOutcome::is_attempted)
        {
            return false;
        }
        self.delivery_results.insert(channel, outcome);
        true
    }

    /// Move to `status` and bump `updated_at`.
    pub fn transition(&mut self, status: WorkflowStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    pub fn outcome(&self, channel: Channel) -> &DeliveryOutcome {
        self.delivery_results
            .get(&channel)
            .unwrap_or(&DeliveryOutcome::NotAttempted)
    }
}

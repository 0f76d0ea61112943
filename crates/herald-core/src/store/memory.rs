//! In-memory workflow store backed by a sharded concurrent map.
//!
//! `DashMap` locks one shard per operation, so operations on the same thread
//! id are serialized while other keys proceed independently.

use dashmap::DashMap;
use herald_types::error::RepositoryError;
use herald_types::workflow::{WorkflowState, WorkflowStatus};
use tracing::debug;

use super::WorkflowStore;

/// Process-local `WorkflowStore`. Records do not survive a restart.
#[derive(Debug, Default)]
pub struct InMemoryWorkflowStore {
    records: DashMap<String, WorkflowState>,
}

impl InMemoryWorkflowStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl WorkflowStore for InMemoryWorkflowStore {
    async fn save(&self, state: &WorkflowState) -> Result<(), RepositoryError> {
        self.records.insert(state.thread_id.clone(), state.clone());
        debug!(thread_id = %state.thread_id, status = %state.status, "saved workflow state");
        Ok(())
    }

    async fn load(&self, thread_id: &str) -> Result<Option<WorkflowState>, RepositoryError> {
        Ok(self.records.get(thread_id).map(|entry| entry.value().clone()))
    }

    async fn delete(&self, thread_id: &str) -> Result<bool, RepositoryError> {
        Ok(self.records.remove(thread_id).is_some())
    }

    async fn list(
        &self,
        status: Option<WorkflowStatus>,
    ) -> Result<Vec<WorkflowState>, RepositoryError> {
        let mut states: Vec<WorkflowState> = self
            .records
            .iter()
            .filter(|entry| status.is_none_or(|s| entry.value().status == s))
            .map(|entry| entry.value().clone())
            .collect();
        states.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.thread_id.cmp(&b.thread_id))
        });
        Ok(states)
    }
}

//! Workflow store trait definition.
//!
//! Keyed persistence of `WorkflowState` by thread id. The SQLite
//! implementation lives in herald-infra; an in-memory implementation is
//! provided here for single-process use and tests.

pub mod memory;

use herald_types::error::RepositoryError;
use herald_types::workflow::{WorkflowState, WorkflowStatus};

pub use memory::InMemoryWorkflowStore;

/// Storage interface for workflow runs.
///
/// Implementations must give read-your-write consistency within a process
/// and must not add a process-wide lock across thread ids. The in-memory
/// store shards by key. The SQLite store reads concurrently but its writes
/// share one writer connection, so saves and deletes for different thread
/// ids queue behind each other at the database.
pub trait WorkflowStore: Send + Sync {
    /// Upsert the record for `state.thread_id`.
    fn save(
        &self,
        state: &WorkflowState,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Load a record. Returns `None` if the thread id is unknown.
    fn load(
        &self,
        thread_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<WorkflowState>, RepositoryError>> + Send;

    /// Delete a record. Returns `true` if it existed.
    fn delete(
        &self,
        thread_id: &str,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;

    /// List records, optionally filtered by status, oldest first.
    fn list(
        &self,
        status: Option<WorkflowStatus>,
    ) -> impl std::future::Future<Output = Result<Vec<WorkflowState>, RepositoryError>> + Send;
}

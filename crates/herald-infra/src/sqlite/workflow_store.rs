//! SQLite workflow store implementation.
//!
//! Implements `WorkflowStore` from `herald-core` with one row per thread.
//! The state is a JSON blob; `status` and the timestamps are copied into
//! columns so listing does not have to decode every record.

use chrono::{DateTime, SecondsFormat, Utc};
use herald_core::store::WorkflowStore;
use herald_types::error::RepositoryError;
use herald_types::workflow::{WorkflowState, WorkflowStatus};
use sqlx::Row;
use tracing::debug;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `WorkflowStore`.
pub struct SqliteWorkflowStore {
    pool: DatabasePool,
}

impl SqliteWorkflowStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Internal row type
// ---------------------------------------------------------------------------

struct ThreadRow {
    thread_id: String,
    state: String,
}

impl ThreadRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            thread_id: row.try_get("thread_id")?,
            state: row.try_get("state")?,
        })
    }

    fn into_state(self) -> Result<WorkflowState, RepositoryError> {
        serde_json::from_str(&self.state).map_err(|e| {
            RepositoryError::Serialization(format!(
                "invalid state JSON for thread '{}': {e}",
                self.thread_id
            ))
        })
    }
}

// ---------------------------------------------------------------------------
// WorkflowStore impl
// ---------------------------------------------------------------------------

impl WorkflowStore for SqliteWorkflowStore {
    async fn save(&self, state: &WorkflowState) -> Result<(), RepositoryError> {
        let state_json = serde_json::to_string(state)
            .map_err(|e| RepositoryError::Serialization(format!("serialize state: {e}")))?;

        sqlx::query(
            r#"INSERT INTO workflow_threads (thread_id, status, state, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?)
               ON CONFLICT(thread_id) DO UPDATE SET
                 status = excluded.status,
                 state = excluded.state,
                 updated_at = excluded.updated_at"#,
        )
        .bind(&state.thread_id)
        .bind(state.status.as_str())
        .bind(&state_json)
        .bind(format_datetime(&state.created_at))
        .bind(format_datetime(&state.updated_at))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        debug!(thread_id = %state.thread_id, status = %state.status, "saved workflow state");
        Ok(())
    }

    async fn load(&self, thread_id: &str) -> Result<Option<WorkflowState>, RepositoryError> {
        let row = sqlx::query("SELECT thread_id, state FROM workflow_threads WHERE thread_id = ?")
            .bind(thread_id)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let r = ThreadRow::from_row(&row)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(r.into_state()?))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, thread_id: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM workflow_threads WHERE thread_id = ?")
            .bind(thread_id)
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(
        &self,
        status: Option<WorkflowStatus>,
    ) -> Result<Vec<WorkflowState>, RepositoryError> {
        let rows = match status {
            Some(status) => {
                sqlx::query(
                    "SELECT thread_id, state FROM workflow_threads WHERE status = ? ORDER BY created_at, thread_id",
                )
                .bind(status.as_str())
                .fetch_all(&self.pool.reader)
                .await
            }
            None => {
                sqlx::query(
                    "SELECT thread_id, state FROM workflow_threads ORDER BY created_at, thread_id",
                )
                .fetch_all(&self.pool.reader)
                .await
            }
        }
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows.iter()
            .map(|row| {
                ThreadRow::from_row(row)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?
                    .into_state()
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Fixed-width UTC timestamps so lexical order matches time order.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

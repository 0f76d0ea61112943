//! SQLite storage layer.
//!
//! The workflow store backed by SQLite with WAL mode and split read/write
//! connection pools.

pub mod pool;
pub mod workflow_store;

pub use pool::DatabasePool;
pub use workflow_store::SqliteWorkflowStore;

//! Review-gated delivery workflow.
//!
//! - `engine` -- the fixed state machine and its control operations
//! - `locks` -- per-thread serialization of control operations

pub mod engine;
mod locks;

pub use engine::{EngineOptions, RetentionPolicy, StartRequest, WorkflowEngine};

/// Generate a fresh, time-sortable thread id.
pub fn new_thread_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

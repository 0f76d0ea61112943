//! Shared domain types for Herald.
//!
//! This crate contains the core domain types used across the Herald workspace:
//! the persisted workflow state, generated content, configuration, secrets and
//! their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, chrono, thiserror.

pub mod channel;
pub mod config;
pub mod error;
pub mod secret;
pub mod workflow;

//! Business logic and trait definitions for Herald.
//!
//! This crate defines the "ports" (collaborator and store traits) that the
//! infrastructure layer implements, plus the workflow engine and the OAuth2
//! token cache built on top of them. It depends only on `herald-types` --
//! never on `herald-infra` or any network/database crate.

pub mod auth;
pub mod channel;
pub mod store;
pub mod workflow;

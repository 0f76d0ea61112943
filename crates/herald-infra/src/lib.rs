//! Infrastructure layer for Herald.
//!
//! Contains implementations of the ports defined in `herald-core`: the
//! OAuth2 gateway exchange and text generator, the SMTP mailer, the Webex
//! chat poster and SQLite workflow storage. Also owns configuration loading
//! (`.env`, `config.toml`, `HERALD_*` overrides).

pub mod config;
pub mod gateway;
pub mod smtp;
pub mod sqlite;
pub mod webex;

//! LLM gateway reached through an OAuth2 client-credentials token.
//!
//! - `token`: the client-credentials exchange (`TokenExchange` impl)
//! - `generator`: chat-completions `TextGenerator` using a `TokenCache`

pub mod generator;
pub mod token;
pub mod types;

pub use generator::GatewayTextGenerator;
pub use token::GatewayTokenExchange;

use std::time::Duration;

/// Request timeout for both the token endpoint and completions.
pub(crate) const HTTP_TIMEOUT: Duration = Duration::from_secs(120);

//! OAuth2 client-credentials token management.
//!
//! - `TokenExchange`: the port an identity-provider client implements
//! - `TokenCache`: cached bearer token with single-flight refresh

pub mod token_cache;

use herald_types::channel::TokenGrant;
use herald_types::error::AuthError;

pub use token_cache::TokenCache;

/// Performs one client-credentials exchange against an identity provider.
///
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
/// Implementations live in herald-infra.
pub trait TokenExchange: Send + Sync {
    fn exchange(&self) -> impl std::future::Future<Output = Result<TokenGrant, AuthError>> + Send;
}

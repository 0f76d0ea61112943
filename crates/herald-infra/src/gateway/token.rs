//! OAuth2 client-credentials exchange against the gateway's identity
//! provider.
//!
//! The client secret is held as a [`SecretString`] and only exposed while
//! building the Basic auth header.

use herald_core::auth::TokenExchange;
use herald_core::auth::token_cache::DEFAULT_TOKEN_TTL;
use herald_types::channel::TokenGrant;
use herald_types::config::GatewayConfig;
use herald_types::error::AuthError;
use herald_types::secret::Redacted;
use secrecy::{ExposeSecret, SecretString};

use super::HTTP_TIMEOUT;
use super::types::TokenResponse;

/// Client-credentials grant: Basic auth plus `grant_type=client_credentials`.
pub struct GatewayTokenExchange {
    client: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: SecretString,
}

// Deliberately no Debug: the struct carries the client secret.

impl GatewayTokenExchange {
    pub fn new(
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: SecretString,
    ) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| AuthError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            token_url: token_url.into(),
            client_id: client_id.into(),
            client_secret,
        })
    }

    pub fn from_config(config: &GatewayConfig) -> Result<Self, AuthError> {
        if config.client_id.trim().is_empty() {
            return Err(AuthError::MissingCredential("gateway.client_id"));
        }
        let secret = config
            .client_secret
            .as_ref()
            .filter(|s| !s.is_empty())
            .ok_or(AuthError::MissingCredential("gateway.client_secret"))?;

        Self::new(
            config.token_url.clone(),
            config.client_id.clone(),
            SecretString::from(secret.expose().to_string()),
        )
    }
}

impl TokenExchange for GatewayTokenExchange {
    async fn exchange(&self) -> Result<TokenGrant, AuthError> {
        let response = self
            .client
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(self.client_secret.expose_secret()))
            .header(reqwest::header::ACCEPT, "*/*")
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;

        let access_token = token
            .access_token
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| AuthError::MalformedResponse("missing access_token".to_string()))?;

        Ok(TokenGrant {
            access_token: Redacted::new(access_token),
            expires_in_secs: token.expires_in.unwrap_or(DEFAULT_TOKEN_TTL.as_secs()),
        })
    }
}

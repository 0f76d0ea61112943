//! Cached bearer token with single-flight refresh.
//!
//! Readers take a short `std::sync::RwLock` read guard and never wait on an
//! in-flight exchange while a valid token is cached. The check-then-refresh
//! path is serialized by an async mutex, so concurrent callers that find the
//! cache stale queue behind one exchange and then reuse its result.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use herald_types::error::AuthError;
use herald_types::secret::Redacted;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::TokenExchange;

/// Default refresh lead time before the reported expiry.
pub const DEFAULT_SAFETY_MARGIN: Duration = Duration::from_secs(300);

/// Lifetime assumed by exchanges whose response omits `expires_in`.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(3600);

struct CachedToken {
    value: Redacted,
    /// Instant after which the token is treated as stale.
    refresh_at: Instant,
}

/// Bearer token cache shared by every caller of one identity provider.
///
/// Generic over `E: TokenExchange` so tests can count exchanges.
pub struct TokenCache<E: TokenExchange> {
    exchange: E,
    safety_margin: Duration,
    current: RwLock<Option<Arc<CachedToken>>>,
    refresh: Mutex<()>,
}

impl<E: TokenExchange> TokenCache<E> {
    pub fn new(exchange: E) -> Self {
        Self {
            exchange,
            safety_margin: DEFAULT_SAFETY_MARGIN,
            current: RwLock::new(None),
            refresh: Mutex::new(()),
        }
    }

    pub fn with_safety_margin(mut self, safety_margin: Duration) -> Self {
        self.safety_margin = safety_margin;
        self
    }

    /// Return a valid bearer token, refreshing it first if needed.
    ///
    /// A failed refresh leaves the cached entry untouched, so the next call
    /// attempts another exchange.
    pub async fn get_token(&self) -> Result<Redacted, AuthError> {
        if let Some(token) = self.fresh_token() {
            return Ok(token);
        }

        let _refresh = self.refresh.lock().await;

        // Another caller may have refreshed while we waited for the lock.
        if let Some(token) = self.fresh_token() {
            return Ok(token);
        }

        debug!("refreshing access token");
        let grant = self.exchange.exchange().await.inspect_err(|e| {
            warn!(error = %e, "access token refresh failed");
        })?;

        if grant.access_token.is_empty() {
            return Err(AuthError::MalformedResponse(
                "empty access_token".to_string(),
            ));
        }

        let ttl = Duration::from_secs(grant.expires_in_secs);
        // Tokens shorter-lived than the margin would otherwise never be reused.
        let lead = self.safety_margin.min(ttl / 2);
        let refresh_at = Instant::now()
            .checked_add(ttl.saturating_sub(lead))
            .ok_or_else(|| {
                AuthError::MalformedResponse(format!(
                    "expires_in out of range: {}",
                    grant.expires_in_secs
                ))
            })?;
        let cached = Arc::new(CachedToken {
            value: grant.access_token,
            refresh_at,
        });

        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(cached.clone());
        debug!(ttl_secs = ttl.as_secs(), "access token refreshed");

        Ok(cached.value.clone())
    }

    /// Drop the cached token, forcing the next `get_token` to refresh.
    ///
    /// Called when the downstream API rejects a token before its expiry.
    pub fn invalidate(&self) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = None;
        debug!("access token invalidated");
    }

    fn fresh_token(&self) -> Option<Redacted> {
        let current = self.current.read().unwrap_or_else(PoisonError::into_inner);
        current
            .as_ref()
            .filter(|token| Instant::now() < token.refresh_at)
            .map(|token| token.value.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use herald_types::channel::TokenGrant;

    use super::*;

    /// Exchange that counts calls and can be told to fail.
    #[derive(Clone, Default)]
    struct CountingExchange {
        calls: Arc<AtomicUsize>,
        fail: Arc<std::sync::atomic::AtomicBool>,
        ttl_secs: u64,
        latency: Duration,
    }

    impl CountingExchange {
        fn with_ttl(ttl_secs: u64) -> Self {
            Self {
                ttl_secs,
                ..Default::default()
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn set_failing(&self, fail: bool) {
            self.fail.store(fail, Ordering::SeqCst);
        }
    }

    impl TokenExchange for CountingExchange {
        async fn exchange(&self) -> Result<TokenGrant, AuthError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(AuthError::Status {
                    status: 503,
                    body: "unavailable".to_string(),
                });
            }
            Ok(TokenGrant {
                access_token: Redacted::new(format!("token-{n}")),
                expires_in_secs: self.ttl_secs,
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_call_fetches_and_second_reuses() {
        let exchange = CountingExchange::with_ttl(3600);
        let cache = TokenCache::new(exchange.clone());

        let first = cache.get_token().await.unwrap();
        let second = cache.get_token().await.unwrap();

        assert_eq!(first.expose(), "token-1");
        assert_eq!(second.expose(), "token-1");
        assert_eq!(exchange.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refreshes_inside_safety_margin() {
        let exchange = CountingExchange::with_ttl(3600);
        let cache = TokenCache::new(exchange.clone());

        cache.get_token().await.unwrap();

        // Still outside the 300s margin.
        tokio::time::advance(Duration::from_secs(3299)).await;
        assert_eq!(cache.get_token().await.unwrap().expose(), "token-1");

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.get_token().await.unwrap().expose(), "token-2");
        assert_eq!(exchange.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_lived_token_is_still_reused() {
        let exchange = CountingExchange::with_ttl(60);
        let cache = TokenCache::new(exchange.clone());

        cache.get_token().await.unwrap();
        tokio::time::advance(Duration::from_secs(20)).await;
        cache.get_token().await.unwrap();
        assert_eq!(exchange.calls(), 1);

        tokio::time::advance(Duration::from_secs(10)).await;
        cache.get_token().await.unwrap();
        assert_eq!(exchange.calls(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_exchange() {
        let exchange = CountingExchange {
            ttl_secs: 3600,
            latency: Duration::from_millis(50),
            ..Default::default()
        };
        let cache = Arc::new(TokenCache::new(exchange.clone()));

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move { cache.get_token().await })
            })
            .collect();

        for result in futures_util::future::join_all(tasks).await {
            assert_eq!(result.unwrap().unwrap().expose(), "token-1");
        }
        assert_eq!(exchange.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_is_not_cached() {
        let exchange = CountingExchange::with_ttl(3600);
        let cache = TokenCache::new(exchange.clone());

        exchange.set_failing(true);
        let err = cache.get_token().await.unwrap_err();
        assert!(matches!(err, AuthError::Status { status: 503, .. }));

        exchange.set_failing(false);
        assert_eq!(cache.get_token().await.unwrap().expose(), "token-2");
        assert_eq!(exchange.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_keeps_previous_token() {
        let exchange = CountingExchange::with_ttl(3600);
        let cache = TokenCache::new(exchange.clone());
        cache.get_token().await.unwrap();

        tokio::time::advance(Duration::from_secs(3400)).await;
        exchange.set_failing(true);
        assert!(cache.get_token().await.is_err());

        // The stale entry is still there and the next call retries.
        assert!(cache.current.read().unwrap().is_some());
        exchange.set_failing(false);
        assert_eq!(cache.get_token().await.unwrap().expose(), "token-3");
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_forces_refresh() {
        let exchange = CountingExchange::with_ttl(3600);
        let cache = TokenCache::new(exchange.clone());

        cache.get_token().await.unwrap();
        cache.invalidate();
        assert_eq!(cache.get_token().await.unwrap().expose(), "token-2");
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_token_is_rejected() {
        struct EmptyExchange;
        impl TokenExchange for EmptyExchange {
            async fn exchange(&self) -> Result<TokenGrant, AuthError> {
                Ok(TokenGrant {
                    access_token: Redacted::new(""),
                    expires_in_secs: 3600,
                })
            }
        }

        let cache = TokenCache::new(EmptyExchange);
        let err = cache.get_token().await.unwrap_err();
        assert!(matches!(err, AuthError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_out_of_range_expiry_is_rejected() {
        #[derive(Default)]
        struct HugeExpiry {
            calls: AtomicUsize,
        }
        impl TokenExchange for HugeExpiry {
            async fn exchange(&self) -> Result<TokenGrant, AuthError> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                Ok(TokenGrant {
                    access_token: Redacted::new("tok"),
                    expires_in_secs: u64::MAX,
                })
            }
        }

        let cache = TokenCache::new(HugeExpiry::default());
        let err = cache.get_token().await.unwrap_err();
        assert!(matches!(err, AuthError::MalformedResponse(_)));

        // Nothing was cached, so the next call exchanges again.
        assert!(cache.get_token().await.is_err());
        assert_eq!(cache.exchange.calls.load(Ordering::SeqCst), 2);
    }
}

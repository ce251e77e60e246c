use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::cache::token::CachedToken;
use crate::helpers::time::{Clock, SystemClock};
use crate::observability::metrics::get_metrics;

/// Process-wide token cache: credential identity (client id) -> token.
///
/// One entry per identity, replaced whole on refresh, never evicted.
/// Staleness is computed on read from `acquired_at`; there is no stored
/// "stale" state.
#[derive(Clone)]
pub struct TokenCache {
    inner: Arc<RwLock<HashMap<String, CachedToken>>>,
    clock: Arc<dyn Clock>,
    freshness_window: TimeDelta,
}

impl TokenCache {
    pub fn new(freshness_window: TimeDelta) -> Self {
        Self::with_clock(freshness_window, Arc::new(SystemClock))
    }

    pub fn with_clock(freshness_window: TimeDelta, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            clock,
            freshness_window,
        }
    }

    /// Entry for `identity`, fresh or not.
    pub async fn get(&self, identity: &str) -> Option<CachedToken> {
        self.inner.read().await.get(identity).cloned()
    }

    /// Entry for `identity` only if it is still inside the freshness window.
    pub async fn get_fresh(&self, identity: &str) -> Option<CachedToken> {
        let now = self.now();
        self.get(identity)
            .await
            .filter(|token| self.is_fresh(token, now))
    }

    /// Insert or replace the entry for `identity`, stamped with the current time.
    pub async fn put(&self, identity: &str, value: String) -> CachedToken {
        let token = CachedToken::new(value, self.now());
        let total = {
            let mut map = self.inner.write().await;
            map.insert(identity.to_owned(), token.clone());
            map.len()
        };
        get_metrics().await.cached_identities.set(total as i64);
        token
    }

    pub fn is_fresh(&self, token: &CachedToken, now: DateTime<Utc>) -> bool {
        token.is_fresh(now, self.freshness_window)
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn freshness_window(&self) -> TimeDelta {
        self.freshness_window
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

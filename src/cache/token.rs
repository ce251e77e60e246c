use chrono::{DateTime, TimeDelta, Utc};

/// Bearer token as installed by the token issuer.
///
/// Never mutated: a refresh installs a new value in the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedToken {
    pub value: String,
    pub acquired_at: DateTime<Utc>,
}

impl CachedToken {
    pub fn new(value: String, acquired_at: DateTime<Utc>) -> Self {
        Self { value, acquired_at }
    }

    /// `now - acquired_at < window`
    pub fn is_fresh(&self, now: DateTime<Utc>, freshness_window: TimeDelta) -> bool {
        now.signed_duration_since(self.acquired_at) < freshness_window
    }
}

use chrono::{DateTime, TimeDelta, Utc};
use tokio::time::Instant;

use crate::utils::constants::DEFAULT_FRESHNESS_WINDOW_SECS;

/// Source of "now" for everything that stamps or ages tokens.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

pub fn get_freshness_window(freshness_window_seconds: Option<u64>) -> TimeDelta {
    let seconds = freshness_window_seconds.unwrap_or(DEFAULT_FRESHNESS_WINDOW_SECS);
    i64::try_from(seconds)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .unwrap_or(TimeDelta::MAX)
}

pub fn get_instant() -> Instant {
    Instant::now()
}

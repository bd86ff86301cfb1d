//! Per-client daily quota.
//!
//! Each identity owns a counter and a window that starts on first access and lasts
//! `rate_limit.window_secs` (24 hours by default). Expired windows are reset lazily the
//! next time the identity is read or written; the background sweeper in [`sweep`]
//! only bounds memory for identities that never come back.
//!
//! The count is consumed by [`RateLimiter::increment`] alone, which the generate
//! handler calls after the upstream call succeeded.

mod store;
pub mod sweep;

pub use store::{MemoryStore, RateLimitRecord, RateLimitStore};
pub use sweep::spawn_sweeper;

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use std::sync::Arc;
use std::time::Duration;

use crate::config::RateLimitConfig;

/// Point-in-time view of one identity's quota
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitStatus {
    pub count: u32,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
    pub reset_in_secs: u64,
}

impl RateLimitStatus {
    fn from_record(record: &RateLimitRecord, limit: u32, now: DateTime<Utc>) -> Self {
        Self {
            count: record.count,
            limit,
            remaining: limit.saturating_sub(record.count),
            reset_at: record.window_reset_at,
            reset_in_secs: u64::try_from((record.window_reset_at - now).num_seconds())
                .unwrap_or(0),
        }
    }

    pub fn is_exceeded(&self) -> bool {
        self.count >= self.limit
    }

    /// RFC 3339 with millisecond precision, e.g. `2024-05-01T10:00:00.000Z`
    pub fn reset_at_rfc3339(&self) -> String {
        self.reset_at.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    limit: u32,
    window: TimeDelta,
}

impl RateLimiter {
    /// In-memory limiter built from configuration
    pub fn new(config: &RateLimitConfig) -> Self {
        Self::with_store(Arc::new(MemoryStore::new()), config.daily_limit, config.window())
    }

    pub fn with_store(store: Arc<dyn RateLimitStore>, limit: u32, window: Duration) -> Self {
        let window = TimeDelta::from_std(window).unwrap_or(TimeDelta::MAX);
        Self {
            store,
            limit,
            window,
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Number of identities currently held in the store
    pub fn tracked(&self) -> usize {
        self.store.len()
    }

    /// Current usage for `identity`; never changes the count.
    pub fn status(&self, identity: &str) -> RateLimitStatus {
        self.status_at(identity, Utc::now())
    }

    pub fn status_at(&self, identity: &str, now: DateTime<Utc>) -> RateLimitStatus {
        let record = self.store.get(identity, now, self.window);
        RateLimitStatus::from_record(&record, self.limit, now)
    }

    /// Consumes one unit of quota and returns the updated status.
    pub fn increment(&self, identity: &str) -> RateLimitStatus {
        self.increment_at(identity, Utc::now())
    }

    pub fn increment_at(&self, identity: &str, now: DateTime<Utc>) -> RateLimitStatus {
        let record = self.store.increment(identity, now, self.window);
        tracing::debug!(identity, count = record.count, "Quota consumed");
        RateLimitStatus::from_record(&record, self.limit, now)
    }

    pub fn is_exceeded(&self, identity: &str) -> bool {
        self.is_exceeded_at(identity, Utc::now())
    }

    pub fn is_exceeded_at(&self, identity: &str, now: DateTime<Utc>) -> bool {
        self.status_at(identity, now).is_exceeded()
    }

    /// Removes records whose window has fully elapsed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Utc::now())
    }

    pub fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        self.store.sweep(now)
    }
}

//! Keyed, time-windowed usage counters

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;

/// Usage counter for one client identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitRecord {
    pub identity: String,
    pub count: u32,
    pub window_reset_at: DateTime<Utc>,
}

impl RateLimitRecord {
    pub fn fresh(identity: &str, now: DateTime<Utc>, window: TimeDelta) -> Self {
        Self {
            identity: identity.to_string(),
            count: 0,
            window_reset_at: now
                .checked_add_signed(window)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    /// The reset instant itself still belongs to the window.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.window_reset_at
    }
}

/// Storage backend for rate-limit records.
///
/// Implementations must make each call atomic per identity: a `get` or
/// `increment` never observes a half-applied update from a concurrent call
/// for the same key.
pub trait RateLimitStore: Send + Sync {
    /// Returns the live record, creating or resetting it when absent or expired.
    fn get(&self, identity: &str, now: DateTime<Utc>, window: TimeDelta) -> RateLimitRecord;

    /// Same fetch-or-create as [`get`](Self::get), then adds one to the count.
    fn increment(
        &self,
        identity: &str,
        now: DateTime<Utc>,
        window: TimeDelta,
    ) -> RateLimitRecord;

    /// Drops every record whose window has elapsed, returning how many were removed.
    fn sweep(&self, now: DateTime<Utc>) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-local store; lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: DashMap<String, RateLimitRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `update` against the live record while holding the shard lock for `identity`.
    fn with_live_record<F>(
        &self,
        identity: &str,
        now: DateTime<Utc>,
        window: TimeDelta,
        update: F,
    ) -> RateLimitRecord
    where
        F: FnOnce(&mut RateLimitRecord),
    {
        let mut entry = self
            .records
            .entry(identity.to_string())
            .or_insert_with(|| RateLimitRecord::fresh(identity, now, window));

        if entry.is_expired(now) {
            *entry = RateLimitRecord::fresh(identity, now, window);
        }

        update(entry.value_mut());
        entry.value().clone()
    }
}

impl RateLimitStore for MemoryStore {
    fn get(&self, identity: &str, now: DateTime<Utc>, window: TimeDelta) -> RateLimitRecord {
        self.with_live_record(identity, now, window, |_| {})
    }

    fn increment(
        &self,
        identity: &str,
        now: DateTime<Utc>,
        window: TimeDelta,
    ) -> RateLimitRecord {
        self.with_live_record(identity, now, window, |record| {
            record.count = record.count.saturating_add(1);
        })
    }

    fn sweep(&self, now: DateTime<Utc>) -> usize {
        let mut removed = 0;
        self.records.retain(|_, record| {
            let keep = !record.is_expired(now);
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> TimeDelta {
        TimeDelta::hours(24)
    }

    #[test]
    fn get_creates_fresh_record() {
        let store = MemoryStore::new();
        let now = Utc::now();

        let record = store.get("10.0.0.1", now, window());
        assert_eq!(record.count, 0);
        assert_eq!(record.window_reset_at, now + window());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn increment_accumulates_within_window() {
        let store = MemoryStore::new();
        let now = Utc::now();

        store.increment("a", now, window());
        let record = store.increment("a", now + TimeDelta::minutes(5), window());
        assert_eq!(record.count, 2);
        assert_eq!(record.window_reset_at, now + window());
    }

    #[test]
    fn reset_instant_is_still_inside_window() {
        let store = MemoryStore::new();
        let now = Utc::now();

        store.increment("a", now, window());
        let at_reset = store.get("a", now + window(), window());
        assert_eq!(at_reset.count, 1);

        let after_reset = store.get("a", now + window() + TimeDelta::milliseconds(1), window());
        assert_eq!(after_reset.count, 0);
        assert!(after_reset.window_reset_at > now + window());
    }

    #[test]
    fn sweep_only_removes_expired_records() {
        let store = MemoryStore::new();
        let now = Utc::now();

        store.get("old", now - TimeDelta::hours(30), window());
        store.get("live", now - TimeDelta::hours(1), window());

        assert_eq!(store.sweep(now), 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("live", now, window()).window_reset_at, now + TimeDelta::hours(23));
    }

    #[test]
    fn concurrent_increments_are_not_lost() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let now = Utc::now();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        store.increment("shared", now, TimeDelta::hours(24));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.get("shared", now, TimeDelta::hours(24)).count, 400);
    }
}

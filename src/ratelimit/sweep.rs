//! Periodic removal of expired rate-limit records

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::RateLimiter;

/// Spawns a task that sweeps `limiter` every `period`.
///
/// Only records whose window already elapsed are dropped, so live quotas are never
/// touched. The first sweep runs one full period after the call.
pub fn spawn_sweeper(limiter: Arc<RateLimiter>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let pruned = limiter.sweep();
            if pruned > 0 {
                info!(pruned, tracked = limiter.tracked(), "Swept expired rate-limit records");
            } else {
                debug!(tracked = limiter.tracked(), "Rate-limit sweep found nothing to prune");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RateLimitConfig;
    use chrono::{TimeDelta, Utc};

    #[tokio::test]
    async fn sweeper_prunes_expired_records() {
        let limiter = Arc::new(RateLimiter::new(&RateLimitConfig::default()));
        let long_ago = Utc::now() - TimeDelta::days(3);
        limiter.status_at("stale", long_ago);
        limiter.status("live");
        assert_eq!(limiter.tracked(), 2);

        let handle = spawn_sweeper(limiter.clone(), Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(120)).await;
        handle.abort();

        assert_eq!(limiter.tracked(), 1);
        assert_eq!(limiter.status("live").count, 0);
    }
}

use std::sync::Arc;

use crate::config::Config;
use crate::observability::Metrics;
use crate::ratelimit::RateLimiter;
use crate::upstream::{UpstreamClient, UpstreamError};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub limiter: Arc<RateLimiter>,
    pub upstream: Arc<UpstreamClient>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, UpstreamError> {
        let limiter = RateLimiter::new(&config.rate_limit);
        let upstream = UpstreamClient::new(&config.upstream, &config.download)?;

        Ok(Self {
            config: Arc::new(config),
            limiter: Arc::new(limiter),
            upstream: Arc::new(upstream),
            metrics: Arc::new(Metrics::new()),
        })
    }
}

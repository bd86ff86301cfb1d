//! In-process request counters

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for the generate and download endpoints
#[derive(Debug, Default)]
pub struct Metrics {
    generations_succeeded: AtomicU64,
    generations_failed: AtomicU64,
    quota_rejections: AtomicU64,
    downloads_served: AtomicU64,
    downloads_failed: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation_succeeded(&self) {
        self.generations_succeeded.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "generations_succeeded", "Metric incremented");
    }

    pub fn generation_failed(&self) {
        self.generations_failed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "generations_failed", "Metric incremented");
    }

    pub fn quota_rejected(&self) {
        self.quota_rejections.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "quota_rejections", "Metric incremented");
    }

    pub fn download_served(&self) {
        self.downloads_served.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "downloads_served", "Metric incremented");
    }

    pub fn download_failed(&self) {
        self.downloads_failed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "downloads_failed", "Metric incremented");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            generations_succeeded: self.generations_succeeded.load(Ordering::Relaxed),
            generations_failed: self.generations_failed.load(Ordering::Relaxed),
            quota_rejections: self.quota_rejections.load(Ordering::Relaxed),
            downloads_served: self.downloads_served.load(Ordering::Relaxed),
            downloads_failed: self.downloads_failed.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub generations_succeeded: u64,
    pub generations_failed: u64,
    pub quota_rejections: u64,
    pub downloads_served: u64,
    pub downloads_failed: u64,
}

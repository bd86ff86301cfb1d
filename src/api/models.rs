//! Wire models for the generate, download and health endpoints.
//!
//! Field names follow the browser client's camelCase contract.

use serde::{Deserialize, Serialize};

use crate::observability::MetricsSnapshot;
use crate::ratelimit::RateLimitStatus;

/// Body of `GET /api/generate`
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitStatusResponse {
    pub limit: u32,
    pub remaining: u32,
    pub used: u32,
    pub reset_at: String,
    pub reset_in: u64,
}

impl From<&RateLimitStatus> for RateLimitStatusResponse {
    fn from(status: &RateLimitStatus) -> Self {
        Self {
            limit: status.limit,
            remaining: status.remaining,
            used: status.count,
            reset_at: status.reset_at_rfc3339(),
            reset_in: status.reset_in_secs,
        }
    }
}

/// JSON error body. Only `error` is always present; quota rejections fill in the rest.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_in: Option<u64>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            ..Self::default()
        }
    }

    pub fn with_message(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::new(error)
        }
    }
}

/// Query string of `GET /api/download`
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DownloadParams {
    pub image_url: Option<String>,
    pub filename: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub tracked_identities: usize,
    pub counters: MetricsSnapshot,
}

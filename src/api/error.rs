use axum::{Json, http::StatusCode, response::IntoResponse};
use thiserror::Error;

use super::models::ErrorResponse;
use crate::humanize::format_wait;
use crate::ratelimit::RateLimitStatus;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    MalformedRequest(String),
    #[error("payload too large: limit is {0} bytes")]
    PayloadTooLarge(usize),
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Rate limit exceeded")]
    QuotaExceeded(RateLimitStatus),
    #[error("upstream failure: {0}")]
    UpstreamFailure(String),
    #[error("fetch failed: {0}")]
    FetchFailed(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::QuotaExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::UpstreamFailure(_) | ApiError::FetchFailed(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn body(&self) -> ErrorResponse {
        match self {
            ApiError::MalformedRequest(_)
            | ApiError::PayloadTooLarge(_)
            | ApiError::MethodNotAllowed => ErrorResponse::new(self.to_string()),
            ApiError::QuotaExceeded(status) => ErrorResponse {
                error: self.to_string(),
                message: Some(format!(
                    "Limit harian tercapai! Coba lagi dalam {}",
                    format_wait(status.reset_in_secs)
                )),
                limit: Some(status.limit),
                remaining: Some(0),
                reset_at: Some(status.reset_at_rfc3339()),
                reset_in: Some(status.reset_in_secs),
            },
            ApiError::UpstreamFailure(message) => {
                ErrorResponse::with_message("Gagal generate gambar", message.as_str())
            }
            ApiError::FetchFailed(message) => {
                ErrorResponse::with_message("Failed to download image", message.as_str())
            }
            ApiError::Internal(message) => {
                ErrorResponse::with_message("Internal server error", message.as_str())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), Json(self.body())).into_response()
    }
}

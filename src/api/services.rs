use axum::{
    Json,
    body::Body,
    extract::{ConnectInfo, Query, Request, State},
    http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use chrono::Utc;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use std::net::SocketAddr;
use tracing::{info, warn};

use super::{
    error::ApiError,
    models::{DownloadParams, HealthResponse, RateLimitStatusResponse},
    state::AppState,
    utils::{attachment_disposition, client_identity, generated_filename},
    validation::validate_form,
};
use crate::multipart;
use crate::ratelimit::RateLimitStatus;

const RATE_LIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const RATE_LIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
const RATE_LIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");
const IMAGE_PNG: &str = "image/png";

/// Image generation endpoint (`/api/generate`)
///
/// Dispatches on the method:
/// - `OPTIONS`: empty 200 for CORS preflight
/// - `GET`: current quota for the caller, without consuming any
/// - `POST`: the generation pipeline in [`generate_image`]
/// - anything else: 405
pub async fn generate(State(state): State<AppState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();

    if parts.method == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }

    let identity = client_identity(
        &parts.headers,
        parts.extensions.get::<ConnectInfo<SocketAddr>>(),
    );

    if parts.method == Method::GET {
        let status = state.limiter.status(&identity);
        return (StatusCode::OK, Json(RateLimitStatusResponse::from(&status))).into_response();
    }

    if parts.method != Method::POST {
        return ApiError::MethodNotAllowed.into_response();
    }

    match generate_image(&state, &identity, &parts.headers, body).await {
        Ok(response) => {
            state.metrics.generation_succeeded();
            response
        }
        Err(err) => {
            match &err {
                ApiError::QuotaExceeded(status) => {
                    state.metrics.quota_rejected();
                    warn!(%identity, reset_in = status.reset_in_secs, "Daily quota exhausted");
                }
                other => {
                    state.metrics.generation_failed();
                    warn!(%identity, error = %other, "Generation rejected");
                }
            }
            err.into_response()
        }
    }
}

/// ## Flow:
/// 1. Reject when the caller's quota is used up
/// 2. Require `multipart/form-data` with a boundary (before touching the body)
/// 3. Buffer the body within `server.max_body_bytes` and decode it
/// 4. Validate `image` and `username`
/// 5. Forward to the upstream API (bounded by its timeout)
/// 6. Consume one unit of quota, only after the upstream succeeded
/// 7. Return the rendered image with rate-limit headers
async fn generate_image(
    state: &AppState,
    identity: &str,
    headers: &HeaderMap,
    body: Body,
) -> Result<Response, ApiError> {
    if state.limiter.is_exceeded(identity) {
        return Err(ApiError::QuotaExceeded(state.limiter.status(identity)));
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            ApiError::MalformedRequest(multipart::MultipartError::NotMultipart.to_string())
        })?;

    let boundary = multipart::boundary_from_content_type(content_type)
        .map_err(|e| ApiError::MalformedRequest(e.to_string()))?;

    let body = read_body(body, state.config.server.max_body_bytes.as_usize()).await?;
    let form = multipart::decode(&body, &boundary);
    let request = validate_form(form).map_err(|e| ApiError::MalformedRequest(e.to_string()))?;

    let image = state
        .upstream
        .generate(
            request.image,
            &request.file_name,
            &request.content_type,
            &request.username,
        )
        .await
        .map_err(|e| ApiError::UpstreamFailure(e.to_string()))?;

    let status = state.limiter.increment(identity);
    info!(
        %identity,
        username = %request.username,
        count = status.count,
        remaining = status.remaining,
        size = image.len(),
        "Image generated"
    );

    let filename = generated_filename(&request.username, Utc::now());
    let mut response = image_response(image, &filename)?;
    insert_rate_limit_headers(response.headers_mut(), &status)?;
    Ok(response)
}

/// Image download proxy (`/api/download?imageUrl=...&filename=...`)
///
/// Not subject to the quota.
pub async fn download(State(state): State<AppState>, request: Request) -> Response {
    let (parts, _body) = request.into_parts();

    if parts.method == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }

    if parts.method != Method::GET {
        return ApiError::MethodNotAllowed.into_response();
    }

    match download_image(&state, &parts.uri).await {
        Ok(response) => {
            state.metrics.download_served();
            response
        }
        Err(err) => {
            state.metrics.download_failed();
            warn!(error = %err, "Download rejected");
            err.into_response()
        }
    }
}

async fn download_image(state: &AppState, uri: &Uri) -> Result<Response, ApiError> {
    let Query(params) = Query::<DownloadParams>::try_from_uri(uri)
        .map_err(|e| ApiError::MalformedRequest(e.body_text()))?;

    let url = params
        .image_url
        .filter(|url| !url.is_empty())
        .ok_or_else(|| ApiError::MalformedRequest("Image URL required".to_string()))?;

    let filename = params
        .filename
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| state.config.download.default_filename.clone());

    let image = state
        .upstream
        .fetch(&url)
        .await
        .map_err(|e| ApiError::FetchFailed(e.to_string()))?;

    info!(%url, size = image.len(), "Image proxied for download");
    image_response(image, &filename)
}

/// Health check endpoint (GET /health)
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let response = HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        tracked_identities: state.limiter.tracked(),
        counters: state.metrics.snapshot(),
    };

    (StatusCode::OK, Json(response))
}

/// Buffers the request body, failing once it grows past `max_size`.
async fn read_body(body: Body, max_size: usize) -> Result<Bytes, ApiError> {
    let collected = Limited::new(body, max_size).collect().await.map_err(|err| {
        if err.downcast_ref::<LengthLimitError>().is_some() {
            ApiError::PayloadTooLarge(max_size)
        } else {
            ApiError::Internal(err.to_string())
        }
    })?;

    Ok(collected.to_bytes())
}

fn image_response(image: Bytes, filename: &str) -> Result<Response, ApiError> {
    let mut response = Response::new(Body::from(image));
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(IMAGE_PNG));
    headers.insert(header::CONTENT_DISPOSITION, attachment_disposition(filename)?);
    Ok(response)
}

fn insert_rate_limit_headers(
    headers: &mut HeaderMap,
    status: &RateLimitStatus,
) -> Result<(), ApiError> {
    let reset = HeaderValue::from_str(&status.reset_at_rfc3339())
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    headers.insert(RATE_LIMIT_LIMIT, HeaderValue::from(status.limit));
    headers.insert(RATE_LIMIT_REMAINING, HeaderValue::from(status.remaining));
    headers.insert(RATE_LIMIT_RESET, reset);
    Ok(())
}

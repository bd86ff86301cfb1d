//! Permissive cross-origin headers, added to every response of an endpoint

use axum::http::{HeaderMap, HeaderValue, Response, header};

const ALLOW_HEADERS: &str = "X-CSRF-Token, X-Requested-With, Accept, Accept-Version, \
Content-Length, Content-MD5, Content-Type, Date, X-Api-Version";

pub const GENERATE_METHODS: &str = "GET,OPTIONS,PATCH,DELETE,POST,PUT";
pub const DOWNLOAD_METHODS: &str = "GET,OPTIONS";

fn apply(headers: &mut HeaderMap, methods: &'static str) {
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(methods),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
}

pub async fn generate_headers<B>(mut response: Response<B>) -> Response<B> {
    apply(response.headers_mut(), GENERATE_METHODS);
    response
}

pub async fn download_headers<B>(mut response: Response<B>) -> Response<B> {
    apply(response.headers_mut(), DOWNLOAD_METHODS);
    response
}

//! API utility functions
//!
//! Pure, stateless helpers for request inspection and response headers.

use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, HeaderValue};
use chrono::{DateTime, Utc};
use std::net::SocketAddr;

use crate::api::error::ApiError;

const FORWARDED_FOR: &str = "x-forwarded-for";
const REAL_IP: &str = "x-real-ip";
/// Shared bucket for clients with no usable address
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Resolves the rate-limit identity of a request.
///
/// Priority: first `X-Forwarded-For` entry, `X-Real-IP`, the peer address, then
/// [`UNKNOWN_CLIENT`].
pub fn client_identity(
    headers: &HeaderMap,
    peer: Option<&ConnectInfo<SocketAddr>>,
) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    };

    header(FORWARDED_FOR)
        .and_then(|list| list.split(',').next())
        .map(str::trim)
        .filter(|first| !first.is_empty())
        .or_else(|| header(REAL_IP))
        .map(str::to_owned)
        .or_else(|| peer.map(|ConnectInfo(addr)| addr.ip().to_string()))
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// Replaces characters that cannot appear inside a quoted header parameter.
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect()
}

/// `attachment; filename="<name>"` with the name sanitized
pub fn attachment_disposition(filename: &str) -> Result<HeaderValue, ApiError> {
    HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        sanitize_filename(filename)
    ))
    .map_err(|e| ApiError::Internal(format!("invalid Content-Disposition: {}", e)))
}

/// `FakeML_<username>_<unix millis>.png`
pub fn generated_filename(username: &str, now: DateTime<Utc>) -> String {
    format!("FakeML_{}_{}.png", username, now.timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(*value));
        }
        map
    }

    fn peer() -> ConnectInfo<SocketAddr> {
        ConnectInfo(SocketAddr::from(([192, 168, 1, 7], 51000)))
    }

    #[test]
    fn test_identity_prefers_first_forwarded_entry() {
        let map = headers(&[
            ("x-forwarded-for", " 203.0.113.5 , 10.0.0.1"),
            ("x-real-ip", "198.51.100.2"),
        ]);
        assert_eq!(client_identity(&map, Some(&peer())), "203.0.113.5");
    }

    #[test]
    fn test_identity_falls_back_to_real_ip() {
        let map = headers(&[("x-forwarded-for", ""), ("x-real-ip", "198.51.100.2")]);
        assert_eq!(client_identity(&map, Some(&peer())), "198.51.100.2");
    }

    #[test]
    fn test_identity_falls_back_to_peer_then_unknown() {
        let map = HeaderMap::new();
        assert_eq!(client_identity(&map, Some(&peer())), "192.168.1.7");
        assert_eq!(client_identity(&map, None), UNKNOWN_CLIENT);
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("FakeML.png"), "FakeML.png");
        assert_eq!(sanitize_filename("a\"b\\c.png"), "a_b_c.png");
        assert_eq!(sanitize_filename("héllo\r\n.png"), "h_llo__.png");
    }

    #[test]
    fn test_attachment_disposition() {
        let value = attachment_disposition("my file.png").unwrap();
        assert_eq!(value, "attachment; filename=\"my file.png\"");
    }

    #[test]
    fn test_generated_filename() {
        let now = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();
        assert_eq!(generated_filename("alice", now), "FakeML_alice_1700000000123.png");
    }
}

//! HTTP client for the image-processing API and the download proxy

use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{DownloadConfig, UpstreamConfig};
use crate::multipart::{IMAGE_FIELD, USERNAME_FIELD};

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Upstream responded with HTTP {0}")]
    Status(u16),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to build HTTP client: {0}")]
    Build(String),
}

pub type Result<T> = std::result::Result<T, UpstreamError>;

/// Outbound calls: image generation and arbitrary image fetches.
///
/// No retries: a single failure is reported to the caller as-is.
pub struct UpstreamClient {
    client: Client,
    generate_url: String,
    generate_timeout: Duration,
    fetch_timeout: Duration,
}

impl UpstreamClient {
    pub fn new(upstream: &UpstreamConfig, download: &DownloadConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(upstream.connect_timeout())
            .user_agent(&upstream.user_agent)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| UpstreamError::Build(e.to_string()))?;

        Ok(Self {
            client,
            generate_url: upstream.generate_url.clone(),
            generate_timeout: upstream.timeout(),
            fetch_timeout: download.timeout(),
        })
    }

    /// Submits the image and username as `multipart/form-data` and returns the rendered image.
    pub async fn generate(
        &self,
        image: Bytes,
        file_name: &str,
        content_type: &str,
        username: &str,
    ) -> Result<Bytes> {
        let image_part = Part::bytes(image.to_vec())
            .file_name(file_name.to_string())
            .mime_str(content_type)
            .map_err(|e| UpstreamError::RequestFailed(format!("Invalid image type: {}", e)))?;

        let form = Form::new()
            .part(IMAGE_FIELD, image_part)
            .text(USERNAME_FIELD, username.to_string());

        let request = self
            .client
            .post(&self.generate_url)
            .multipart(form)
            .timeout(self.generate_timeout);

        debug!(url = %self.generate_url, username, "Submitting image to upstream");
        send(request, &self.generate_url).await
    }

    /// Downloads `url` in full.
    pub async fn fetch(&self, url: &str) -> Result<Bytes> {
        let parsed =
            reqwest::Url::parse(url).map_err(|e| UpstreamError::InvalidUrl(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(UpstreamError::InvalidUrl(format!(
                "unsupported scheme '{}'",
                parsed.scheme()
            )));
        }

        let request = self.client.get(parsed).timeout(self.fetch_timeout);
        send(request, url).await
    }
}

async fn send(request: RequestBuilder, url: &str) -> Result<Bytes> {
    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            UpstreamError::Timeout
        } else {
            UpstreamError::RequestFailed(e.to_string())
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        warn!(url, status = status.as_u16(), "Upstream returned non-success status");
        return Err(UpstreamError::Status(status.as_u16()));
    }

    let bytes = response.bytes().await.map_err(|e| {
        if e.is_timeout() {
            UpstreamError::Timeout
        } else {
            UpstreamError::RequestFailed(format!("Failed to read body: {}", e))
        }
    })?;

    debug!(url, size = bytes.len(), "Upstream response received");
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn client() -> UpstreamClient {
        let config = Config::default();
        UpstreamClient::new(&config.upstream, &config.download).unwrap()
    }

    #[test]
    fn test_client_picks_up_config() {
        let client = client();
        assert_eq!(client.generate_timeout, Duration::from_secs(30));
        assert_eq!(client.fetch_timeout, Duration::from_secs(30));
        assert!(client.generate_url.ends_with("/api/maker/fakeml"));
    }

    #[tokio::test]
    async fn test_fetch_rejects_bad_urls() {
        let client = client();

        assert!(matches!(
            client.fetch("not a url").await,
            Err(UpstreamError::InvalidUrl(_))
        ));
        assert!(matches!(
            client.fetch("file:///etc/passwd").await,
            Err(UpstreamError::InvalidUrl(_))
        ));
    }
}

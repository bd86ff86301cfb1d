use super::models::Config;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Value must be positive: {field}")]
    NotPositive { field: &'static str },

    #[error("Upstream URL '{url}' must use http:// or https://")]
    InvalidUpstreamUrl { url: String },

    #[error("Default download filename must not be empty")]
    EmptyDownloadFilename,
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_server(config)?;
    validate_rate_limit(config)?;
    validate_upstream(config)?;
    validate_download(config)?;
    Ok(())
}

fn validate_server(config: &Config) -> Result<(), ValidationError> {
    if config.server.max_body_bytes.as_u64() == 0 {
        return Err(ValidationError::NotPositive {
            field: "server.max_body_bytes",
        });
    }
    Ok(())
}

fn validate_rate_limit(config: &Config) -> Result<(), ValidationError> {
    let limits = &config.rate_limit;
    if limits.daily_limit == 0 {
        return Err(ValidationError::NotPositive {
            field: "rate_limit.daily_limit",
        });
    }
    if limits.window_secs == 0 {
        return Err(ValidationError::NotPositive {
            field: "rate_limit.window_secs",
        });
    }
    if limits.sweep_interval_secs == 0 {
        return Err(ValidationError::NotPositive {
            field: "rate_limit.sweep_interval_secs",
        });
    }
    Ok(())
}

fn validate_upstream(config: &Config) -> Result<(), ValidationError> {
    let upstream = &config.upstream;
    let url = &upstream.generate_url;
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ValidationError::InvalidUpstreamUrl {
            url: url.clone(),
        });
    }
    if upstream.timeout_secs == 0 {
        return Err(ValidationError::NotPositive {
            field: "upstream.timeout_secs",
        });
    }
    if upstream.connect_timeout_secs == 0 {
        return Err(ValidationError::NotPositive {
            field: "upstream.connect_timeout_secs",
        });
    }
    Ok(())
}

fn validate_download(config: &Config) -> Result<(), ValidationError> {
    if config.download.default_filename.trim().is_empty() {
        return Err(ValidationError::EmptyDownloadFilename);
    }
    if config.download.timeout_secs == 0 {
        return Err(ValidationError::NotPositive {
            field: "download.timeout_secs",
        });
    }
    Ok(())
}

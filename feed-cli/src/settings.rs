use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use feed_client::{DEFAULT_API_URL, DEFAULT_USER_NAME};

#[derive(Debug, Clone)]
pub struct Settings {
    pub api_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub user_name: String,
    pub log_level: String,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let api_url = non_blank(std::env::var("FEED_API_URL").ok())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let connect_timeout_secs = parse_secs(
            "FEED_CONNECT_TIMEOUT_SECS",
            std::env::var("FEED_CONNECT_TIMEOUT_SECS").ok(),
            5,
        )?;
        let request_timeout_secs = parse_secs(
            "FEED_REQUEST_TIMEOUT_SECS",
            std::env::var("FEED_REQUEST_TIMEOUT_SECS").ok(),
            15,
        )?;
        let user_name = non_blank(std::env::var("FEED_USER_NAME").ok())
            .unwrap_or_else(|| DEFAULT_USER_NAME.to_string());
        let log_level = std::env::var("LOG_LEVEL")
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            api_url,
            connect_timeout: Duration::from_secs(connect_timeout_secs),
            request_timeout: Duration::from_secs(request_timeout_secs),
            user_name,
            log_level,
        })
    }
}

fn non_blank(raw: Option<String>) -> Option<String> {
    let value = raw?.trim().to_string();
    if value.is_empty() {
        return None;
    }
    Some(value)
}

fn parse_secs(key: &str, raw: Option<String>, default: u64) -> Result<u64> {
    let value = match non_blank(raw) {
        Some(raw) => raw
            .parse::<u64>()
            .with_context(|| format!("Failed to parse {key}, expecting positive integer"))?,
        None => default,
    };

    if value == 0 {
        return Err(anyhow!("{key} must be > 0"));
    }
    Ok(value)
}

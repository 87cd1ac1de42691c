//! Tracker configuration loaded from environment variables

use std::env;

pub const DEFAULT_TRACKED_DOMAIN: &str = "en.wikipedia.org";
pub const DEFAULT_BACKFILL_URL: &str = "http://localhost:8080/edits";
pub const DEFAULT_STREAM_URL: &str = "https://stream.wikimedia.org/v2/stream/recentchange";

/// Runtime configuration for the tracker
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub tracked_domain: String,
    pub backfill_url: String,
    pub stream_url: String,
    pub skip_backfill: bool,
    pub reconnect_max_retries: u32,
    pub reconnect_initial_delay_secs: u64,
    pub reconnect_max_delay_secs: u64,
    pub summary_top_n: usize,
    pub rust_log: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue(msg) => write!(f, "Invalid configuration value: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl TrackerConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `TRACKED_DOMAIN` (default: en.wikipedia.org)
    /// - `BACKFILL_URL` (default: http://localhost:8080/edits)
    /// - `STREAM_URL` (default: https://stream.wikimedia.org/v2/stream/recentchange)
    /// - `SKIP_BACKFILL` (default: false; accepts true/false, 1/0, yes/no)
    /// - `RECONNECT_MAX_RETRIES` (default: 0, stream end is final)
    /// - `RECONNECT_INITIAL_DELAY_SECS` (default: 5)
    /// - `RECONNECT_MAX_DELAY_SECS` (default: 60)
    /// - `SUMMARY_TOP_N` (default: 10)
    /// - `RUST_LOG` (default: info)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let tracked_domain = lookup("TRACKED_DOMAIN")
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|| DEFAULT_TRACKED_DOMAIN.to_string());

        if tracked_domain.is_empty() {
            return Err(ConfigError::InvalidValue(
                "TRACKED_DOMAIN cannot be empty".to_string(),
            ));
        }

        let backfill_url = lookup("BACKFILL_URL").unwrap_or_else(|| DEFAULT_BACKFILL_URL.to_string());
        validate_url("BACKFILL_URL", &backfill_url)?;

        let stream_url = lookup("STREAM_URL").unwrap_or_else(|| DEFAULT_STREAM_URL.to_string());
        validate_url("STREAM_URL", &stream_url)?;

        let skip_backfill = parse_flag_or("SKIP_BACKFILL", &lookup, false)?;

        let reconnect_max_retries = parse_or("RECONNECT_MAX_RETRIES", &lookup, 0)?;
        let reconnect_initial_delay_secs = parse_or("RECONNECT_INITIAL_DELAY_SECS", &lookup, 5)?;
        let reconnect_max_delay_secs = parse_or("RECONNECT_MAX_DELAY_SECS", &lookup, 60)?;
        let summary_top_n = parse_or("SUMMARY_TOP_N", &lookup, 10)?;

        let rust_log = lookup("RUST_LOG").unwrap_or_else(|| "info".to_string());

        Ok(Self {
            tracked_domain,
            backfill_url,
            stream_url,
            skip_backfill,
            reconnect_max_retries,
            reconnect_initial_delay_secs,
            reconnect_max_delay_secs,
            summary_top_n,
            rust_log,
        })
    }
}

fn validate_url(var: &str, url: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::InvalidValue(format!(
            "{} must start with http:// or https://",
            var
        )));
    }
    Ok(())
}

fn parse_or<T, F>(var: &str, lookup: &F, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue(format!("{}='{}' is not a valid number", var, raw))),
        None => Ok(default),
    }
}

fn parse_flag_or<F>(var: &str, lookup: &F, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(var) else {
        return Ok(default);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue(format!(
            "{}='{}' is not a valid boolean",
            var, raw
        ))),
    }
}

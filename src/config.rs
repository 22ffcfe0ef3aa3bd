//! Environment-driven configuration.
//!
//! `DATABASE_URI` and `ACCRUAL_SYSTEM_ADDRESS` are required; everything
//! else carries a default. Durations accept `30s`, `10m`, `3h` or bare
//! seconds.

use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

const DEFAULT_RUN_ADDRESS: &str = "0.0.0.0:8080";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_QUEUE_SIZE: usize = 100;
const DEFAULT_WORKER_COUNT: usize = 5;
const DEFAULT_WORKER_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_JWT_EXPIRY: Duration = Duration::from_secs(3 * 3600);

#[derive(Debug, Clone)]
pub struct Config {
    pub run_address: String,
    pub database_uri: String,
    pub accrual_address: String,
    pub log_level: String,
    pub secret_key: String,
    pub jwt_expiry: Duration,
    pub queue_size: usize,
    pub worker_count: usize,
    pub worker_timeout: Duration,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        let config = Self {
            run_address: env_or("RUN_ADDRESS", DEFAULT_RUN_ADDRESS),
            database_uri: env::var("DATABASE_URI").unwrap_or_default(),
            accrual_address: env::var("ACCRUAL_SYSTEM_ADDRESS").unwrap_or_default(),
            log_level: env_or("LOG_LEVEL", DEFAULT_LOG_LEVEL),
            secret_key: env::var("SECRET_KEY").unwrap_or_default(),
            jwt_expiry: env_duration("JWT_EXPIRY", DEFAULT_JWT_EXPIRY)?,
            queue_size: env_parse("WORKER_QUEUE_SIZE", DEFAULT_QUEUE_SIZE)?,
            worker_count: env_parse("WORKER_COUNT", DEFAULT_WORKER_COUNT)?,
            worker_timeout: env_duration("WORKER_TIMEOUT", DEFAULT_WORKER_TIMEOUT)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration at startup; any failure aborts the process.
    pub fn validate(&self) -> Result<()> {
        if self.database_uri.is_empty() {
            anyhow::bail!("DATABASE_URI is required");
        }
        if self.accrual_address.is_empty() {
            anyhow::bail!("ACCRUAL_SYSTEM_ADDRESS is required");
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            anyhow::bail!(
                "Invalid LOG_LEVEL '{}': must be one of {:?}",
                self.log_level,
                valid_levels
            );
        }

        if self.queue_size == 0 {
            anyhow::bail!("Invalid WORKER_QUEUE_SIZE: must be > 0");
        }
        if self.worker_count == 0 {
            anyhow::bail!("Invalid WORKER_COUNT: must be > 0");
        }
        if self.worker_timeout.is_zero() {
            anyhow::bail!("Invalid WORKER_TIMEOUT: must be > 0");
        }

        Ok(())
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) if !raw.is_empty() => raw
            .parse::<T>()
            .with_context(|| format!("invalid {key} value '{raw}'")),
        _ => Ok(default),
    }
}

fn env_duration(key: &str, default: Duration) -> Result<Duration> {
    match env::var(key) {
        Ok(raw) if !raw.is_empty() => {
            parse_duration(&raw).map_err(|e| anyhow::anyhow!("invalid {key} value '{raw}': {e}"))
        }
        _ => Ok(default),
    }
}

/// Parse `30s` / `10m` / `3h` / bare-seconds duration strings.
pub(crate) fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration".to_string());
    }

    let (value, unit) = match s.char_indices().find(|(_, c)| !c.is_ascii_digit()) {
        Some((idx, _)) => s.split_at(idx),
        None => (s, "s"),
    };

    let value: u64 = value
        .parse()
        .map_err(|_| format!("bad numeric part in '{s}'"))?;

    let secs = match unit {
        "s" => value,
        "m" => value * 60,
        "h" => value * 3600,
        other => return Err(format!("unknown duration unit '{other}'")),
    };

    if secs == 0 {
        return Err("duration must be positive".to_string());
    }

    Ok(Duration::from_secs(secs))
}

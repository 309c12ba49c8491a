//! Engine configuration from environment variables.
//!
//! Everything has a default; a bare `cargo run` gets a working engine with
//! a local database and log-only delivery. Deployments override through
//! the environment (or a `.env` file in development).
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `DUEWATCH_DATABASE_PATH` | `duewatch.db` | SQLite file |
//! | `DUEWATCH_LOG_LEVEL` | `info` | Filter when `RUST_LOG` is unset |
//! | `DUEWATCH_EVAL_INTERVAL` | `1h` | Time between evaluation cycles |
//! | `DUEWATCH_STARTUP_JITTER` | `0` | Random delay cap before the first cycle |
//! | `DUEWATCH_DELIVERY_TIMEOUT` | `10s` | Bound on one delivery call |
//! | `DUEWATCH_ALERT_LIMIT` | `25` | Alert cap per user per cycle |
//! | `DUEWATCH_UTC_OFFSET_MINUTES` | `0` | Shift applied when deriving the calendar day |
//! | `DUEWATCH_WEBHOOK_URL` | unset | Delivery endpoint; log-only when unset |
//! | `DUEWATCH_TEMPLATES_PATH` | unset | Template YAML; built-ins when unset |
//! | `DUEWATCH_SENT_RETENTION_DAYS` | `60` | Sent-log retention after a deadline passes |

use std::env;
use std::time::Duration;

use anyhow::{anyhow, Result};

/// Runtime configuration for the reminder engine.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    pub log_level: String,
    pub eval_interval: Duration,
    pub startup_jitter: Duration,
    pub delivery_timeout: Duration,
    pub alert_limit: usize,
    pub utc_offset_minutes: i32,
    pub webhook_url: Option<String>,
    pub templates_path: Option<String>,
    pub sent_retention_days: i64,
}

impl Config {
    /// Build configuration from the environment, validating as it goes.
    pub fn from_env() -> Result<Self> {
        let database_path = string_var("DUEWATCH_DATABASE_PATH", "duewatch.db");
        let log_level = string_var("DUEWATCH_LOG_LEVEL", "info");

        let eval_interval = duration_var("DUEWATCH_EVAL_INTERVAL", Duration::from_secs(3600))?;
        if eval_interval.is_zero() {
            return Err(anyhow!("DUEWATCH_EVAL_INTERVAL must be nonzero"));
        }
        let startup_jitter = duration_var("DUEWATCH_STARTUP_JITTER", Duration::ZERO)?;
        let delivery_timeout = duration_var("DUEWATCH_DELIVERY_TIMEOUT", Duration::from_secs(10))?;

        let alert_limit = int_var("DUEWATCH_ALERT_LIMIT", 25)?;
        if alert_limit == 0 {
            return Err(anyhow!("DUEWATCH_ALERT_LIMIT must be at least 1"));
        }

        let utc_offset_minutes: i32 = int_var("DUEWATCH_UTC_OFFSET_MINUTES", 0)?;
        if !(-840..=840).contains(&utc_offset_minutes) {
            return Err(anyhow!(
                "DUEWATCH_UTC_OFFSET_MINUTES out of range: {utc_offset_minutes} (expected -840 to 840)"
            ));
        }

        let sent_retention_days: i64 = int_var("DUEWATCH_SENT_RETENTION_DAYS", 60)?;
        if sent_retention_days < 1 {
            return Err(anyhow!("DUEWATCH_SENT_RETENTION_DAYS must be at least 1"));
        }

        let webhook_url = optional_var("DUEWATCH_WEBHOOK_URL");
        if let Some(ref url) = webhook_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(anyhow!("DUEWATCH_WEBHOOK_URL must be an http(s) URL: {url}"));
            }
        }

        Ok(Config {
            database_path,
            log_level,
            eval_interval,
            startup_jitter,
            delivery_timeout,
            alert_limit,
            utc_offset_minutes,
            webhook_url,
            templates_path: optional_var("DUEWATCH_TEMPLATES_PATH"),
            sent_retention_days,
        })
    }
}

fn string_var(name: &str, default: &str) -> String {
    optional_var(name).unwrap_or_else(|| default.to_string())
}

/// Unset and blank both mean "not configured"
fn optional_var(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Some(value.trim().to_string()),
        _ => None,
    }
}

fn int_var<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
{
    match optional_var(name) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| anyhow!("{name} is not a valid number: {raw}")),
        None => Ok(default),
    }
}

fn duration_var(name: &str, default: Duration) -> Result<Duration> {
    match optional_var(name) {
        Some(raw) => parse_duration(&raw)
            .map(Duration::from_secs)
            .ok_or_else(|| anyhow!("{name} is not a duration: {raw} (use forms like 90s, 30m, 2h, 1d)")),
        None => Ok(default),
    }
}

/// Parse compact duration text like `30m`, `2h`, `1h30m`, or plain seconds
/// like `45`. Returns total seconds; `0` is valid and means disabled.
pub fn parse_duration(text: &str) -> Option<u64> {
    let text = text.trim().to_lowercase();
    if text.is_empty() {
        return None;
    }
    if let Ok(seconds) = text.parse::<u64>() {
        return Some(seconds);
    }

    let mut total: u64 = 0;
    let mut number = String::new();
    for c in text.chars() {
        if c.is_ascii_digit() {
            number.push(c);
            continue;
        }
        if number.is_empty() {
            return None;
        }
        let value: u64 = number.parse().ok()?;
        number.clear();
        total += value
            * match c {
                's' => 1,
                'm' => 60,
                'h' => 3600,
                'd' => 86_400,
                'w' => 604_800,
                _ => return None,
            };
    }
    // Trailing digits without a unit make the whole thing ambiguous
    if !number.is_empty() {
        return None;
    }
    Some(total)
}

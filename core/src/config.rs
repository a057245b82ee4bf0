//! Engine tuning knobs.
//!
//! Values come from `Config::default()`, a serde source, or the process
//! environment. Invalid environment values are logged and ignored.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const RETRY_BASE_DELAY_ENV: &str = "REQUEST_CORE_RETRY_BASE_DELAY_MS";
pub const MAX_REDIRECTS_ENV: &str = "REQUEST_CORE_MAX_REDIRECTS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base of the exponential backoff between attempts.
    pub retry_base_delay_ms: u64,
    /// Hop limit applied when redirects are followed.
    pub max_redirects: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            retry_base_delay_ms: 1000,
            max_redirects: 30,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup, falling back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            retry_base_delay_ms: parse_var(&lookup, RETRY_BASE_DELAY_ENV)
                .unwrap_or(defaults.retry_base_delay_ms),
            max_redirects: parse_var(&lookup, MAX_REDIRECTS_ENV)
                .unwrap_or(defaults.max_redirects),
        }
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring invalid configuration value");
            None
        }
    }
}

//! Process configuration, read once at cold start.

use std::time::Duration;

use records_core::contract::PageLimits;
use records_core::retry::RetryPolicy;
use thiserror::Error;

pub const TABLE_NAME_VAR: &str = "DYNAMO_TABLE_NAME";
pub const STORE_TIMEOUT_MS_VAR: &str = "RECORDS_STORE_TIMEOUT_MS";
pub const STORE_MAX_ATTEMPTS_VAR: &str = "RECORDS_STORE_MAX_ATTEMPTS";
pub const STORE_BASE_DELAY_MS_VAR: &str = "RECORDS_STORE_BASE_DELAY_MS";
pub const DEFAULT_PAGE_LIMIT_VAR: &str = "RECORDS_DEFAULT_PAGE_LIMIT";
pub const MAX_PAGE_LIMIT_VAR: &str = "RECORDS_MAX_PAGE_LIMIT";
pub const IGNORE_STAGE_VAR: &str = "RECORDS_IGNORE_STAGE_IN_PATH";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be configured")]
    Missing(&'static str),

    #[error("{name} has invalid value '{value}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    pub table_name: String,
    pub retry: RetryPolicy,
    pub page_limits: PageLimits,
    pub ignore_stage_in_path: bool,
}

impl RuntimeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let table_name = lookup(TABLE_NAME_VAR)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or(ConfigError::Missing(TABLE_NAME_VAR))?;

        let defaults = RetryPolicy::default();
        let timeout_ms = parse_or(
            &lookup,
            STORE_TIMEOUT_MS_VAR,
            defaults.attempt_timeout.as_millis() as u64,
        )?;
        let max_attempts = parse_or(&lookup, STORE_MAX_ATTEMPTS_VAR, defaults.max_attempts)?;
        let base_delay_ms = parse_or(
            &lookup,
            STORE_BASE_DELAY_MS_VAR,
            defaults.base_delay.as_millis() as u64,
        )?;
        if timeout_ms == 0 {
            return Err(invalid(STORE_TIMEOUT_MS_VAR, timeout_ms, "must be positive"));
        }
        if max_attempts == 0 {
            return Err(invalid(STORE_MAX_ATTEMPTS_VAR, max_attempts, "must be positive"));
        }

        let page_defaults = PageLimits::default();
        let default_limit = parse_or(&lookup, DEFAULT_PAGE_LIMIT_VAR, page_defaults.default_limit)?;
        let max_limit = parse_or(&lookup, MAX_PAGE_LIMIT_VAR, page_defaults.max_limit)?;
        if max_limit == 0 {
            return Err(invalid(MAX_PAGE_LIMIT_VAR, max_limit, "must be positive"));
        }
        if default_limit == 0 || default_limit > max_limit {
            return Err(invalid(
                DEFAULT_PAGE_LIMIT_VAR,
                default_limit,
                "must be between 1 and the max page limit",
            ));
        }

        let ignore_stage_in_path = parse_or(&lookup, IGNORE_STAGE_VAR, true)?;

        Ok(Self {
            table_name,
            retry: RetryPolicy {
                max_attempts,
                base_delay: Duration::from_millis(base_delay_ms),
                attempt_timeout: Duration::from_millis(timeout_ms),
                ..defaults
            },
            page_limits: PageLimits {
                default_limit,
                max_limit,
            },
            ignore_stage_in_path,
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name).map(|value| value.trim().to_string()) {
        None => Ok(default),
        Some(value) if value.is_empty() => Ok(default),
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
            name,
            value,
            reason: "could not be parsed",
        }),
    }
}

fn invalid(name: &'static str, value: impl ToString, reason: &'static str) -> ConfigError {
    ConfigError::Invalid {
        name,
        value: value.to_string(),
        reason,
    }
}

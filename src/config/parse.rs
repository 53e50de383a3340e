//! Value parsers for environment configuration.

use std::collections::HashSet;
use std::time::Duration;

use crate::error::ConfigError;

/// Trimmed value, or `None` when unset or blank.
pub(super) fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub(super) fn flag(
    key: &'static str,
    value: Option<String>,
    default: bool,
) -> Result<bool, ConfigError> {
    let Some(raw) = non_empty(value) else {
        return Ok(default);
    };

    match raw.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: raw,
            expected: "a boolean",
        }),
    }
}

pub(super) fn count(
    key: &'static str,
    value: Option<String>,
    default: usize,
) -> Result<usize, ConfigError> {
    match non_empty(value) {
        Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
            key,
            value: raw,
            expected: "a non-negative integer",
        }),
        None => Ok(default),
    }
}

/// Seconds as a float, so sub-second intervals can be configured.
pub(super) fn seconds(
    key: &'static str,
    value: Option<String>,
    default: Duration,
) -> Result<Duration, ConfigError> {
    let Some(raw) = non_empty(value) else {
        return Ok(default);
    };

    raw.parse::<f64>()
        .ok()
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .ok_or(ConfigError::Invalid {
            key,
            value: raw,
            expected: "a non-negative number of seconds",
        })
}

/// Comma separated list with blanks dropped.
pub(super) fn list(value: Option<String>) -> Vec<String> {
    value
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub(super) fn set(value: Option<String>) -> HashSet<String> {
    list(value).into_iter().collect()
}

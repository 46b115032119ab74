//! CLI parsing helpers for clap value parsers.

use serde_json::Value;

use super::Assignment;

/// Largest accepted AJAX timeout, in milliseconds.
const MAX_AJAX_TIMEOUT_MS: u64 = 600_000;

pub(super) fn parse_timeout_ms(s: &str) -> Result<u64, String> {
    let value: u64 = s
        .trim()
        .parse()
        .map_err(|_| format!("{s} is not a valid number of milliseconds"))?;
    check_timeout_ms(value)
}

/// Bounds shared by the flag parser and merged configuration.
pub(super) fn check_timeout_ms(value: u64) -> Result<u64, String> {
    if (1..=MAX_AJAX_TIMEOUT_MS).contains(&value) {
        Ok(value)
    } else {
        Err(format!(
            "timeout must be between 1 and {MAX_AJAX_TIMEOUT_MS} milliseconds"
        ))
    }
}

/// Parse `KEY=VALUE`. The value is read as JSON when it parses, otherwise it
/// is kept as a string.
pub(super) fn parse_assignment(s: &str) -> Result<Assignment, String> {
    let (key, raw) = s
        .split_once('=')
        .ok_or_else(|| format!("'{s}' is not a KEY=VALUE pair"))?;
    let trimmed_key = key.trim();
    if trimmed_key.is_empty() {
        return Err(format!("'{s}' has an empty key"));
    }
    let value = serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::from(raw));
    Ok(Assignment {
        key: trimmed_key.to_owned(),
        value,
    })
}

pub(super) fn parse_non_empty(s: &str) -> Result<String, String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        Err("value must not be empty".to_owned())
    } else {
        Ok(trimmed.to_owned())
    }
}

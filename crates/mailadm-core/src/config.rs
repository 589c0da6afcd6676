//! Environment reading helpers shared by the per-crate configuration types.
//!
//! Every configuration type in mailadm is loaded through a reader closure of
//! the shape `Fn(&str) -> Result<String, VarError>`, so tests can supply
//! variables without mutating process-global environment state.

use std::env::VarError;
use std::str::FromStr;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(String),

    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Read a required variable; blank values count as missing.
pub fn required<F>(reader: &F, key: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Result<String, VarError>,
{
    match reader(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(ConfigError::MissingVar(key.to_string())),
    }
}

/// Read an optional variable, falling back to `default` when unset.
pub fn or_default<F>(reader: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Result<String, VarError>,
{
    reader(key)
        .map(|v| v.trim().to_string())
        .unwrap_or_else(|_| default.to_string())
}

/// Read and parse an optional variable. Unset uses `default`; a value that
/// is present but unparsable is an error naming the variable.
pub fn parsed<F, T>(reader: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Result<String, VarError>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match reader(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}

/// Read a boolean flag. Accepts `true/false`, `yes/no`, `on/off` and `1/0`.
pub fn flag<F>(reader: &F, key: &str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Result<String, VarError>,
{
    let Ok(raw) = reader(key) else {
        return Ok(default);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        other => Err(ConfigError::InvalidValue(
            key.to_string(),
            format!("expected a boolean, got '{other}'"),
        )),
    }
}

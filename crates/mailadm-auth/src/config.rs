//! Hashing and password policy configuration.

use std::env::VarError;

use mailadm_core::config::{self as env, ConfigError};

use crate::policy::PasswordPolicy;
use crate::scheme::Scheme;

/// Default external hashing utility.
pub const DEFAULT_HASH_TOOL: &str = "doveadm";

/// Hash engine settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashConfig {
    /// Scheme used when a caller does not name one.
    pub default_scheme: Scheme,

    /// Write `{SCHEME}` in front of PLAIN, PLAIN-MD5 and external hashes.
    pub use_prefixed_scheme: bool,

    /// Name looked up on `PATH`, or a path to the external hashing utility.
    pub hash_tool: String,
}

impl Default for HashConfig {
    fn default() -> Self {
        Self {
            default_scheme: Scheme::Ssha512,
            use_prefixed_scheme: true,
            hash_tool: DEFAULT_HASH_TOOL.to_string(),
        }
    }
}

impl HashConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_reader(|key| std::env::var(key))
    }

    /// Load configuration from a custom variable reader.
    pub fn from_reader<F>(reader: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Result<String, VarError>,
    {
        let defaults = Self::default();

        let default_scheme = match reader("MAILADM_PASSWORD_DEFAULT_SCHEME") {
            Ok(raw) => raw.parse::<Scheme>().map_err(|e| {
                ConfigError::InvalidValue("MAILADM_PASSWORD_DEFAULT_SCHEME".into(), e.to_string())
            })?,
            Err(_) => defaults.default_scheme,
        };

        Ok(Self {
            default_scheme,
            use_prefixed_scheme: env::flag(
                &reader,
                "MAILADM_PASSWORD_USE_PREFIXED_SCHEME",
                defaults.use_prefixed_scheme,
            )?,
            hash_tool: env::or_default(&reader, "MAILADM_PASSWORD_HASH_TOOL", DEFAULT_HASH_TOOL),
        })
    }
}

impl PasswordPolicy {
    /// Load the policy from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_reader(|key| std::env::var(key))
    }

    /// Load the policy from a custom variable reader.
    pub fn from_reader<F>(reader: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Result<String, VarError>,
    {
        let defaults = Self::default();
        let policy = Self {
            min_length: env::parsed(&reader, "MAILADM_PASSWORD_MIN_LENGTH", defaults.min_length)?,
            max_length: env::parsed(&reader, "MAILADM_PASSWORD_MAX_LENGTH", defaults.max_length)?,
            require_digit: env::flag(
                &reader,
                "MAILADM_PASSWORD_REQUIRE_DIGIT",
                defaults.require_digit,
            )?,
            require_uppercase: env::flag(
                &reader,
                "MAILADM_PASSWORD_REQUIRE_UPPERCASE",
                defaults.require_uppercase,
            )?,
            require_lowercase: env::flag(
                &reader,
                "MAILADM_PASSWORD_REQUIRE_LOWERCASE",
                defaults.require_lowercase,
            )?,
            require_special: env::flag(
                &reader,
                "MAILADM_PASSWORD_REQUIRE_SPECIAL",
                defaults.require_special,
            )?,
        };

        if policy.max_length != 0 && policy.max_length < policy.min_length {
            return Err(ConfigError::InvalidValue(
                "MAILADM_PASSWORD_MAX_LENGTH".into(),
                format!(
                    "{} is below the minimum length {}",
                    policy.max_length, policy.min_length
                ),
            ));
        }

        Ok(policy)
    }
}

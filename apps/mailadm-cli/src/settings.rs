//! Process settings assembled from the per-crate configuration types.

use std::env::VarError;

use mailadm_auth::{HashConfig, PasswordPolicy};
use mailadm_core::ConfigError;
use mailadm_ldap::DirectoryConfig;

/// Settings every command needs. Directory settings are loaded separately
/// by the commands that talk to the directory.
#[derive(Debug, Clone)]
pub struct Settings {
    pub hash: HashConfig,
    pub policy: PasswordPolicy,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_reader(|key| std::env::var(key))
    }

    pub fn from_reader<F>(reader: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Result<String, VarError>,
    {
        Ok(Self {
            hash: HashConfig::from_reader(&reader)?,
            policy: PasswordPolicy::from_reader(&reader)?,
        })
    }

    pub fn directory() -> Result<DirectoryConfig, ConfigError> {
        DirectoryConfig::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mailadm_auth::Scheme;
    use std::collections::HashMap;

    fn make_reader(vars: HashMap<&str, &str>) -> impl Fn(&str) -> Result<String, VarError> {
        let owned: HashMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| owned.get(key).cloned().ok_or(VarError::NotPresent)
    }

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::from_reader(make_reader(HashMap::new())).unwrap();
        assert_eq!(settings.hash.default_scheme, Scheme::Ssha512);
        assert_eq!(settings.policy.min_length, 8);
    }

    #[test]
    fn test_settings_fail_fast_on_bad_value() {
        let err = Settings::from_reader(make_reader(HashMap::from([(
            "MAILADM_PASSWORD_REQUIRE_DIGIT",
            "sometimes",
        )])))
        .unwrap_err();
        assert!(err.to_string().contains("MAILADM_PASSWORD_REQUIRE_DIGIT"));
    }
}

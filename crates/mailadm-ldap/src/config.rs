//! Directory connection configuration.

use std::env::VarError;
use std::time::Duration;

use mailadm_core::config::{self as env, ConfigError};
use url::Url;

/// Default RDN attribute of a domain entry.
pub const DEFAULT_DOMAIN_ATTRIBUTE: &str = "domain";

/// Where and how to reach the directory.
#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    /// `ldap://` or `ldaps://` endpoint.
    pub uri: Url,

    /// Root of the mail tree (e.g. `o=mail,dc=example,dc=com`).
    pub root_dn: String,

    /// Upgrade a plain `ldap://` connection with StartTLS before binding.
    pub starttls: bool,

    /// Verify the server certificate on TLS connections.
    pub tls_verify: bool,

    /// RDN attribute of domain entries (`domain` or `domainName`).
    pub domain_attribute: String,

    pub connect_timeout: Duration,

    /// Upper bound for every individual directory operation.
    pub operation_timeout: Duration,
}

impl DirectoryConfig {
    /// Build a configuration with defaults for everything but the endpoint
    /// and the tree root.
    pub fn new(uri: Url, root_dn: impl Into<String>) -> Self {
        Self {
            uri,
            root_dn: root_dn.into(),
            starttls: false,
            tls_verify: true,
            domain_attribute: DEFAULT_DOMAIN_ATTRIBUTE.to_string(),
            connect_timeout: Duration::from_secs(10),
            operation_timeout: Duration::from_secs(30),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_reader(|key| std::env::var(key))
    }

    /// Load configuration from a custom variable reader.
    pub fn from_reader<F>(reader: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Result<String, VarError>,
    {
        let raw_uri = env::required(&reader, "MAILADM_LDAP_URI")?;
        let uri = Url::parse(&raw_uri)
            .map_err(|e| ConfigError::InvalidValue("MAILADM_LDAP_URI".into(), e.to_string()))?;
        if !matches!(uri.scheme(), "ldap" | "ldaps") {
            return Err(ConfigError::InvalidValue(
                "MAILADM_LDAP_URI".into(),
                format!("unsupported scheme '{}'", uri.scheme()),
            ));
        }

        let root_dn = env::required(&reader, "MAILADM_LDAP_ROOT_DN")?;

        let domain_attribute =
            env::or_default(&reader, "MAILADM_LDAP_DOMAIN_ATTRIBUTE", DEFAULT_DOMAIN_ATTRIBUTE);
        if domain_attribute.is_empty()
            || !domain_attribute
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(ConfigError::InvalidValue(
                "MAILADM_LDAP_DOMAIN_ATTRIBUTE".into(),
                format!("'{domain_attribute}' is not an attribute name"),
            ));
        }

        let connect_timeout_secs: u64 =
            env::parsed(&reader, "MAILADM_LDAP_CONNECT_TIMEOUT_SECS", 10)?;
        let operation_timeout_secs: u64 =
            env::parsed(&reader, "MAILADM_LDAP_OPERATION_TIMEOUT_SECS", 30)?;
        if operation_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "MAILADM_LDAP_OPERATION_TIMEOUT_SECS".into(),
                "must be greater than zero".into(),
            ));
        }

        Ok(Self {
            uri,
            root_dn,
            starttls: env::flag(&reader, "MAILADM_LDAP_STARTTLS", false)?,
            tls_verify: env::flag(&reader, "MAILADM_LDAP_TLS_VERIFY", true)?,
            domain_attribute,
            connect_timeout: Duration::from_secs(connect_timeout_secs),
            operation_timeout: Duration::from_secs(operation_timeout_secs),
        })
    }

    /// True when the endpoint uses implicit TLS.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.uri.scheme() == "ldaps"
    }

    /// StartTLS only applies to plain endpoints.
    #[must_use]
    pub fn use_starttls(&self) -> bool {
        self.starttls && !self.is_secure()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn make_reader(vars: HashMap<&str, &str>) -> impl Fn(&str) -> Result<String, VarError> {
        let owned: HashMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| owned.get(key).cloned().ok_or(VarError::NotPresent)
    }

    fn base_vars() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("MAILADM_LDAP_URI", "ldap://ldap.example.com:389"),
            ("MAILADM_LDAP_ROOT_DN", "o=mail,dc=example,dc=com"),
        ])
    }

    #[test]
    fn test_defaults() {
        let config = DirectoryConfig::from_reader(make_reader(base_vars())).unwrap();
        assert_eq!(config.root_dn, "o=mail,dc=example,dc=com");
        assert_eq!(config.domain_attribute, "domain");
        assert!(!config.starttls);
        assert!(config.tls_verify);
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.operation_timeout, Duration::from_secs(30));
        assert!(!config.is_secure());
    }

    #[test]
    fn test_missing_uri() {
        let mut vars = base_vars();
        vars.remove("MAILADM_LDAP_URI");
        let err = DirectoryConfig::from_reader(make_reader(vars)).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(_)));
        assert!(err.to_string().contains("MAILADM_LDAP_URI"));
    }

    #[test]
    fn test_rejects_http_scheme() {
        let mut vars = base_vars();
        vars.insert("MAILADM_LDAP_URI", "http://ldap.example.com");
        let err = DirectoryConfig::from_reader(make_reader(vars)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(..)));
        assert!(err.to_string().contains("MAILADM_LDAP_URI"));
    }

    #[test]
    fn test_invalid_timeout_names_variable() {
        let mut vars = base_vars();
        vars.insert("MAILADM_LDAP_OPERATION_TIMEOUT_SECS", "soon");
        let err = DirectoryConfig::from_reader(make_reader(vars)).unwrap_err();
        assert!(err
            .to_string()
            .contains("MAILADM_LDAP_OPERATION_TIMEOUT_SECS"));
    }

    #[test]
    fn test_starttls_ignored_for_ldaps() {
        let mut vars = base_vars();
        vars.insert("MAILADM_LDAP_URI", "ldaps://ldap.example.com");
        vars.insert("MAILADM_LDAP_STARTTLS", "true");
        vars.insert("MAILADM_LDAP_DOMAIN_ATTRIBUTE", "domainName");
        let config = DirectoryConfig::from_reader(make_reader(vars)).unwrap();
        assert!(config.is_secure());
        assert!(config.starttls);
        assert!(!config.use_starttls());
        assert_eq!(config.domain_attribute, "domainName");
    }
}

//! Distinguished names for the mail tree.
//!
//! The tree is laid out as
//!
//! ```text
//! <root>
//! └── o=domains
//!     └── domain=<domain>
//!         └── ou=Users
//!             └── mail=<local>@<domain>
//! ```
//!
//! Every untrusted component is escaped per RFC 4514 before it is placed into
//! a DN; nothing in this module performs I/O.

use std::fmt;

use crate::config::{DirectoryConfig, DEFAULT_DOMAIN_ATTRIBUTE};
use crate::error::{DirectoryError, DirectoryResult};

/// An escaped distinguished name.
///
/// Values are produced by [`DnResolver`] or taken verbatim from entries
/// returned by the server; they are never edited afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Dn(String);

impl Dn {
    /// Wrap a DN the server handed back. The value is assumed to be escaped
    /// already.
    pub fn from_server(dn: impl Into<String>) -> Self {
        Dn(dn.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Prefix this DN with one more RDN (`<attr>=<escaped value>,<self>`).
    fn child(&self, attr: &str, value: &str) -> Dn {
        Dn(format!("{attr}={},{}", escape_dn_value(value), self.0))
    }

    /// Prefix with an RDN whose value is already escaped.
    fn child_escaped(&self, attr: &str, escaped: &str) -> Dn {
        Dn(format!("{attr}={escaped},{}", self.0))
    }

    /// Decoded `(attribute, value)` pairs of every RDN, leaf first.
    pub fn rdns(&self) -> DirectoryResult<Vec<(String, String)>> {
        split_rdns(&self.0)
    }
}

impl fmt::Display for Dn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Dn {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Builds DNs for domains and mailboxes below a fixed root.
#[derive(Debug, Clone)]
pub struct DnResolver {
    root: Dn,
    domain_attribute: String,
}

impl DnResolver {
    /// The root DN is trusted configuration and used as-is.
    pub fn new(root: impl Into<String>, domain_attribute: impl Into<String>) -> DirectoryResult<Self> {
        let root = root.into();
        if root.trim().is_empty() {
            return Err(DirectoryError::invalid_input("root DN must not be empty"));
        }
        let domain_attribute = domain_attribute.into();
        Ok(Self {
            root: Dn(root.trim().to_string()),
            domain_attribute: if domain_attribute.is_empty() {
                DEFAULT_DOMAIN_ATTRIBUTE.to_string()
            } else {
                domain_attribute
            },
        })
    }

    pub fn from_config(config: &DirectoryConfig) -> DirectoryResult<Self> {
        Self::new(config.root_dn.clone(), config.domain_attribute.clone())
    }

    /// Configured base of the whole tree.
    #[must_use]
    pub fn root(&self) -> &Dn {
        &self.root
    }

    #[must_use]
    pub fn domain_attribute(&self) -> &str {
        &self.domain_attribute
    }

    /// `o=domains,<root>`
    #[must_use]
    pub fn domains_container(&self) -> Dn {
        self.root.child("o", "domains")
    }

    /// `<domain-attr>=<domain>,o=domains,<root>`
    pub fn domain(&self, domain: &str) -> DirectoryResult<Dn> {
        let domain = non_empty("domain", domain)?;
        Ok(self
            .domains_container()
            .child(&self.domain_attribute, domain))
    }

    /// `ou=Users,<domain dn>`
    pub fn users_container(&self, domain: &str) -> DirectoryResult<Dn> {
        Ok(self.domain(domain)?.child("ou", "Users"))
    }

    /// `mail=<local>@<domain>,ou=Users,<domain dn>`
    ///
    /// Local part and domain are escaped separately; the joining `@` needs
    /// no quoting.
    pub fn user(&self, local_id: &str, domain: &str) -> DirectoryResult<Dn> {
        let local_id = non_empty("local id", local_id)?;
        let container = self.users_container(domain)?;
        let mail = format!("{}@{}", escape_dn_value(local_id), escape_dn_value(domain));
        Ok(container.child_escaped("mail", &mail))
    }

    /// `cn=<name>,<root>`, the bind DN of a root administrator.
    pub fn admin(&self, name: &str) -> DirectoryResult<Dn> {
        let name = non_empty("administrator name", name)?;
        Ok(self.root.child("cn", name))
    }
}

/// Blank values are rejected; anything else is returned untouched so that
/// surrounding spaces get escaped rather than dropped.
fn non_empty<'a>(what: &str, value: &'a str) -> DirectoryResult<&'a str> {
    if value.trim().is_empty() {
        return Err(DirectoryError::invalid_input(format!("{what} must not be empty")));
    }
    Ok(value)
}

/// Escape special characters in DN attribute values per RFC 4514.
///
/// - Leading or trailing SPACE becomes `\20`
/// - Leading `#` becomes `\23`
/// - `, + " \ < > ; =` get a backslash prefix
/// - NUL becomes `\00`
#[must_use]
pub fn escape_dn_value(value: &str) -> String {
    if value.is_empty() {
        return String::new();
    }

    let last = value.chars().count() - 1;
    let mut result = String::with_capacity(value.len() * 2);

    for (i, ch) in value.chars().enumerate() {
        let is_first = i == 0;
        let is_last = i == last;

        match ch {
            ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=' => {
                result.push('\\');
                result.push(ch);
            }
            '\0' => result.push_str("\\00"),
            ' ' if is_first || is_last => result.push_str("\\20"),
            '#' if is_first => result.push_str("\\23"),
            _ => result.push(ch),
        }
    }

    result
}

/// Inverse of [`escape_dn_value`]. Accepts both `\<char>` and `\<hex><hex>`
/// escapes; hex pairs are collected as bytes so escaped multi-byte UTF-8
/// sequences decode correctly.
pub fn unescape_dn_value(value: &str) -> DirectoryResult<String> {
    let mut bytes: Vec<u8> = Vec::with_capacity(value.len());
    let mut chars = value.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            let mut buf = [0u8; 4];
            bytes.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
            continue;
        }

        let Some(first) = chars.next() else {
            return Err(DirectoryError::invalid_input(
                "DN value ends with a dangling escape",
            ));
        };
        match (first.to_digit(16), chars.peek().and_then(|c| c.to_digit(16))) {
            (Some(hi), Some(lo)) => {
                chars.next();
                // Both digits are < 16, so the pair always fits in a byte.
                bytes.push((hi * 16 + lo) as u8);
            }
            _ => {
                let mut buf = [0u8; 4];
                bytes.extend_from_slice(first.encode_utf8(&mut buf).as_bytes());
            }
        }
    }

    String::from_utf8(bytes)
        .map_err(|_| DirectoryError::invalid_input("DN value is not valid UTF-8"))
}

/// Split a DN into decoded `(attribute, value)` pairs, leaf first.
pub fn split_rdns(dn: &str) -> DirectoryResult<Vec<(String, String)>> {
    let mut rdns = Vec::new();
    let mut current = String::new();
    let mut chars = dn.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                current.push(ch);
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            ',' => {
                rdns.push(parse_rdn(&current)?);
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    if !current.is_empty() {
        rdns.push(parse_rdn(&current)?);
    }

    Ok(rdns)
}

/// The leading RDN of `dn`, decoded.
pub fn split_rdn(dn: &str) -> DirectoryResult<(String, String)> {
    split_rdns(dn)?
        .into_iter()
        .next()
        .ok_or_else(|| DirectoryError::invalid_input("empty DN"))
}

fn parse_rdn(rdn: &str) -> DirectoryResult<(String, String)> {
    let (attr, value) = rdn
        .split_once('=')
        .ok_or_else(|| DirectoryError::invalid_input(format!("malformed RDN '{rdn}'")))?;
    let attr = attr.trim();
    if attr.is_empty() {
        return Err(DirectoryError::invalid_input(format!("malformed RDN '{rdn}'")));
    }
    Ok((attr.to_string(), unescape_dn_value(value)?))
}

/// Escape special characters in LDAP filter values (RFC 4515).
#[must_use]
pub fn escape_filter_value(value: &str) -> String {
    value
        .replace('\\', "\\5c")
        .replace('*', "\\2a")
        .replace('(', "\\28")
        .replace(')', "\\29")
        .replace('\0', "\\00")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn resolver() -> DnResolver {
        DnResolver::new("o=mail,dc=example,dc=com", "domain").unwrap()
    }

    #[test]
    fn test_user_dn_scenario() {
        let dn = resolver().user("alice", "example.com").unwrap();
        assert_eq!(
            dn.as_str(),
            "mail=alice@example.com,ou=Users,domain=example.com,o=domains,o=mail,dc=example,dc=com"
        );
    }

    #[test]
    fn test_domain_dn_with_configured_attribute() {
        let resolver = DnResolver::new("o=mail,dc=example,dc=com", "domainName").unwrap();
        assert_eq!(
            resolver.domain("example.com").unwrap().as_str(),
            "domainName=example.com,o=domains,o=mail,dc=example,dc=com"
        );
        assert_eq!(
            resolver.users_container("example.com").unwrap().as_str(),
            "ou=Users,domainName=example.com,o=domains,o=mail,dc=example,dc=com"
        );
    }

    #[test]
    fn test_admin_dn() {
        assert_eq!(
            resolver().admin("vmailadmin").unwrap().as_str(),
            "cn=vmailadmin,o=mail,dc=example,dc=com"
        );
    }

    #[test]
    fn test_surrounding_spaces_are_escaped_not_dropped() {
        let r = resolver();
        let padded = r.user(" alice", "example.com").unwrap();
        assert_ne!(padded, r.user("alice", "example.com").unwrap());
        assert!(padded.as_str().starts_with("mail=\\20alice@example.com,"));
        assert_eq!(padded.rdns().unwrap()[0].1, " alice@example.com");

        let domain = r.domain("example.com ").unwrap();
        assert!(domain.as_str().starts_with("domain=example.com\\20,"));
    }

    #[test]
    fn test_empty_components_rejected() {
        let r = resolver();
        assert!(matches!(
            r.domain(""),
            Err(DirectoryError::InvalidInput { .. })
        ));
        assert!(matches!(
            r.user("  ", "example.com"),
            Err(DirectoryError::InvalidInput { .. })
        ));
        assert!(matches!(
            r.user("alice", ""),
            Err(DirectoryError::InvalidInput { .. })
        ));
        assert!(DnResolver::new("", "domain").is_err());
    }

    #[test]
    fn test_escape_dn_value() {
        assert_eq!(escape_dn_value("simple"), "simple");
        assert_eq!(escape_dn_value("Smith, John"), "Smith\\, John");
        assert_eq!(escape_dn_value("a+b"), "a\\+b");
        assert_eq!(escape_dn_value("x=y"), "x\\=y");
        assert_eq!(escape_dn_value("\"q\""), "\\\"q\\\"");
        assert_eq!(escape_dn_value(" lead"), "\\20lead");
        assert_eq!(escape_dn_value("trail "), "trail\\20");
        assert_eq!(escape_dn_value("#hash"), "\\23hash");
        assert_eq!(escape_dn_value("mid#dle"), "mid#dle");
        assert_eq!(escape_dn_value("nul\0"), "nul\\00");
        assert_eq!(escape_dn_value(""), "");
    }

    #[test]
    fn test_escape_trailing_space_after_multibyte() {
        assert_eq!(escape_dn_value("é "), "é\\20");
    }

    #[test]
    fn test_unescape_hex_and_char_escapes() {
        assert_eq!(unescape_dn_value("\\20lead").unwrap(), " lead");
        assert_eq!(unescape_dn_value("a\\,b").unwrap(), "a,b");
        assert_eq!(unescape_dn_value("\\c3\\a9").unwrap(), "é");
        assert!(unescape_dn_value("oops\\").is_err());
    }

    #[test]
    fn test_comma_components_reparse() {
        let dn = resolver().user("smith, john", "ex,ample.com").unwrap();
        let rdns = dn.rdns().unwrap();
        assert_eq!(rdns[0], ("mail".to_string(), "smith, john@ex,ample.com".to_string()));
        assert_eq!(rdns[1], ("ou".to_string(), "Users".to_string()));
        assert_eq!(rdns[2], ("domain".to_string(), "ex,ample.com".to_string()));
        assert_eq!(rdns.len(), 7);
    }

    #[test]
    fn test_split_rdn() {
        let (attr, value) = split_rdn("domain=example.com,o=domains,o=mail").unwrap();
        assert_eq!(attr, "domain");
        assert_eq!(value, "example.com");
        assert!(split_rdn("").is_err());
        assert!(split_rdn("novalue,o=x").is_err());
    }

    #[test]
    fn test_escape_filter_value() {
        assert_eq!(escape_filter_value("alice"), "alice");
        assert_eq!(escape_filter_value("a*"), "a\\2a");
        assert_eq!(escape_filter_value("(x)"), "\\28x\\29");
        assert_eq!(escape_filter_value("a\\b"), "a\\5cb");
        assert_eq!(escape_filter_value("n\0"), "n\\00");
    }

    proptest! {
        #[test]
        fn prop_escape_round_trip(value in any::<String>()) {
            prop_assert_eq!(unescape_dn_value(&escape_dn_value(&value)).unwrap(), value);
        }

        #[test]
        fn prop_user_dn_reparses_with_commas(
            local in "[a-z ,+=]{1,12}[a-z]",
            domain in "[a-z,]{1,10}[a-z]",
        ) {
            let dn = resolver().user(&local, &domain).unwrap();
            let rdns = dn.rdns().unwrap();
            prop_assert_eq!(&rdns[0].1, &format!("{}@{}", local, domain));
            prop_assert_eq!(&rdns[2].1, &domain);
        }
    }
}

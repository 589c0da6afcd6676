//! Password scheme names and recognition of stored hashes.

use std::fmt;
use std::str::FromStr;

use crate::error::HashError;

/// Scheme tags accepted on stored hashes. Wider than what [`Scheme`] can
/// produce: the mail server also understands `SHA`, `SHA512-CRYPT` and
/// `BCRYPT` tags written by other tools.
pub const RECOGNIZED_TAGS: &[&str] = &[
    "PLAIN",
    "CRYPT",
    "MD5",
    "PLAIN-MD5",
    "SHA",
    "SSHA",
    "SHA512",
    "SSHA512",
    "SHA512-CRYPT",
    "BCRYPT",
    "CRAM-MD5",
    "NTLM",
];

/// A scheme the hash engine can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    Plain,
    /// md5-crypt, also requested as `MD5`.
    Crypt,
    PlainMd5,
    Ssha,
    Sha512,
    Ssha512,
    Bcrypt,
    CramMd5,
    Ntlm,
}

impl Scheme {
    pub const ALL: [Scheme; 9] = [
        Scheme::Plain,
        Scheme::Crypt,
        Scheme::PlainMd5,
        Scheme::Ssha,
        Scheme::Sha512,
        Scheme::Ssha512,
        Scheme::Bcrypt,
        Scheme::CramMd5,
        Scheme::Ntlm,
    ];

    /// Canonical upper-case name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Scheme::Plain => "PLAIN",
            Scheme::Crypt => "CRYPT",
            Scheme::PlainMd5 => "PLAIN-MD5",
            Scheme::Ssha => "SSHA",
            Scheme::Sha512 => "SHA512",
            Scheme::Ssha512 => "SSHA512",
            Scheme::Bcrypt => "BCRYPT",
            Scheme::CramMd5 => "CRAM-MD5",
            Scheme::Ntlm => "NTLM",
        }
    }

    /// Whether hashing needs the external tool.
    #[must_use]
    pub const fn is_external(self) -> bool {
        matches!(self, Scheme::CramMd5 | Scheme::Ntlm)
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Scheme {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PLAIN" => Ok(Scheme::Plain),
            "CRYPT" | "MD5" => Ok(Scheme::Crypt),
            "PLAIN-MD5" => Ok(Scheme::PlainMd5),
            "SSHA" => Ok(Scheme::Ssha),
            "SHA512" => Ok(Scheme::Sha512),
            "SSHA512" => Ok(Scheme::Ssha512),
            "BCRYPT" => Ok(Scheme::Bcrypt),
            "CRAM-MD5" => Ok(Scheme::CramMd5),
            "NTLM" => Ok(Scheme::Ntlm),
            _ => Err(HashError::UnsupportedScheme(s.to_string())),
        }
    }
}

/// Split `{TAG}payload` into the tag and the payload.
pub fn split_tag(hash: &str) -> Option<(&str, &str)> {
    let rest = hash.strip_prefix('{')?;
    let (tag, payload) = rest.split_once('}')?;
    Some((tag, payload))
}

/// Whether `hash` starts with a recognized `{SCHEME}` tag (case-insensitive).
///
/// Used to accept pre-hashed values without hashing them again.
pub fn is_supported_scheme(hash: &str) -> bool {
    split_tag(hash).is_some_and(|(tag, _)| {
        let tag = tag.to_ascii_uppercase();
        RECOGNIZED_TAGS.contains(&tag.as_str())
    })
}

//! Credential hashing for mail accounts.
//!
//! Produces `{SCHEME}payload` strings the mail server understands. Every
//! scheme trims surrounding whitespace from the plaintext first.
//!
//! Two schemes depend on something that may be missing at runtime: BCRYPT
//! needs native bcrypt support (the `bcrypt` cargo feature) and CRAM-MD5/NTLM
//! need an external hashing utility. Both are probed once into
//! [`Capabilities`]; when the capability is absent, or the utility fails, the
//! hasher produces SSHA instead and logs a warning.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::{rngs::OsRng, RngCore};
use sha1::{Digest, Sha1};
use sha2::Sha512;
use tokio::process::Command;

use crate::config::HashConfig;
use crate::error::HashError;
use crate::scheme::{split_tag, Scheme};

/// Random salt length for SSHA and SSHA512.
pub const SALT_LEN: usize = 8;

const SHA1_LEN: usize = 20;
const SHA512_LEN: usize = 64;

/// Upper bound for one run of the external utility.
const EXTERNAL_TIMEOUT: Duration = Duration::from_secs(10);

/// What the running process can do, probed once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    /// Native bcrypt hashing is available.
    pub bcrypt: bool,

    /// Resolved path of the external hashing utility.
    pub external_tool: Option<PathBuf>,
}

impl Capabilities {
    /// Probe for bcrypt support and locate `tool`.
    ///
    /// A `tool` containing a path separator is used as-is when it names an
    /// existing file; a bare name is searched on `PATH`.
    #[must_use]
    pub fn probe(tool: &str) -> Self {
        let capabilities = Self {
            bcrypt: cfg!(feature = "bcrypt"),
            external_tool: locate_tool(tool),
        };
        tracing::debug!(
            bcrypt = capabilities.bcrypt,
            external_tool = ?capabilities.external_tool,
            "probed hashing capabilities"
        );
        capabilities
    }

    /// Nothing optional available; every optional scheme falls back.
    #[must_use]
    pub fn none() -> Self {
        Self {
            bcrypt: false,
            external_tool: None,
        }
    }
}

fn locate_tool(tool: &str) -> Option<PathBuf> {
    if tool.is_empty() {
        return None;
    }
    if tool.contains(std::path::MAIN_SEPARATOR) {
        let path = Path::new(tool);
        return path.is_file().then(|| path.to_path_buf());
    }
    find_in_path(tool)
}

fn find_in_path(binary: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    for segment in std::env::split_paths(&path_var) {
        let candidate = segment.join(binary);
        if candidate.is_file() {
            return Some(candidate);
        }
    }

    None
}

/// Password hasher bound to a configuration and a capability probe.
#[derive(Debug, Clone)]
pub struct CredentialHasher {
    config: HashConfig,
    capabilities: Capabilities,
}

impl CredentialHasher {
    /// Create a hasher, probing capabilities from the configured tool.
    #[must_use]
    pub fn new(config: HashConfig) -> Self {
        let capabilities = Capabilities::probe(&config.hash_tool);
        Self::with_capabilities(config, capabilities)
    }

    /// Create a hasher with an explicit capability set.
    #[must_use]
    pub fn with_capabilities(config: HashConfig, capabilities: Capabilities) -> Self {
        Self {
            config,
            capabilities,
        }
    }

    #[must_use]
    pub fn config(&self) -> &HashConfig {
        &self.config
    }

    #[must_use]
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Hash `plain` with the named scheme, or the configured default when
    /// `scheme` is `None`.
    ///
    /// # Errors
    ///
    /// `HashError::UnsupportedScheme` for a scheme name the engine does not
    /// know, `HashError::HashingFailed` if a primitive rejects the input.
    pub async fn hash(&self, plain: &str, scheme: Option<&str>) -> Result<String, HashError> {
        let scheme = match scheme {
            Some(name) => name.parse::<Scheme>()?,
            None => self.config.default_scheme,
        };
        self.hash_with(plain, scheme).await
    }

    /// Hash `plain` with an already parsed scheme.
    pub async fn hash_with(&self, plain: &str, scheme: Scheme) -> Result<String, HashError> {
        let plain = plain.trim();

        match scheme {
            Scheme::Plain => Ok(self.wrap(scheme, plain)),
            Scheme::Crypt => {
                let hash = pwhash::md5_crypt::hash(plain)
                    .map_err(|e| HashError::HashingFailed(e.to_string()))?;
                Ok(format!("{{CRYPT}}{hash}"))
            }
            Scheme::PlainMd5 => {
                let digest = format!("{:x}", md5::compute(plain.as_bytes()));
                Ok(self.wrap(scheme, &digest))
            }
            Scheme::Ssha => Ok(ssha(plain)),
            Scheme::Sha512 => Ok(format!(
                "{{SHA512}}{}",
                STANDARD.encode(Sha512::digest(plain.as_bytes()))
            )),
            Scheme::Ssha512 => Ok(ssha512(plain)),
            Scheme::Bcrypt => {
                if !self.capabilities.bcrypt {
                    tracing::warn!("bcrypt support unavailable, storing SSHA instead");
                    return Ok(ssha(plain));
                }
                let hash = pwhash::bcrypt::hash(plain)
                    .map_err(|e| HashError::HashingFailed(e.to_string()))?;
                Ok(format!("{{CRYPT}}{hash}"))
            }
            Scheme::CramMd5 | Scheme::Ntlm => {
                let Some(tool) = &self.capabilities.external_tool else {
                    tracing::warn!(
                        scheme = %scheme,
                        tool = %self.config.hash_tool,
                        "external hashing utility not found, storing SSHA instead"
                    );
                    return Ok(ssha(plain));
                };

                match run_external(tool, scheme, plain).await {
                    Ok(payload) => Ok(self.wrap(scheme, &payload)),
                    Err(reason) => {
                        tracing::warn!(
                            scheme = %scheme,
                            tool = %tool.display(),
                            reason = %reason,
                            "external hashing utility failed, storing SSHA instead"
                        );
                        Ok(ssha(plain))
                    }
                }
            }
        }
    }

    /// Prefix `payload` with `{SCHEME}` when prefixing is enabled.
    fn wrap(&self, scheme: Scheme, payload: &str) -> String {
        if self.config.use_prefixed_scheme {
            format!("{{{scheme}}}{payload}")
        } else {
            payload.to_string()
        }
    }
}

/// `{SSHA}` + base64(sha1(plain ‖ salt) ‖ salt) with a fresh 8-byte salt.
fn ssha(plain: &str) -> String {
    let salt = random_salt();
    let mut hasher = Sha1::new();
    hasher.update(plain.as_bytes());
    hasher.update(salt);
    let mut payload = hasher.finalize().to_vec();
    payload.extend_from_slice(&salt);
    format!("{{SSHA}}{}", STANDARD.encode(payload))
}

fn ssha512(plain: &str) -> String {
    let salt = random_salt();
    let mut hasher = Sha512::new();
    hasher.update(plain.as_bytes());
    hasher.update(salt);
    let mut payload = hasher.finalize().to_vec();
    payload.extend_from_slice(&salt);
    format!("{{SSHA512}}{}", STANDARD.encode(payload))
}

fn random_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    salt
}

/// Run `<tool> pw -s <SCHEME> -p <plain>` and return the hash without its
/// scheme tag. The error is a human-readable reason for the fallback log.
async fn run_external(tool: &Path, scheme: Scheme, plain: &str) -> Result<String, String> {
    tracing::debug!(scheme = %scheme, tool = %tool.display(), "running external hashing utility");

    let child = Command::new(tool)
        .args(["pw", "-s", scheme.name(), "-p", plain])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output();

    let output = tokio::time::timeout(EXTERNAL_TIMEOUT, child)
        .await
        .map_err(|_| format!("timed out after {}s", EXTERNAL_TIMEOUT.as_secs()))?
        .map_err(|e| e.to_string())?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!("{} ({})", output.status, stderr.trim()));
    }

    let stdout = String::from_utf8(output.stdout).map_err(|e| e.to_string())?;
    let payload = strip_scheme_tag(stdout.trim(), scheme).trim().to_string();
    if payload.is_empty() {
        return Err("empty output".to_string());
    }
    Ok(payload)
}

fn strip_scheme_tag(output: &str, scheme: Scheme) -> &str {
    match split_tag(output) {
        Some((tag, payload)) if tag.eq_ignore_ascii_case(scheme.name()) => payload,
        _ => output,
    }
}

/// Check `plain` against a stored hash.
///
/// Covers the schemes that can be computed locally: PLAIN, PLAIN-MD5, SHA,
/// SSHA, SHA512, SSHA512 and everything stored as `{CRYPT}`, `{MD5}`,
/// `{SHA512-CRYPT}` or `{BCRYPT}`. CRAM-MD5 and NTLM never verify. A value
/// without a tag is compared as a bare plain or PLAIN-MD5 value.
pub fn verify(plain: &str, hash: &str) -> bool {
    let plain = plain.trim();

    let Some((tag, payload)) = split_tag(hash) else {
        return plain == hash || matches_hex_md5(plain, hash);
    };

    match tag.to_ascii_uppercase().as_str() {
        "PLAIN" => plain == payload,
        "PLAIN-MD5" => matches_hex_md5(plain, payload),
        "SHA" => digest_matches::<Sha1>(plain, payload),
        "SHA512" => digest_matches::<Sha512>(plain, payload),
        "SSHA" => salted_digest_matches::<Sha1>(plain, payload, SHA1_LEN),
        "SSHA512" => salted_digest_matches::<Sha512>(plain, payload, SHA512_LEN),
        "CRYPT" | "MD5" | "SHA512-CRYPT" => pwhash::unix::verify(plain, payload),
        "BCRYPT" => pwhash::bcrypt::verify(plain, payload),
        other => {
            tracing::warn!(scheme = other, "cannot verify password scheme locally");
            false
        }
    }
}

fn matches_hex_md5(plain: &str, hex: &str) -> bool {
    format!("{:x}", md5::compute(plain.as_bytes())).eq_ignore_ascii_case(hex)
}

fn digest_matches<D: Digest>(plain: &str, payload: &str) -> bool {
    STANDARD
        .decode(payload)
        .is_ok_and(|expected| D::digest(plain.as_bytes()).as_slice() == expected.as_slice())
}

fn salted_digest_matches<D: Digest>(plain: &str, payload: &str, digest_len: usize) -> bool {
    let Ok(decoded) = STANDARD.decode(payload) else {
        return false;
    };
    if decoded.len() <= digest_len {
        return false;
    }
    let (expected, salt) = decoded.split_at(digest_len);
    let mut hasher = D::new();
    hasher.update(plain.as_bytes());
    hasher.update(salt);
    hasher.finalize().as_slice() == expected
}

//! # mailadm auth
//!
//! Password handling for mail accounts:
//!
//! - [`CredentialHasher`] turns a plaintext into a `{SCHEME}payload` hash,
//!   falling back to SSHA when bcrypt or the external utility is missing
//! - [`is_supported_scheme`] recognizes stored hashes by their tag
//! - [`verify`] checks a plaintext against locally computable hashes
//! - [`PasswordPolicy`] decides whether a plaintext is acceptable at all
//!
//! ## Example
//!
//! ```ignore
//! use mailadm_auth::{CredentialHasher, HashConfig, PasswordPolicy};
//!
//! PasswordPolicy::from_env()?.validate_change(&password, &repeat)?;
//! let hasher = CredentialHasher::new(HashConfig::from_env()?);
//! let stored = hasher.hash(&password, None).await?;
//! ```

pub mod config;
pub mod error;
pub mod hash;
pub mod policy;
pub mod scheme;

pub use config::HashConfig;
pub use error::HashError;
pub use hash::{verify, Capabilities, CredentialHasher};
pub use policy::{PasswordPolicy, PolicyViolation};
pub use scheme::{is_supported_scheme, Scheme};

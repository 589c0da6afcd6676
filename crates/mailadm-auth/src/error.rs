//! Error types for credential hashing.

use thiserror::Error;

/// Hash engine errors.
///
/// Missing bcrypt support and a missing or failing external hashing tool are
/// not errors: both fall back to SSHA.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HashError {
    /// The requested scheme name is not one the engine can produce.
    #[error("unsupported password scheme: {0}")]
    UnsupportedScheme(String),

    /// A hashing primitive rejected its input.
    #[error("password hashing failed: {0}")]
    HashingFailed(String),
}

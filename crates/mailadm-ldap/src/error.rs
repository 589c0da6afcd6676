//! Directory error types.
//!
//! Messages are deliberately generic for the two access-denied variants: a
//! caller must not be able to tell a missing identity from a wrong secret or
//! from a missing administrator marker.

use mailadm_core::ValidationErrors;
use thiserror::Error;

/// LDAP result code for `invalidCredentials`.
pub const RC_INVALID_CREDENTIALS: u32 = 49;
/// LDAP result code for `noSuchObject`.
pub const RC_NO_SUCH_OBJECT: u32 = 32;

/// Error that can occur while talking to the directory.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Bind was rejected.
    #[error("authentication failed: invalid credentials")]
    Authentication,

    /// Bind succeeded but the identity carries no administrator marker.
    #[error("authorization failed: identity is not a domain administrator")]
    Authorization,

    /// An operation was attempted before any session was opened.
    #[error("no active directory session")]
    NoActiveSession,

    /// Transport could not be established or broke down.
    #[error("connection failed: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The server rejected an operation.
    #[error("directory operation failed (code {code}): {message}")]
    Operation { code: u32, message: String },

    /// An operation did not complete within the configured bound.
    #[error("directory operation timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// Caller supplied an unusable identifier.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// Typed decoding or record validation failed.
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
}

/// Result alias for directory operations.
pub type DirectoryResult<T> = Result<T, DirectoryError>;

impl DirectoryError {
    pub fn connection(message: impl Into<String>) -> Self {
        DirectoryError::Connection {
            message: message.into(),
            source: None,
        }
    }

    pub fn connection_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        DirectoryError::Connection {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn operation(code: u32, message: impl Into<String>) -> Self {
        DirectoryError::Operation {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        DirectoryError::InvalidInput {
            message: message.into(),
        }
    }

    /// True for both access-denied variants; presentation layers should show
    /// the same message for either.
    #[must_use]
    pub fn is_access_denied(&self) -> bool {
        matches!(
            self,
            DirectoryError::Authentication | DirectoryError::Authorization
        )
    }

    /// Get an error code for classification.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            DirectoryError::Authentication => "AUTH_FAILED",
            DirectoryError::Authorization => "AUTHORIZATION_FAILED",
            DirectoryError::NoActiveSession => "NO_ACTIVE_SESSION",
            DirectoryError::Connection { .. } => "CONNECTION_FAILED",
            DirectoryError::Operation { .. } => "OPERATION_FAILED",
            DirectoryError::Timeout { .. } => "TIMEOUT",
            DirectoryError::InvalidInput { .. } => "INVALID_INPUT",
            DirectoryError::Validation(_) => "VALIDATION_FAILED",
        }
    }
}

impl From<ldap3::LdapError> for DirectoryError {
    fn from(error: ldap3::LdapError) -> Self {
        match error {
            ldap3::LdapError::LdapResult { result } => {
                DirectoryError::operation(result.rc, result.text)
            }
            other => DirectoryError::connection_with_source("LDAP transport error", other),
        }
    }
}

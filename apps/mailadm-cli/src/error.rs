//! CLI error types and exit codes

use mailadm_auth::HashError;
use mailadm_core::{ConfigError, ValidationErrors};
use mailadm_ldap::DirectoryError;
use thiserror::Error;

/// Exit codes for the CLI
/// - 0: Success
/// - 1: General error (configuration, input, password mismatch)
/// - 2: Access denied
/// - 3: Directory unreachable or too slow
/// - 4: Validation error
/// - 5: Directory rejected the request
pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("No identity given.")]
    MissingIdentity,

    /// Bad credentials and missing administrator rights look the same.
    #[error("Access denied: invalid credentials or insufficient privileges.")]
    AccessDenied,

    #[error("No active directory session.")]
    NoSession,

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Directory did not answer within {0} seconds.")]
    Timeout(u64),

    #[error("Directory error (code {code}): {message}")]
    Directory { code: u32, message: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Validation failed:")]
    Validation(ValidationErrors),

    #[error("{0}")]
    Hash(#[from] HashError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Password does not match the stored hash.")]
    PasswordMismatch,

    #[error("Input error: {0}")]
    InputError(String),
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::AccessDenied | CliError::MissingIdentity => 2,
            CliError::ConnectionFailed(_) | CliError::Timeout(_) => 3,
            CliError::Validation(_)
            | CliError::InvalidInput(_)
            | CliError::Hash(_)
            | CliError::NotFound(_) => 4,
            CliError::Directory { .. } => 5,
            CliError::Config(_)
            | CliError::NoSession
            | CliError::PasswordMismatch
            | CliError::InputError(_) => 1,
        }
    }

    /// Print the error to stderr with appropriate formatting
    pub fn print(&self) {
        let use_color = std::env::var("NO_COLOR").is_err();

        if use_color {
            eprintln!("\x1b[31mError:\x1b[0m {self}");
        } else {
            eprintln!("Error: {self}");
        }

        if let CliError::Validation(errors) = self {
            for error in errors.iter() {
                eprintln!("  - {}: {}", error.field, error.message);
            }
        }

        if let Some(suggestion) = self.suggestion() {
            if use_color {
                eprintln!("\n\x1b[33mSuggestion:\x1b[0m {suggestion}");
            } else {
                eprintln!("\nSuggestion: {suggestion}");
            }
        }
    }

    fn suggestion(&self) -> Option<&'static str> {
        match self {
            CliError::MissingIdentity => Some("Pass --user or set MAILADM_USER."),
            CliError::Config(_) => Some("Check the MAILADM_* variables in your environment or .env file."),
            CliError::ConnectionFailed(_) => {
                Some("Check MAILADM_LDAP_URI and that the directory server is reachable.")
            }
            CliError::Timeout(_) => Some("Raise MAILADM_LDAP_OPERATION_TIMEOUT_SECS or try again."),
            _ => None,
        }
    }
}

impl From<DirectoryError> for CliError {
    fn from(e: DirectoryError) -> Self {
        if e.is_access_denied() {
            return CliError::AccessDenied;
        }
        match e {
            DirectoryError::NoActiveSession => CliError::NoSession,
            DirectoryError::Connection { message, source } => match source {
                Some(source) => CliError::ConnectionFailed(format!("{message}: {source}")),
                None => CliError::ConnectionFailed(message),
            },
            DirectoryError::Timeout { timeout_secs } => CliError::Timeout(timeout_secs),
            DirectoryError::Operation { code, message } => CliError::Directory { code, message },
            DirectoryError::InvalidInput { message } => CliError::InvalidInput(message),
            DirectoryError::Validation(errors) => CliError::Validation(errors),
            DirectoryError::Authentication | DirectoryError::Authorization => {
                CliError::AccessDenied
            }
        }
    }
}

impl From<ValidationErrors> for CliError {
    fn from(e: ValidationErrors) -> Self {
        CliError::Validation(e)
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::InputError(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::InputError(format!("JSON error: {e}"))
    }
}

impl From<dialoguer::Error> for CliError {
    fn from(e: dialoguer::Error) -> Self {
        CliError::InputError(format!("Dialog error: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_denied_hides_cause() {
        let auth: CliError = DirectoryError::Authentication.into();
        let authz: CliError = DirectoryError::Authorization.into();
        assert_eq!(auth.to_string(), authz.to_string());
        assert_eq!(auth.exit_code(), 2);
    }

    #[test]
    fn test_exit_code_connection_failed() {
        let err: CliError = DirectoryError::connection("refused").into();
        assert!(matches!(err, CliError::ConnectionFailed(ref m) if m == "refused"));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_exit_code_timeout() {
        let err: CliError = DirectoryError::Timeout { timeout_secs: 30 }.into();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_exit_code_operation() {
        let err: CliError = DirectoryError::operation(50, "insufficient access").into();
        assert!(matches!(err, CliError::Directory { code: 50, .. }));
        assert_eq!(err.exit_code(), 5);
    }

    #[test]
    fn test_exit_code_validation() {
        let mut errors = ValidationErrors::new();
        errors.add("uid", "required");
        let err: CliError = DirectoryError::Validation(errors).into();
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn test_exit_code_config() {
        let err: CliError = ConfigError::MissingVar("MAILADM_LDAP_URI".into()).into();
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("MAILADM_LDAP_URI"));
    }

    #[test]
    fn test_exit_code_unsupported_scheme() {
        let err: CliError = HashError::UnsupportedScheme("ROT13".into()).into();
        assert_eq!(err.exit_code(), 4);
    }
}

//! Password acceptability rules.
//!
//! Separate from hashing: a policy says whether a plaintext may be stored at
//! all. Every violated rule is reported, not just the first, so a form can
//! flag all of them at once.

use std::fmt;

use mailadm_core::ValidationErrors;
use serde::Serialize;

/// Characters that satisfy the special-character rule.
pub const SPECIAL_CHARS: &str = "$@#%!^&*()-_+={}[]";

/// A single broken rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum PolicyViolation {
    /// Characters outside printable ASCII (32..=126). Always enforced.
    NonAscii,
    TooShort { min: usize, actual: usize },
    TooLong { max: usize, actual: usize },
    MissingDigit,
    MissingUppercase,
    MissingLowercase,
    MissingSpecial,
}

impl PolicyViolation {
    /// Stable machine-readable code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NonAscii => "non_ascii",
            Self::TooShort { .. } => "too_short",
            Self::TooLong { .. } => "too_long",
            Self::MissingDigit => "missing_digit",
            Self::MissingUppercase => "missing_uppercase",
            Self::MissingLowercase => "missing_lowercase",
            Self::MissingSpecial => "missing_special",
        }
    }
}

impl fmt::Display for PolicyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonAscii => write!(f, "Password may only contain printable ASCII characters"),
            Self::TooShort { min, actual } => {
                write!(f, "Password must be at least {min} characters (got {actual})")
            }
            Self::TooLong { max, actual } => {
                write!(f, "Password must be at most {max} characters (got {actual})")
            }
            Self::MissingDigit => write!(f, "Password must contain at least one digit"),
            Self::MissingUppercase => {
                write!(f, "Password must contain at least one uppercase letter")
            }
            Self::MissingLowercase => {
                write!(f, "Password must contain at least one lowercase letter")
            }
            Self::MissingSpecial => write!(
                f,
                "Password must contain at least one special character ({SPECIAL_CHARS})"
            ),
        }
    }
}

/// Configurable password rules. `max_length == 0` means unbounded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub max_length: usize,
    pub require_digit: bool,
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_special: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            max_length: 0,
            require_digit: true,
            require_uppercase: true,
            require_lowercase: true,
            require_special: true,
        }
    }
}

impl PasswordPolicy {
    /// A policy that only enforces printable ASCII.
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            min_length: 0,
            max_length: 0,
            require_digit: false,
            require_uppercase: false,
            require_lowercase: false,
            require_special: false,
        }
    }

    /// Every rule `password` breaks, in rule order.
    #[must_use]
    pub fn check(&self, password: &str) -> Vec<PolicyViolation> {
        let mut violations = Vec::new();
        let len = password.chars().count();

        if !password.chars().all(|c| matches!(c, ' '..='~')) {
            violations.push(PolicyViolation::NonAscii);
        }

        if len < self.min_length {
            violations.push(PolicyViolation::TooShort {
                min: self.min_length,
                actual: len,
            });
        }

        if self.max_length > 0 && len > self.max_length {
            violations.push(PolicyViolation::TooLong {
                max: self.max_length,
                actual: len,
            });
        }

        if self.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
            violations.push(PolicyViolation::MissingDigit);
        }

        if self.require_uppercase && !password.chars().any(|c| c.is_ascii_uppercase()) {
            violations.push(PolicyViolation::MissingUppercase);
        }

        if self.require_lowercase && !password.chars().any(|c| c.is_ascii_lowercase()) {
            violations.push(PolicyViolation::MissingLowercase);
        }

        if self.require_special && !password.chars().any(|c| SPECIAL_CHARS.contains(c)) {
            violations.push(PolicyViolation::MissingSpecial);
        }

        violations
    }

    #[must_use]
    pub fn is_acceptable(&self, password: &str) -> bool {
        self.check(password).is_empty()
    }

    /// Validate a password change form. Both fields are checked against the
    /// rules; a repeat that differs from the password is reported on
    /// `password_repeat` as `mismatch`.
    pub fn validate_change(&self, password: &str, repeat: &str) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        for (field, value) in [("password", password), ("password_repeat", repeat)] {
            for violation in self.check(value) {
                errors.add_coded(field, violation.code(), violation.to_string());
            }
        }

        if password != repeat {
            errors.add_coded(
                "password_repeat",
                "mismatch",
                "Password and confirmation do not match",
            );
        }

        errors.into_result()
    }
}

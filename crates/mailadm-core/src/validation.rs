//! Per-field validation errors.
//!
//! Validation in mailadm never stops at the first problem: every violated
//! rule is recorded against the field it concerns so that a form can
//! highlight all of them at once.

use serde::Serialize;
use std::fmt;

/// A single violated rule on a single field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// The field name that failed validation.
    pub field: String,
    /// Stable code for programmatic handling (e.g. `missing_digit`).
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// Collection of field errors, in the order they were reported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a violation under the generic `invalid` code.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.add_coded(field, "invalid", message);
    }

    /// Record a violation with an explicit code.
    pub fn add_coded(
        &mut self,
        field: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.errors.push(FieldError {
            field: field.into(),
            code: code.into(),
            message: message.into(),
        });
    }

    /// Append every error of `other`.
    pub fn merge(&mut self, other: ValidationErrors) {
        self.errors.extend(other.errors);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Total number of recorded violations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Number of distinct fields with at least one violation.
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.fields().count()
    }

    /// Distinct field names, first-reported first.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        let mut seen: Vec<&str> = Vec::new();
        self.errors.iter().filter_map(move |e| {
            if seen.contains(&e.field.as_str()) {
                None
            } else {
                seen.push(e.field.as_str());
                Some(e.field.as_str())
            }
        })
    }

    /// All messages reported for `field`.
    #[must_use]
    pub fn messages_for(&self, field: &str) -> Vec<&str> {
        self.errors
            .iter()
            .filter(|e| e.field == field)
            .map(|e| e.message.as_str())
            .collect()
    }

    /// All codes reported for `field`.
    #[must_use]
    pub fn codes_for(&self, field: &str) -> Vec<&str> {
        self.errors
            .iter()
            .filter(|e| e.field == field)
            .map(|e| e.code.as_str())
            .collect()
    }

    #[must_use]
    pub fn contains_field(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldError> {
        self.errors.iter()
    }

    /// `Ok(())` when nothing was recorded, `Err(self)` otherwise.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation failed")?;
        for (i, error) in self.errors.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{}: {}", error.field, error.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a FieldError;
    type IntoIter = std::slice::Iter<'a, FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

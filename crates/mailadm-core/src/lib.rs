//! mailadm Core Library
//!
//! Shared types used by the directory access and credential crates.
//!
//! # Modules
//!
//! - [`validation`] - Per-field validation error collection (`ValidationErrors`)
//! - [`config`] - Environment reader helpers and `ConfigError`
//!
//! # Example
//!
//! ```
//! use mailadm_core::ValidationErrors;
//!
//! let mut errors = ValidationErrors::new();
//! errors.add("password", "must contain at least one digit");
//! errors.add("password", "must contain at least one uppercase letter");
//! errors.add("uid", "is required");
//!
//! assert_eq!(errors.field_count(), 2);
//! assert!(errors.into_result().is_err());
//! ```

pub mod config;
pub mod validation;

pub use config::ConfigError;
pub use validation::{FieldError, ValidationErrors};

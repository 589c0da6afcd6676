//! # mailadm LDAP
//!
//! Directory access for mail account administration on an iRedMail-style
//! LDAP tree.
//!
//! ## Features
//!
//! - Escaped DNs for domains and mailboxes ([`dn`])
//! - Wire/value codec and modify change lists ([`codec`], [`changes`])
//! - Decode-time attribute validation ([`schema`])
//! - Bound and authorized sessions with per-call timeouts ([`session`])
//! - An explicit holder for the current session ([`manager`])
//! - Domain and mailbox operations ([`accounts`])
//!
//! ## Example
//!
//! ```ignore
//! use mailadm_ldap::{DirectoryConfig, DnResolver, Identity, LdapConnector, SessionManager};
//! use secrecy::SecretString;
//!
//! let config = DirectoryConfig::from_env()?;
//! let resolver = DnResolver::from_config(&config)?;
//! let manager = SessionManager::new(
//!     LdapConnector::new(config.clone()),
//!     resolver,
//!     config.operation_timeout,
//! );
//!
//! let secret = SecretString::new("secret".into());
//! let session = manager.open(Identity::parse("postmaster@example.com")?, &secret).await?;
//! let domains = mailadm_ldap::MailAccounts::new(&session).list_domains().await?;
//! ```

pub mod accounts;
pub mod changes;
pub mod codec;
pub mod config;
pub mod connector;
pub mod dn;
pub mod error;
pub mod manager;
pub mod models;
pub mod schema;
pub mod session;
pub mod transport;

pub use accounts::MailAccounts;
pub use changes::{build_replace_set, ReplaceSetBuilder};
pub use codec::{AttrValue, Change, ChangeKind, WireValues};
pub use config::DirectoryConfig;
pub use connector::{LdapConnector, LdapTransport};
pub use dn::{Dn, DnResolver};
pub use error::{DirectoryError, DirectoryResult};
pub use manager::SessionManager;
pub use models::{AccountSettings, DomainSummary, MailUser, NewMailUser, SettingValue};
pub use schema::{AttrKind, Schema, TypedEntry};
pub use session::{DirectorySession, Identity};
pub use transport::{Connect, DirectoryTransport, Record, SearchScope};

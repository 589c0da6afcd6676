//! Transport seam between the session and the wire.
//!
//! [`DirectoryTransport`] is one live, exclusively owned connection.
//! [`Connect`] opens fresh ones. The `ldap3` implementation lives in
//! [`crate::connector`]; tests substitute their own.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::codec::{decode_first, decode_values, Change, WireValues};
use crate::dn::Dn;
use crate::error::DirectoryResult;

/// One entry returned by a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub dn: Dn,
    pub attrs: HashMap<String, WireValues>,
}

impl Record {
    pub fn new(dn: Dn) -> Self {
        Self {
            dn,
            attrs: HashMap::new(),
        }
    }

    /// Builder-style helper, mostly for tests and fixtures.
    #[must_use]
    pub fn with_attr(mut self, name: &str, values: &[&str]) -> Self {
        self.attrs.insert(
            name.to_string(),
            values.iter().map(|v| v.as_bytes().to_vec()).collect(),
        );
        self
    }

    /// Raw values of `name`, matched case-insensitively.
    #[must_use]
    pub fn raw(&self, name: &str) -> Option<&WireValues> {
        self.attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    /// First value of `name`, decoded.
    #[must_use]
    pub fn first(&self, name: &str) -> Option<String> {
        self.raw(name).and_then(|v| decode_first(v))
    }

    /// Every value of `name`, decoded.
    #[must_use]
    pub fn values(&self, name: &str) -> Vec<String> {
        self.raw(name).map(|v| decode_values(v)).unwrap_or_default()
    }
}

/// Search scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    Base,
    OneLevel,
    Subtree,
}

impl From<SearchScope> for ldap3::Scope {
    fn from(scope: SearchScope) -> Self {
        match scope {
            SearchScope::Base => ldap3::Scope::Base,
            SearchScope::OneLevel => ldap3::Scope::OneLevel,
            SearchScope::Subtree => ldap3::Scope::Subtree,
        }
    }
}

/// A live connection to the directory.
///
/// Implementations map a rejected bind to
/// [`DirectoryError::Authentication`](crate::DirectoryError::Authentication)
/// and a server-side rejection of any other request to
/// [`DirectoryError::Operation`](crate::DirectoryError::Operation).
#[async_trait]
pub trait DirectoryTransport: Send {
    async fn bind(&mut self, dn: &Dn, secret: &str) -> DirectoryResult<()>;

    /// An empty result is success.
    async fn search(
        &mut self,
        base: &Dn,
        scope: SearchScope,
        filter: &str,
        attrs: &[&str],
    ) -> DirectoryResult<Vec<Record>>;

    /// Apply all changes in one request.
    async fn modify(&mut self, dn: &Dn, changes: Vec<Change>) -> DirectoryResult<()>;

    async fn add(&mut self, dn: &Dn, attrs: Vec<(String, WireValues)>) -> DirectoryResult<()>;

    async fn unbind(&mut self) -> DirectoryResult<()>;
}

/// Opens fresh transports.
#[async_trait]
pub trait Connect: Send + Sync {
    async fn connect(&self) -> DirectoryResult<Box<dyn DirectoryTransport>>;
}

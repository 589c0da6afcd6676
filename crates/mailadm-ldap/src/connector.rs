//! `ldap3` implementation of the transport traits.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, SearchEntry};
use tracing::{debug, warn};

use crate::codec::{Change, WireValues};
use crate::config::DirectoryConfig;
use crate::dn::Dn;
use crate::error::{DirectoryError, DirectoryResult, RC_INVALID_CREDENTIALS, RC_NO_SUCH_OBJECT};
use crate::transport::{Connect, DirectoryTransport, Record, SearchScope};

/// Opens connections to the configured endpoint.
///
/// `ldaps://` endpoints are encrypted from connect. Plain `ldap://`
/// endpoints are upgraded with StartTLS before any credentials are sent when
/// the configuration asks for it.
#[derive(Debug, Clone)]
pub struct LdapConnector {
    config: DirectoryConfig,
}

impl LdapConnector {
    pub fn new(config: DirectoryConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &DirectoryConfig {
        &self.config
    }

    fn settings(&self) -> LdapConnSettings {
        LdapConnSettings::new()
            .set_conn_timeout(self.config.connect_timeout)
            .set_starttls(self.config.use_starttls())
            .set_no_tls_verify(!self.config.tls_verify)
    }
}

#[async_trait]
impl Connect for LdapConnector {
    async fn connect(&self) -> DirectoryResult<Box<dyn DirectoryTransport>> {
        let url = self.config.uri.as_str();
        debug!(
            url = %url,
            starttls = self.config.use_starttls(),
            "Connecting to LDAP server"
        );

        let (conn, ldap) = LdapConnAsync::with_settings(self.settings(), url)
            .await
            .map_err(|e| {
                DirectoryError::connection_with_source(
                    format!("Failed to connect to LDAP server at {url}"),
                    e,
                )
            })?;

        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!(error = %e, "LDAP connection driver error");
            }
        });

        Ok(Box::new(LdapTransport { ldap }))
    }
}

/// One `ldap3` connection.
pub struct LdapTransport {
    ldap: Ldap,
}

impl LdapTransport {
    fn into_record(entry: SearchEntry) -> Record {
        let mut attrs: HashMap<String, WireValues> =
            HashMap::with_capacity(entry.attrs.len() + entry.bin_attrs.len());
        for (name, values) in entry.attrs {
            attrs
                .entry(name)
                .or_default()
                .extend(values.into_iter().map(String::into_bytes));
        }
        // Values that are not valid UTF-8 arrive separately.
        for (name, values) in entry.bin_attrs {
            attrs.entry(name).or_default().extend(values);
        }
        Record {
            dn: Dn::from_server(entry.dn),
            attrs,
        }
    }
}

#[async_trait]
impl DirectoryTransport for LdapTransport {
    async fn bind(&mut self, dn: &Dn, secret: &str) -> DirectoryResult<()> {
        debug!(bind_dn = %dn, "Performing LDAP bind");

        let result = self
            .ldap
            .simple_bind(dn.as_str(), secret)
            .await
            .map_err(|e| DirectoryError::connection_with_source("LDAP bind failed", e))?;

        match result.rc {
            0 => Ok(()),
            RC_INVALID_CREDENTIALS => Err(DirectoryError::Authentication),
            rc => {
                debug!(rc, text = %result.text, "LDAP bind rejected");
                Err(DirectoryError::Authentication)
            }
        }
    }

    async fn search(
        &mut self,
        base: &Dn,
        scope: SearchScope,
        filter: &str,
        attrs: &[&str],
    ) -> DirectoryResult<Vec<Record>> {
        let result = self
            .ldap
            .search(base.as_str(), scope.into(), filter, attrs.to_vec())
            .await?;

        match result.success() {
            Ok((entries, _)) => Ok(entries
                .into_iter()
                .map(|entry| Self::into_record(SearchEntry::construct(entry)))
                .collect()),
            // A missing base holds no entries.
            Err(ldap3::LdapError::LdapResult { result }) if result.rc == RC_NO_SUCH_OBJECT => {
                debug!(base = %base, "Search base does not exist");
                Ok(Vec::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn modify(&mut self, dn: &Dn, changes: Vec<Change>) -> DirectoryResult<()> {
        let mods: Vec<_> = changes.into_iter().map(Change::into_mod).collect();
        self.ldap.modify(dn.as_str(), mods).await?.success()?;
        Ok(())
    }

    async fn add(&mut self, dn: &Dn, attrs: Vec<(String, WireValues)>) -> DirectoryResult<()> {
        let attrs: Vec<(Vec<u8>, HashSet<Vec<u8>>)> = attrs
            .into_iter()
            .map(|(name, values)| (name.into_bytes(), values.into_iter().collect()))
            .collect();
        self.ldap.add(dn.as_str(), attrs).await?.success()?;
        Ok(())
    }

    async fn unbind(&mut self) -> DirectoryResult<()> {
        self.ldap.unbind().await?;
        Ok(())
    }
}

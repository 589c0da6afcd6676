//! Authenticated, authorized directory session.
//!
//! A [`DirectorySession`] only exists after its bind succeeded and, for
//! mailbox identities, after the identity was confirmed to carry the
//! `domainGlobalAdmin=yes` marker. There is no observable "connected but
//! unauthorized" state: every failure during [`DirectorySession::open`]
//! releases the transport before returning.

use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::codec::{Change, WireValues};
use crate::dn::{escape_filter_value, Dn, DnResolver};
use crate::error::{DirectoryError, DirectoryResult};
use crate::transport::{Connect, DirectoryTransport, Record, SearchScope};

/// Who is binding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identity {
    /// Bare name; binds as `cn=<name>,<root>` and needs no further
    /// authorization.
    Admin { name: String },
    /// `local@domain`; binds as the mailbox entry and must be a global
    /// domain administrator.
    Mailbox { local: String, domain: String },
}

impl Identity {
    pub fn mailbox(local: impl Into<String>, domain: impl Into<String>) -> Self {
        Identity::Mailbox {
            local: local.into(),
            domain: domain.into(),
        }
    }

    pub fn admin(name: impl Into<String>) -> Self {
        Identity::Admin { name: name.into() }
    }

    /// Parse `user@domain` or a bare administrator name.
    pub fn parse(text: &str) -> DirectoryResult<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(DirectoryError::invalid_input("identity must not be empty"));
        }
        match text.rsplit_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {
                Ok(Identity::mailbox(local, domain))
            }
            Some(_) => Err(DirectoryError::invalid_input(format!(
                "'{text}' is not a valid identity"
            ))),
            None => Ok(Identity::admin(text)),
        }
    }

    /// Mail address of a mailbox identity.
    #[must_use]
    pub fn email(&self) -> Option<String> {
        match self {
            Identity::Admin { .. } => None,
            Identity::Mailbox { local, domain } => Some(format!("{local}@{domain}")),
        }
    }

    pub fn bind_dn(&self, resolver: &DnResolver) -> DirectoryResult<Dn> {
        match self {
            Identity::Admin { name } => resolver.admin(name),
            Identity::Mailbox { local, domain } => resolver.user(local, domain),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Admin { name } => f.write_str(name),
            Identity::Mailbox { local, domain } => write!(f, "{local}@{domain}"),
        }
    }
}

impl FromStr for Identity {
    type Err = DirectoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Identity::parse(s)
    }
}

/// Filter selecting the identity's own entry when it is a global admin.
#[must_use]
pub fn authorization_filter(email: &str) -> String {
    format!(
        "(&(domainGlobalAdmin=yes)(mail={}))",
        escape_filter_value(email)
    )
}

/// Run `fut` with an upper bound, mapping expiry to [`DirectoryError::Timeout`].
async fn bounded<T>(
    timeout: Duration,
    fut: impl Future<Output = DirectoryResult<T>>,
) -> DirectoryResult<T> {
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| DirectoryError::Timeout {
            timeout_secs: timeout.as_secs(),
        })?
}

/// Best-effort release; teardown errors never leave this function.
async fn release(mut transport: Box<dyn DirectoryTransport>, timeout: Duration) {
    match tokio::time::timeout(timeout, transport.unbind()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "Ignoring error while releasing directory transport"),
        Err(_) => warn!("Timed out releasing directory transport"),
    }
}

/// A bound and authorized connection to the directory.
///
/// Operations are serialized on the single transport. All of them are bounded
/// by the operation timeout given at open.
///
/// [`close`](Self::close) is the guaranteed release path. Dropping an open
/// session only spawns an unbind on the current runtime, which never runs if
/// the runtime is shutting down or the process exits first.
pub struct DirectorySession {
    transport: Mutex<Option<Box<dyn DirectoryTransport>>>,
    identity: Identity,
    bound_dn: Dn,
    resolver: DnResolver,
    timeout: Duration,
}

impl DirectorySession {
    /// Connect, bind as `identity` and confirm its authorization.
    pub async fn open(
        connector: &dyn Connect,
        resolver: &DnResolver,
        identity: Identity,
        secret: &SecretString,
        timeout: Duration,
    ) -> DirectoryResult<Self> {
        let bound_dn = identity.bind_dn(resolver)?;
        // An empty simple bind is an anonymous bind and succeeds on most servers.
        if secret.expose_secret().trim().is_empty() {
            debug!(identity = %identity, "Refusing bind with an empty secret");
            return Err(DirectoryError::Authentication);
        }
        let mut transport = bounded(timeout, connector.connect()).await?;

        let bind = bounded(timeout, transport.bind(&bound_dn, secret.expose_secret())).await;
        if let Err(e) = bind {
            debug!(identity = %identity, error = %e, "Directory bind failed");
            release(transport, timeout).await;
            return Err(e);
        }

        if let Some(email) = identity.email() {
            let filter = authorization_filter(&email);
            let found = bounded(
                timeout,
                transport.search(&bound_dn, SearchScope::Base, &filter, &["domainGlobalAdmin"]),
            )
            .await;

            match found {
                Ok(entries) if !entries.is_empty() => {}
                Ok(_) => {
                    info!(identity = %identity, "Identity is not a global domain administrator");
                    release(transport, timeout).await;
                    return Err(DirectoryError::Authorization);
                }
                Err(e) => {
                    release(transport, timeout).await;
                    return Err(e);
                }
            }
        }

        info!(identity = %identity, bind_dn = %bound_dn, "Directory session opened");

        Ok(Self {
            transport: Mutex::new(Some(transport)),
            identity,
            bound_dn,
            resolver: resolver.clone(),
            timeout,
        })
    }

    #[must_use]
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    #[must_use]
    pub fn bound_dn(&self) -> &Dn {
        &self.bound_dn
    }

    #[must_use]
    pub fn resolver(&self) -> &DnResolver {
        &self.resolver
    }

    pub async fn is_open(&self) -> bool {
        self.transport.lock().await.is_some()
    }

    /// Search below `base`. Zero matches is `Ok(vec![])`.
    pub async fn search(
        &self,
        base: &Dn,
        scope: SearchScope,
        filter: &str,
        attrs: &[&str],
    ) -> DirectoryResult<Vec<Record>> {
        let mut guard = self.transport.lock().await;
        let transport = guard.as_mut().ok_or(DirectoryError::NoActiveSession)?;

        debug!(base = %base, ?scope, filter = %filter, "Searching directory");
        let records = bounded(self.timeout, transport.search(base, scope, filter, attrs)).await?;
        debug!(base = %base, count = records.len(), "Search completed");

        Ok(records)
    }

    /// Apply `changes` to `dn` in a single request.
    pub async fn modify(&self, dn: &Dn, changes: Vec<Change>) -> DirectoryResult<()> {
        let mut guard = self.transport.lock().await;
        let transport = guard.as_mut().ok_or(DirectoryError::NoActiveSession)?;

        if changes.is_empty() {
            debug!(dn = %dn, "Nothing to modify");
            return Ok(());
        }

        debug!(dn = %dn, changes = changes.len(), "Modifying directory entry");
        bounded(self.timeout, transport.modify(dn, changes)).await
    }

    /// Create a new entry.
    pub async fn add(&self, dn: &Dn, attrs: Vec<(String, WireValues)>) -> DirectoryResult<()> {
        let mut guard = self.transport.lock().await;
        let transport = guard.as_mut().ok_or(DirectoryError::NoActiveSession)?;

        debug!(dn = %dn, attributes = attrs.len(), "Adding directory entry");
        bounded(self.timeout, transport.add(dn, attrs)).await
    }

    /// Release the transport. Safe to call more than once; teardown errors
    /// are logged and swallowed.
    pub async fn close(&self) {
        let transport = self.transport.lock().await.take();
        if let Some(transport) = transport {
            release(transport, self.timeout).await;
            info!(identity = %self.identity, "Directory session closed");
        }
    }
}

impl Drop for DirectorySession {
    fn drop(&mut self) {
        let Some(mut transport) = self.transport.get_mut().take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let identity = self.identity.to_string();
                handle.spawn(async move {
                    if let Err(e) = transport.unbind().await {
                        debug!(identity = %identity, error = %e, "Ignoring unbind error on drop");
                    }
                });
            }
            // Without a runtime the connection simply goes away with the transport.
            Err(_) => drop(transport),
        }
    }
}

impl fmt::Debug for DirectorySession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.transport.try_lock() {
            Ok(guard) if guard.is_some() => "open",
            Ok(_) => "closed",
            Err(_) => "busy",
        };
        f.debug_struct("DirectorySession")
            .field("identity", &self.identity)
            .field("bound_dn", &self.bound_dn)
            .field("timeout", &self.timeout)
            .field("state", &state)
            .finish()
    }
}

//! Holder of the "current" directory session.
//!
//! [`SessionManager`] is an explicit handle passed to whatever serves
//! requests. Opening always performs a fresh bind; only a successful open
//! replaces the current session. Readers get an `Arc`, so a replaced session
//! stays usable by in-flight operations and is released when its last user
//! drops it.

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::dn::DnResolver;
use crate::error::{DirectoryError, DirectoryResult};
use crate::session::{DirectorySession, Identity};
use crate::transport::Connect;

struct Inner<C> {
    connector: C,
    resolver: DnResolver,
    timeout: Duration,
    current: RwLock<Option<Arc<DirectorySession>>>,
}

/// Cloneable handle owning the current session.
pub struct SessionManager<C> {
    inner: Arc<Inner<C>>,
}

impl<C> Clone for SessionManager<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Connect> SessionManager<C> {
    pub fn new(connector: C, resolver: DnResolver, timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                connector,
                resolver,
                timeout,
                current: RwLock::new(None),
            }),
        }
    }

    #[must_use]
    pub fn resolver(&self) -> &DnResolver {
        &self.inner.resolver
    }

    /// Open a fresh session and make it current.
    ///
    /// On failure the previous session, if any, stays current.
    pub async fn open(
        &self,
        identity: Identity,
        secret: &SecretString,
    ) -> DirectoryResult<Arc<DirectorySession>> {
        let session = DirectorySession::open(
            &self.inner.connector,
            &self.inner.resolver,
            identity,
            secret,
            self.inner.timeout,
        )
        .await?;
        let session = Arc::new(session);

        let previous = {
            let mut current = self.inner.current.write().await;
            current.replace(Arc::clone(&session))
        };
        if let Some(previous) = previous {
            retire(previous).await;
        }

        Ok(session)
    }

    /// The current session, or [`DirectoryError::NoActiveSession`].
    pub async fn current(&self) -> DirectoryResult<Arc<DirectorySession>> {
        self.inner
            .current
            .read()
            .await
            .clone()
            .ok_or(DirectoryError::NoActiveSession)
    }

    /// With credentials: open and replace. Without: the current session.
    pub async fn session(
        &self,
        credentials: Option<(Identity, &SecretString)>,
    ) -> DirectoryResult<Arc<DirectorySession>> {
        match credentials {
            Some((identity, secret)) => self.open(identity, secret).await,
            None => self.current().await,
        }
    }

    pub async fn has_session(&self) -> bool {
        self.inner.current.read().await.is_some()
    }

    /// Drop the current session.
    pub async fn close(&self) {
        let previous = self.inner.current.write().await.take();
        if let Some(previous) = previous {
            retire(previous).await;
        }
    }
}

/// Close a replaced session now if nobody else holds it; otherwise the last
/// holder's drop releases it.
async fn retire(session: Arc<DirectorySession>) {
    match Arc::try_unwrap(session) {
        Ok(session) => session.close().await,
        Err(shared) => {
            debug!(
                identity = %shared.identity(),
                holders = Arc::strong_count(&shared) - 1,
                "Deferring release of replaced session"
            );
        }
    }
    info!("Previous directory session retired");
}

impl<C> std::fmt::Debug for SessionManager<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("resolver", &self.inner.resolver)
            .field("timeout", &self.inner.timeout)
            .finish_non_exhaustive()
    }
}

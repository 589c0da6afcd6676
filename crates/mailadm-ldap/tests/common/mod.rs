//! In-memory directory used by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use mailadm_ldap::{
    Change, Connect, DirectoryError, DirectoryResult, DirectoryTransport, Dn, DnResolver, Record,
    SearchScope, SessionManager, WireValues,
};

pub const ROOT: &str = "o=mail,dc=example,dc=com";
pub const ALICE_DN: &str =
    "mail=alice@example.com,ou=Users,domain=example.com,o=domains,o=mail,dc=example,dc=com";
pub const BOB_DN: &str =
    "mail=bob@example.com,ou=Users,domain=example.com,o=domains,o=mail,dc=example,dc=com";
pub const ADMIN_DN: &str = "cn=vmailadmin,o=mail,dc=example,dc=com";

/// A request the mock transport received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Bind(String),
    Search {
        base: String,
        scope: SearchScope,
        filter: String,
        attrs: Vec<String>,
    },
    Modify {
        dn: String,
        changes: Vec<Change>,
    },
    Add {
        dn: String,
        attrs: Vec<(String, WireValues)>,
    },
    Unbind,
}

#[derive(Default)]
struct MockState {
    passwords: HashMap<String, String>,
    global_admins: HashSet<String>,
    search_results: HashMap<String, Vec<Record>>,
    search_delay: Option<Duration>,
    modify_error: Option<(u32, String)>,
    connect_error: bool,
    calls: Vec<Call>,
    connects: usize,
    unbinds: usize,
}

/// Shared handle onto the fake directory; every transport it hands out
/// records its calls here.
#[derive(Clone, Default)]
pub struct MockDirectory {
    state: Arc<Mutex<MockState>>,
}

impl MockDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    /// An entry that can bind but carries no admin marker.
    pub fn with_user(self, dn: &str, secret: &str) -> Self {
        self.state()
            .passwords
            .insert(dn.to_string(), secret.to_string());
        self
    }

    /// An entry that can bind and has `domainGlobalAdmin=yes`.
    pub fn with_global_admin(self, dn: &str, secret: &str) -> Self {
        {
            let mut state = self.state();
            state.passwords.insert(dn.to_string(), secret.to_string());
            state.global_admins.insert(dn.to_string());
        }
        self
    }

    pub fn with_search_result(self, filter: &str, records: Vec<Record>) -> Self {
        self.state()
            .search_results
            .insert(filter.to_string(), records);
        self
    }

    pub fn with_search_delay(self, delay: Duration) -> Self {
        self.state().search_delay = Some(delay);
        self
    }

    pub fn with_modify_error(self, code: u32, message: &str) -> Self {
        self.state().modify_error = Some((code, message.to_string()));
        self
    }

    pub fn with_connect_error(self) -> Self {
        self.state().connect_error = true;
        self
    }

    pub fn connector(&self) -> MockConnector {
        MockConnector {
            directory: self.clone(),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    pub fn searches(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Search { .. }))
            .collect()
    }

    pub fn modifies(&self) -> Vec<(String, Vec<Change>)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Modify { dn, changes } => Some((dn, changes)),
                _ => None,
            })
            .collect()
    }

    pub fn adds(&self) -> Vec<(String, Vec<(String, WireValues)>)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Add { dn, attrs } => Some((dn, attrs)),
                _ => None,
            })
            .collect()
    }

    pub fn connects(&self) -> usize {
        self.state().connects
    }

    pub fn unbinds(&self) -> usize {
        self.state().unbinds
    }

    /// Yield until `expected` unbinds were seen or give up.
    pub async fn wait_for_unbinds(&self, expected: usize) -> usize {
        for _ in 0..50 {
            if self.unbinds() >= expected {
                break;
            }
            tokio::task::yield_now().await;
        }
        self.unbinds()
    }
}

pub struct MockConnector {
    directory: MockDirectory,
}

#[async_trait]
impl Connect for MockConnector {
    async fn connect(&self) -> DirectoryResult<Box<dyn DirectoryTransport>> {
        let mut state = self.directory.state();
        if state.connect_error {
            return Err(DirectoryError::connection("connection refused"));
        }
        state.connects += 1;
        Ok(Box::new(MockTransport {
            directory: self.directory.clone(),
            bound: None,
        }))
    }
}

struct MockTransport {
    directory: MockDirectory,
    bound: Option<String>,
}

#[async_trait]
impl DirectoryTransport for MockTransport {
    async fn bind(&mut self, dn: &Dn, secret: &str) -> DirectoryResult<()> {
        let mut state = self.directory.state();
        state.calls.push(Call::Bind(dn.to_string()));
        match state.passwords.get(dn.as_str()) {
            Some(expected) if expected == secret => {
                self.bound = Some(dn.to_string());
                Ok(())
            }
            _ => Err(DirectoryError::Authentication),
        }
    }

    async fn search(
        &mut self,
        base: &Dn,
        scope: SearchScope,
        filter: &str,
        attrs: &[&str],
    ) -> DirectoryResult<Vec<Record>> {
        let delay = {
            let mut state = self.directory.state();
            state.calls.push(Call::Search {
                base: base.to_string(),
                scope,
                filter: filter.to_string(),
                attrs: attrs.iter().map(|a| a.to_string()).collect(),
            });
            state.search_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let state = self.directory.state();
        if filter.starts_with("(&(domainGlobalAdmin=yes)") {
            let is_admin = self
                .bound
                .as_ref()
                .is_some_and(|dn| dn == base.as_str() && state.global_admins.contains(dn));
            return Ok(if is_admin {
                vec![Record::new(base.clone()).with_attr("domainGlobalAdmin", &["yes"])]
            } else {
                Vec::new()
            });
        }

        Ok(state.search_results.get(filter).cloned().unwrap_or_default())
    }

    async fn modify(&mut self, dn: &Dn, changes: Vec<Change>) -> DirectoryResult<()> {
        let mut state = self.directory.state();
        state.calls.push(Call::Modify {
            dn: dn.to_string(),
            changes,
        });
        match &state.modify_error {
            Some((code, message)) => Err(DirectoryError::operation(*code, message.clone())),
            None => Ok(()),
        }
    }

    async fn add(&mut self, dn: &Dn, attrs: Vec<(String, WireValues)>) -> DirectoryResult<()> {
        self.directory.state().calls.push(Call::Add {
            dn: dn.to_string(),
            attrs,
        });
        Ok(())
    }

    async fn unbind(&mut self) -> DirectoryResult<()> {
        let mut state = self.directory.state();
        state.calls.push(Call::Unbind);
        state.unbinds += 1;
        Ok(())
    }
}

pub fn resolver() -> DnResolver {
    DnResolver::new(ROOT, "domain").unwrap()
}

pub fn manager(directory: &MockDirectory) -> SessionManager<MockConnector> {
    SessionManager::new(directory.connector(), resolver(), Duration::from_secs(5))
}

pub fn user_record(uid: &str, extra: &[(&str, &str)]) -> Record {
    let mut record = Record::new(Dn::from_server(format!(
        "mail={uid}@example.com,ou=Users,domain=example.com,o=domains,{ROOT}"
    )))
    .with_attr("uid", &[uid])
    .with_attr("mail", &[format!("{uid}@example.com").as_str()]);
    for (name, value) in extra {
        record = record.with_attr(name, &[*value]);
    }
    record
}

//! Mail domain and mailbox operations on top of a [`DirectorySession`].

use mailadm_core::ValidationErrors;
use tracing::{info, warn};

use crate::changes::ReplaceSetBuilder;
use crate::codec::{encode, entry_attrs, AttrValue, ChangeKind, WireValues};
use crate::dn::{escape_filter_value, split_rdn};
use crate::error::{DirectoryError, DirectoryResult};
use crate::models::{AccountSettings, DomainSummary, MailUser, NewMailUser, MIB};
use crate::schema::{AttrKind, Schema};
use crate::session::DirectorySession;
use crate::transport::{Record, SearchScope};

/// Object classes of a new mailbox entry.
const MAIL_USER_CLASSES: &[&str] = &["inetOrgPerson", "shadowAccount", "mailUser"];

/// Services enabled on a new mailbox.
const DEFAULT_SERVICES: &[&str] = &[
    "mail",
    "deliver",
    "lda",
    "lmtp",
    "smtp",
    "smtpsecured",
    "pop3",
    "pop3secured",
    "imap",
    "imapsecured",
    "managesieve",
    "managesievesecured",
    "sieve",
    "sievesecured",
];

fn account_status(active: bool) -> &'static str {
    if active {
        "active"
    } else {
        "disabled"
    }
}

/// Domain and mailbox administration through one session.
#[derive(Debug, Clone, Copy)]
pub struct MailAccounts<'a> {
    session: &'a DirectorySession,
}

impl<'a> MailAccounts<'a> {
    pub fn new(session: &'a DirectorySession) -> Self {
        Self { session }
    }

    /// Every `mailDomain` below the root, sorted by name.
    ///
    /// Entries that fail to decode are skipped with a warning.
    pub async fn list_domains(&self) -> DirectoryResult<Vec<DomainSummary>> {
        let resolver = self.session.resolver();
        let name_attr = resolver.domain_attribute();
        let schema = Schema::new()
            .optional(name_attr, AttrKind::Str)
            .optional("accountStatus", AttrKind::Bool)
            .optional("domainCurrentUserNumber", AttrKind::Int);

        let records = self
            .session
            .search(
                resolver.root(),
                SearchScope::Subtree,
                "(objectClass=mailDomain)",
                &schema.attribute_names(),
            )
            .await?;

        let mut domains: Vec<DomainSummary> = records
            .iter()
            .filter_map(|record| match schema.decode_record(record) {
                Ok(entry) => {
                    let name = entry
                        .str(name_attr)
                        .map(str::to_string)
                        .or_else(|| split_rdn(record.dn.as_str()).ok().map(|(_, v)| v))?;
                    Some(DomainSummary {
                        name,
                        active: entry.bool("accountStatus").unwrap_or(false),
                        user_count: entry.int("domainCurrentUserNumber"),
                    })
                }
                Err(errors) => {
                    warn!(dn = %record.dn, %errors, "Skipping malformed domain entry");
                    None
                }
            })
            .collect();

        domains.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(domains)
    }

    /// Parsed `accountSetting` values of a domain entry.
    pub async fn domain_settings(&self, domain: &str) -> DirectoryResult<AccountSettings> {
        let dn = self.session.resolver().domain(domain)?;
        let records = self
            .session
            .search(&dn, SearchScope::Base, "(objectClass=mailDomain)", &["accountSetting"])
            .await?;

        Ok(records
            .first()
            .map(|record| AccountSettings::parse(record.values("accountSetting")))
            .unwrap_or_default())
    }

    /// Mailboxes of `domain`, sorted by uid. The catch-all `@domain` entry
    /// is excluded.
    pub async fn list_users(&self, domain: &str) -> DirectoryResult<Vec<MailUser>> {
        let base = self.session.resolver().users_container(domain)?;
        let filter = format!(
            "(&(objectClass=mailUser)(!(mail=@{})))",
            escape_filter_value(domain.trim())
        );
        let schema = MailUser::summary_schema();

        let records = self
            .session
            .search(&base, SearchScope::OneLevel, &filter, &schema.attribute_names())
            .await?;

        let mut users: Vec<MailUser> = records
            .iter()
            .filter_map(|record| match schema.decode_record(record) {
                Ok(entry) => Some(MailUser::from_entry(&entry)),
                Err(errors) => {
                    warn!(dn = %record.dn, %errors, "Skipping malformed user entry");
                    None
                }
            })
            .collect();

        users.sort_by(|a, b| a.uid.cmp(&b.uid));
        Ok(users)
    }

    async fn find_user(&self, domain: &str, uid: &str, attrs: &[&str]) -> DirectoryResult<Option<Record>> {
        let base = self.session.resolver().users_container(domain)?;
        let filter = format!(
            "(&(objectClass=mailUser)(uid={}))",
            escape_filter_value(uid.trim())
        );
        let records = self
            .session
            .search(&base, SearchScope::OneLevel, &filter, attrs)
            .await?;
        Ok(records.into_iter().next())
    }

    /// One mailbox by uid, `None` when it does not exist.
    pub async fn get_user(&self, domain: &str, uid: &str) -> DirectoryResult<Option<MailUser>> {
        let schema = MailUser::schema();
        let Some(record) = self.find_user(domain, uid, &schema.attribute_names()).await? else {
            return Ok(None);
        };
        let entry = schema.decode_record(&record)?;
        Ok(Some(MailUser::from_entry(&entry)))
    }

    pub async fn user_exists(&self, domain: &str, uid: &str) -> DirectoryResult<bool> {
        Ok(self.find_user(domain, uid, &["uid"]).await?.is_some())
    }

    /// Replace the editable attributes of a mailbox in one request.
    pub async fn update_user(&self, domain: &str, user: &MailUser) -> DirectoryResult<()> {
        user.validate()?;
        let dn = self.session.resolver().user(&user.uid, domain)?;

        let changes = ReplaceSetBuilder::new()
            .set(
                "domainGlobalAdmin",
                user.domain_global_admin.then(|| AttrValue::from("yes")),
            )
            .set("mailQuota", Some(AttrValue::Int(user.mail_quota * MIB)))
            .set("cn", Some(AttrValue::from(user.cn.as_str())))
            .set("givenName", Some(AttrValue::from(user.given_name.as_str())))
            .set("sn", Some(AttrValue::from(user.sn.as_str())))
            .set("employeeNumber", Some(AttrValue::from(user.employee_number.as_str())))
            .set("title", Some(AttrValue::from(user.title.as_str())))
            .set("telephoneNumber", Some(AttrValue::from(user.telephone_number.as_str())))
            .set("mobile", Some(AttrValue::from(user.mobile.as_str())))
            .set(
                "accountStatus",
                Some(AttrValue::from(account_status(user.account_status))),
            )
            .build();

        self.session.modify(&dn, changes).await?;
        info!(uid = %user.uid, domain = %domain, "Mailbox updated");
        Ok(())
    }

    /// Store a new credential hash for a mailbox.
    pub async fn update_user_password(&self, domain: &str, uid: &str, hash: &str) -> DirectoryResult<()> {
        if hash.is_empty() {
            return Err(DirectoryError::invalid_input("password hash must not be empty"));
        }
        let dn = self.session.resolver().user(uid, domain)?;
        let changes = encode(
            "userPassword",
            Some(&AttrValue::from(hash)),
            None,
            ChangeKind::Replace,
        );

        self.session.modify(&dn, changes).await?;
        info!(uid = %uid, domain = %domain, "Mailbox password updated");
        Ok(())
    }

    /// Create a mailbox entry with the given credential hash.
    pub async fn create_user(&self, domain: &str, user: &NewMailUser, hash: &str) -> DirectoryResult<()> {
        user.validate()?;
        if hash.is_empty() {
            return Err(DirectoryError::invalid_input("password hash must not be empty"));
        }
        if self.user_exists(domain, &user.uid).await? {
            let mut errors = ValidationErrors::new();
            errors.add_coded(
                "uid",
                "already_exists",
                format!("a user with id {} already exists", user.uid),
            );
            return Err(errors.into());
        }

        let resolver = self.session.resolver();
        let dn = resolver.user(&user.uid, domain)?;
        let uid = user.uid.trim();
        let mail = format!("{uid}@{}", domain.trim());
        let uid_value = AttrValue::from(uid);

        let classes = AttrValue::List(MAIL_USER_CLASSES.iter().map(|s| s.to_string()).collect());
        let services = AttrValue::List(DEFAULT_SERVICES.iter().map(|s| s.to_string()).collect());
        let fields: [(&str, Option<AttrValue>, Option<&AttrValue>); 11] = [
            ("objectClass", Some(classes), None),
            ("mail", Some(AttrValue::from(mail)), None),
            ("uid", Some(uid_value.clone()), None),
            ("cn", Some(AttrValue::from(user.cn.trim())), Some(&uid_value)),
            ("sn", Some(AttrValue::from(user.sn.trim())), Some(&uid_value)),
            ("givenName", Some(AttrValue::from(user.given_name.trim())), None),
            ("userPassword", Some(AttrValue::from(hash)), None),
            ("mailQuota", Some(AttrValue::Int(user.mail_quota * MIB)), None),
            (
                "accountStatus",
                Some(AttrValue::from(account_status(user.account_status))),
                None,
            ),
            ("enabledService", Some(services), None),
            (
                "domainGlobalAdmin",
                user.domain_global_admin.then(|| AttrValue::from("yes")),
                None,
            ),
        ];

        let attrs: Vec<(String, WireValues)> = fields
            .iter()
            .filter_map(|(attr, value, default)| entry_attrs(attr, value.as_ref(), *default))
            .collect();

        self.session.add(&dn, attrs).await?;
        info!(uid = %uid, domain = %domain, "Mailbox created");
        Ok(())
    }
}

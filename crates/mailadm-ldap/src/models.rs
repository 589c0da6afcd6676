//! Mail account models.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use mailadm_core::ValidationErrors;
use serde::Serialize;

use crate::schema::{AttrKind, Schema, TypedEntry};

/// Bytes per MiB; quotas are MiB in the model and bytes in the directory.
pub const MIB: i64 = 1024 * 1024;

/// Quota for new mailboxes when none is given, in MiB.
pub const DEFAULT_QUOTA_MIB: i64 = 100;

static UID_REGEX: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^[A-Za-z0-9._-]+$").expect("UID_REGEX is a valid regex pattern")
});

fn validate_uid(uid: &str, errors: &mut ValidationErrors) {
    if uid.trim().is_empty() {
        errors.add_coded("uid", "required", "is required");
    } else if !UID_REGEX.is_match(uid) {
        errors.add_coded(
            "uid",
            "invalid_format",
            "may only contain letters, digits, dots, underscores and hyphens",
        );
    }
}

fn validate_quota(quota_mib: i64, errors: &mut ValidationErrors) {
    if quota_mib < 0 {
        errors.add_coded("mailQuota", "negative", "must not be negative");
    } else if quota_mib.checked_mul(MIB).is_none() {
        errors.add_coded("mailQuota", "too_large", "is too large");
    }
}

/// A mailbox as shown and edited by an administrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MailUser {
    pub uid: String,
    pub mail: String,
    pub account_status: bool,
    /// Quota in MiB.
    pub mail_quota: i64,
    pub cn: String,
    pub given_name: String,
    pub sn: String,
    pub employee_number: String,
    pub title: String,
    pub mobile: String,
    pub telephone_number: String,
    pub domain_global_admin: bool,
}

impl MailUser {
    /// Attributes read for a full user view.
    #[must_use]
    pub fn schema() -> Schema {
        Self::summary_schema()
            .optional("cn", AttrKind::Str)
            .optional("givenName", AttrKind::Str)
            .optional("sn", AttrKind::Str)
            .optional("title", AttrKind::Str)
            .optional("telephoneNumber", AttrKind::Str)
            .optional("mobile", AttrKind::Str)
            .optional("employeeNumber", AttrKind::Str)
    }

    /// Attributes read for user listings.
    #[must_use]
    pub fn summary_schema() -> Schema {
        Schema::new()
            .optional("mail", AttrKind::Str)
            .optional("accountStatus", AttrKind::Bool)
            .optional("domainGlobalAdmin", AttrKind::Bool)
            .optional("mailQuota", AttrKind::Int)
            .required("uid", AttrKind::Str)
    }

    /// Build from a validated entry. The stored quota is in bytes.
    #[must_use]
    pub fn from_entry(entry: &TypedEntry) -> Self {
        Self {
            uid: entry.str_or_empty("uid"),
            mail: entry.str_or_empty("mail"),
            account_status: entry.bool("accountStatus").unwrap_or(false),
            mail_quota: entry.int("mailQuota").unwrap_or(0) / MIB,
            cn: entry.str_or_empty("cn"),
            given_name: entry.str_or_empty("givenName"),
            sn: entry.str_or_empty("sn"),
            employee_number: entry.str_or_empty("employeeNumber"),
            title: entry.str_or_empty("title"),
            mobile: entry.str_or_empty("mobile"),
            telephone_number: entry.str_or_empty("telephoneNumber"),
            domain_global_admin: entry.bool("domainGlobalAdmin").unwrap_or(false),
        }
    }

    /// Check every field and report all problems.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        validate_uid(&self.uid, &mut errors);
        validate_quota(self.mail_quota, &mut errors);
        errors.into_result()
    }

    /// Trim surrounding whitespace from every text field.
    #[must_use]
    pub fn trimmed(mut self) -> Self {
        for field in [
            &mut self.uid,
            &mut self.mail,
            &mut self.cn,
            &mut self.given_name,
            &mut self.sn,
            &mut self.employee_number,
            &mut self.title,
            &mut self.mobile,
            &mut self.telephone_number,
        ] {
            let trimmed = field.trim();
            if trimmed.len() != field.len() {
                *field = trimmed.to_string();
            }
        }
        self
    }
}

impl Default for MailUser {
    fn default() -> Self {
        Self {
            uid: String::new(),
            mail: String::new(),
            account_status: false,
            mail_quota: DEFAULT_QUOTA_MIB,
            cn: String::new(),
            given_name: String::new(),
            sn: String::new(),
            employee_number: String::new(),
            title: String::new(),
            mobile: String::new(),
            telephone_number: String::new(),
            domain_global_admin: false,
        }
    }
}

/// Input for creating a mailbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMailUser {
    pub uid: String,
    pub cn: String,
    pub given_name: String,
    pub sn: String,
    pub mail_quota: i64,
    pub account_status: bool,
    pub domain_global_admin: bool,
}

impl NewMailUser {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            cn: String::new(),
            given_name: String::new(),
            sn: String::new(),
            mail_quota: DEFAULT_QUOTA_MIB,
            account_status: true,
            domain_global_admin: false,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        validate_uid(&self.uid, &mut errors);
        validate_quota(self.mail_quota, &mut errors);
        errors.into_result()
    }
}

/// One row of the domain listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainSummary {
    pub name: String,
    pub active: bool,
    pub user_count: Option<i64>,
}

/// A parsed `accountSetting` value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SettingValue {
    Int(i64),
    List(Vec<String>),
    Text(String),
}

/// Keys whose value must be an integer (or `-1`, meaning "not allowed").
const INTEGER_SETTINGS: &[&str] = &[
    "defaultQuota",
    "maxUserQuota",
    "minPasswordLength",
    "maxPasswordLength",
    "numberOfUsers",
    "numberOfAliases",
    "numberOfLists",
    "create_max_domains",
    "create_max_quota",
    "create_max_users",
    "create_max_aliases",
    "create_max_lists",
];

/// Keys that may appear several times, one value each, collected lowercased.
const REPEATED_SETTINGS: &[&str] = &[
    "disabledDomainProfile",
    "disabledUserProfile",
    "disabledUserPreference",
    "disabledMailService",
];

/// Keys holding a comma-separated list in a single value.
const COMMA_LIST_SETTINGS: &[&str] = &["defaultList"];

/// Domain or admin settings stored in the multi-valued `accountSetting`
/// attribute as `key:value` strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AccountSettings {
    values: BTreeMap<String, SettingValue>,
}

impl AccountSettings {
    /// Parse raw `accountSetting` values. Entries without a `:` and integer
    /// keys with non-integer values are skipped.
    pub fn parse<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut values: BTreeMap<String, SettingValue> = BTreeMap::new();

        for item in raw {
            let Some((key, value)) = item.as_ref().split_once(':') else {
                continue;
            };

            if INTEGER_SETTINGS.contains(&key) {
                if value == "-1" || (!value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())) {
                    if let Ok(n) = value.parse::<i64>() {
                        values.insert(key.to_string(), SettingValue::Int(n));
                    }
                }
            } else if REPEATED_SETTINGS.contains(&key) {
                let value = value.to_lowercase();
                match values.get_mut(key) {
                    Some(SettingValue::List(items)) => items.push(value),
                    _ => {
                        values.insert(key.to_string(), SettingValue::List(vec![value]));
                    }
                }
            } else if COMMA_LIST_SETTINGS.contains(&key) {
                let items = value.split(',').map(str::to_string).collect();
                values.insert(key.to_string(), SettingValue::List(items));
            } else {
                values.insert(key.to_string(), SettingValue::Text(value.to_string()));
            }
        }

        Self { values }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&SettingValue> {
        self.values.get(key)
    }

    #[must_use]
    pub fn int(&self, key: &str) -> Option<i64> {
        match self.values.get(key) {
            Some(SettingValue::Int(n)) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn list(&self, key: &str) -> &[String] {
        match self.values.get(key) {
            Some(SettingValue::List(items)) => items,
            _ => &[],
        }
    }

    #[must_use]
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.values.get(key) {
            Some(SettingValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SettingValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dn::Dn;
    use crate::transport::Record;

    #[test]
    fn test_user_from_entry_converts_quota_and_flags() {
        let record = Record::new(Dn::from_server("mail=alice@example.com"))
            .with_attr("uid", &["alice"])
            .with_attr("mail", &["alice@example.com"])
            .with_attr("accountStatus", &["active"])
            .with_attr("domainGlobalAdmin", &["yes"])
            .with_attr("mailQuota", &["524288000"])
            .with_attr("cn", &["Alice Liddell"]);

        let entry = MailUser::schema().decode_record(&record).unwrap();
        let user = MailUser::from_entry(&entry);

        assert_eq!(user.uid, "alice");
        assert!(user.account_status);
        assert!(user.domain_global_admin);
        assert_eq!(user.mail_quota, 500);
        assert_eq!(user.cn, "Alice Liddell");
        assert_eq!(user.title, "");
    }

    #[test]
    fn test_validate_reports_every_field() {
        let user = MailUser {
            uid: "bad uid!".into(),
            mail_quota: -1,
            ..MailUser::default()
        };
        let errors = user.validate().unwrap_err();
        assert_eq!(errors.field_count(), 2);
        assert_eq!(errors.codes_for("uid"), vec!["invalid_format"]);
        assert_eq!(errors.codes_for("mailQuota"), vec!["negative"]);
    }

    #[test]
    fn test_validate_required_uid() {
        let errors = NewMailUser::new("  ").validate().unwrap_err();
        assert_eq!(errors.codes_for("uid"), vec!["required"]);
        assert!(NewMailUser::new("john.doe").validate().is_ok());
    }

    #[test]
    fn test_trimmed() {
        let user = MailUser {
            uid: " alice ".into(),
            cn: "Alice ".into(),
            ..MailUser::default()
        }
        .trimmed();
        assert_eq!(user.uid, "alice");
        assert_eq!(user.cn, "Alice");
    }

    #[test]
    fn test_parse_account_settings() {
        let settings = AccountSettings::parse([
            "defaultQuota:1024",
            "numberOfUsers:-1",
            "maxUserQuota:lots",
            "disabledMailService:SMTP",
            "disabledMailService:imap",
            "defaultList:a@example.com,b@example.com",
            "theme:dark:blue",
            "garbage",
        ]);

        assert_eq!(settings.int("defaultQuota"), Some(1024));
        assert_eq!(settings.int("numberOfUsers"), Some(-1));
        assert_eq!(settings.get("maxUserQuota"), None);
        assert_eq!(settings.list("disabledMailService"), ["smtp", "imap"]);
        assert_eq!(
            settings.list("defaultList"),
            ["a@example.com", "b@example.com"]
        );
        assert_eq!(settings.text("theme"), Some("dark:blue"));
        assert_eq!(settings.iter().count(), 5);
    }
}

//! Conversion between wire values and application values.
//!
//! On the wire every attribute is a list of byte strings. The application
//! side uses [`AttrValue`]; [`encode`] turns one into the [`Change`]s of a
//! modify request.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use ldap3::Mod;
use serde::Serialize;

/// All values of one attribute, as sent or received.
pub type WireValues = Vec<Vec<u8>>;

/// Typed application value of an attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Str(String),
    /// Ordered, duplicates dropped on encode.
    List(Vec<String>),
    Set(BTreeSet<String>),
}

impl AttrValue {
    /// Empty string or empty collection. Booleans and integers are never
    /// empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            AttrValue::Bool(_) | AttrValue::Int(_) => false,
            AttrValue::Str(s) => s.is_empty(),
            AttrValue::List(items) => items.is_empty(),
            AttrValue::Set(items) => items.is_empty(),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttrValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Bool(b) => f.write_str(bool_text(*b)),
            AttrValue::Int(i) => write!(f, "{i}"),
            AttrValue::Str(s) => f.write_str(s),
            AttrValue::List(items) => f.write_str(&items.join(", ")),
            AttrValue::Set(items) => {
                let items: Vec<&str> = items.iter().map(String::as_str).collect();
                f.write_str(&items.join(", "))
            }
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Str(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Str(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Int(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

impl From<Vec<String>> for AttrValue {
    fn from(value: Vec<String>) -> Self {
        AttrValue::List(value)
    }
}

impl From<BTreeSet<String>> for AttrValue {
    fn from(value: BTreeSet<String>) -> Self {
        AttrValue::Set(value)
    }
}

fn bool_text(value: bool) -> &'static str {
    if value {
        "TRUE"
    } else {
        "FALSE"
    }
}

/// Kind of a modify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Replace,
    Add,
    Delete,
}

/// One entry of a modify request. `values: None` is the absence marker:
/// with `Replace` or `Delete` it removes the whole attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub kind: ChangeKind,
    pub attr: String,
    pub values: Option<WireValues>,
}

impl Change {
    /// Replace with the absence marker.
    pub fn remove(attr: impl Into<String>) -> Self {
        Self {
            kind: ChangeKind::Replace,
            attr: attr.into(),
            values: None,
        }
    }

    #[must_use]
    pub fn is_removal(&self) -> bool {
        self.values.is_none()
    }

    /// Convert to the `ldap3` representation.
    pub fn into_mod(self) -> Mod<Vec<u8>> {
        let attr = self.attr.into_bytes();
        let values: HashSet<Vec<u8>> = self.values.unwrap_or_default().into_iter().collect();
        match self.kind {
            ChangeKind::Replace => Mod::Replace(attr, values),
            ChangeKind::Add => Mod::Add(attr, values),
            ChangeKind::Delete => Mod::Delete(attr, values),
        }
    }
}

/// Decode one wire value as UTF-8.
///
/// Bytes that are not valid UTF-8 are rendered as a diagnostic `b"..."`
/// string with escaped bytes instead of failing, so one malformed entry does
/// not abort a listing. That path is lossy.
#[must_use]
pub fn decode(raw: &[u8]) -> String {
    match std::str::from_utf8(raw) {
        Ok(text) => text.to_string(),
        Err(_) => format!("b\"{}\"", raw.escape_ascii()),
    }
}

/// Already-text input passes through unchanged.
#[must_use]
pub fn decode_str(text: &str) -> String {
    text.to_string()
}

#[must_use]
pub fn decode_values(values: &[Vec<u8>]) -> Vec<String> {
    values.iter().map(|v| decode(v)).collect()
}

#[must_use]
pub fn decode_first(values: &[Vec<u8>]) -> Option<String> {
    values.first().map(|v| decode(v))
}

/// Wire form of a value. Collections keep first-seen order and drop
/// duplicates.
#[must_use]
pub fn to_wire(value: &AttrValue) -> WireValues {
    match value {
        AttrValue::Bool(b) => vec![bool_text(*b).as_bytes().to_vec()],
        AttrValue::Int(i) => vec![i.to_string().into_bytes()],
        AttrValue::Str(s) => vec![s.as_bytes().to_vec()],
        AttrValue::List(items) => {
            let mut seen: HashSet<&str> = HashSet::with_capacity(items.len());
            items
                .iter()
                .filter(|item| seen.insert(item.as_str()))
                .map(|item| item.as_bytes().to_vec())
                .collect()
        }
        AttrValue::Set(items) => items.iter().map(|item| item.as_bytes().to_vec()).collect(),
    }
}

/// The value itself when non-empty, else the default when non-empty.
fn effective<'a>(value: Option<&'a AttrValue>, default: Option<&'a AttrValue>) -> Option<&'a AttrValue> {
    value
        .filter(|v| !v.is_empty())
        .or_else(|| default.filter(|d| !d.is_empty()))
}

/// Build the change for one attribute.
///
/// - `Replace`: an empty or absent value always yields the removal form; the
///   default is not consulted.
/// - `Add`: value (or default) when non-empty, otherwise nothing.
/// - `Delete`: the given values (or default) when non-empty, otherwise the
///   whole attribute is removed.
#[must_use]
pub fn encode(
    attr: &str,
    value: Option<&AttrValue>,
    default: Option<&AttrValue>,
    mode: ChangeKind,
) -> Vec<Change> {
    let change = |kind, values| Change {
        kind,
        attr: attr.to_string(),
        values,
    };

    match mode {
        ChangeKind::Replace => match value.filter(|v| !v.is_empty()) {
            Some(v) => vec![change(ChangeKind::Replace, Some(to_wire(v)))],
            None => vec![Change::remove(attr)],
        },
        ChangeKind::Add => match effective(value, default) {
            Some(v) => vec![change(ChangeKind::Add, Some(to_wire(v)))],
            None => Vec::new(),
        },
        ChangeKind::Delete => match effective(value, default) {
            Some(v) => vec![change(ChangeKind::Delete, Some(to_wire(v)))],
            None => vec![change(ChangeKind::Delete, None)],
        },
    }
}

/// Attribute/value pair for a new entry, or `None` when there is nothing to
/// store.
#[must_use]
pub fn entry_attrs(
    attr: &str,
    value: Option<&AttrValue>,
    default: Option<&AttrValue>,
) -> Option<(String, WireValues)> {
    effective(value, default).map(|v| (attr.to_string(), to_wire(v)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn s(value: &str) -> AttrValue {
        AttrValue::from(value)
    }

    #[test]
    fn test_decode_utf8_and_diagnostic() {
        assert_eq!(decode(b"alice"), "alice");
        assert_eq!(decode("Jürgen".as_bytes()), "Jürgen");
        assert_eq!(decode(&[0x66, 0xff, 0x6f]), "b\"f\\xffo\"");
        assert_eq!(decode_str("already"), "already");
    }

    #[test]
    fn test_decode_values_and_first() {
        let values: WireValues = vec![b"a".to_vec(), b"b".to_vec()];
        assert_eq!(decode_values(&values), vec!["a", "b"]);
        assert_eq!(decode_first(&values).as_deref(), Some("a"));
        assert_eq!(decode_first(&[]), None);
    }

    #[test]
    fn test_replace_with_value() {
        let changes = encode("cn", Some(&s("my name")), None, ChangeKind::Replace);
        assert_eq!(
            changes,
            vec![Change {
                kind: ChangeKind::Replace,
                attr: "cn".into(),
                values: Some(vec![b"my name".to_vec()]),
            }]
        );
    }

    #[test]
    fn test_replace_empty_ignores_default() {
        let default = s("fallback");
        for value in [
            None,
            Some(s("")),
            Some(AttrValue::List(vec![])),
            Some(AttrValue::Set(BTreeSet::new())),
        ] {
            let changes = encode("title", value.as_ref(), Some(&default), ChangeKind::Replace);
            assert_eq!(changes, vec![Change::remove("title")]);
        }
    }

    #[test]
    fn test_replace_int_is_stringified() {
        let changes = encode("mailQuota", Some(&AttrValue::Int(5)), None, ChangeKind::Replace);
        assert_eq!(changes[0].values, Some(vec![b"5".to_vec()]));
    }

    #[test]
    fn test_list_dedup_preserves_order() {
        let value = AttrValue::List(vec!["b".into(), "a".into(), "b".into(), "c".into()]);
        assert_eq!(
            to_wire(&value),
            vec![b"b".to_vec(), b"a".to_vec(), b"c".to_vec()]
        );
    }

    #[test]
    fn test_add_uses_default_and_skips_empty() {
        let default = s("x");
        let changes = encode("mailForwardingAddress", Some(&s("")), Some(&default), ChangeKind::Add);
        assert_eq!(changes[0].kind, ChangeKind::Add);
        assert_eq!(changes[0].values, Some(vec![b"x".to_vec()]));
        assert!(encode("a", None, None, ChangeKind::Add).is_empty());
        assert!(encode("a", Some(&s("")), None, ChangeKind::Add).is_empty());
    }

    #[test]
    fn test_delete_rules() {
        let whole = encode("mobile", None, None, ChangeKind::Delete);
        assert_eq!(
            whole,
            vec![Change {
                kind: ChangeKind::Delete,
                attr: "mobile".into(),
                values: None,
            }]
        );

        let specific = encode("mobile", Some(&s("123")), None, ChangeKind::Delete);
        assert_eq!(specific[0].values, Some(vec![b"123".to_vec()]));

        let empty = encode("mobile", Some(&s("")), None, ChangeKind::Delete);
        assert_eq!(empty, whole);
    }

    #[test]
    fn test_entry_attrs() {
        assert_eq!(
            entry_attrs("uid", Some(&s("alice")), None),
            Some(("uid".to_string(), vec![b"alice".to_vec()]))
        );
        assert_eq!(entry_attrs("uid", Some(&s("")), None), None);
        assert_eq!(
            entry_attrs("mailQuota", None, Some(&AttrValue::Int(0))),
            Some(("mailQuota".to_string(), vec![b"0".to_vec()]))
        );
    }

    #[test]
    fn test_into_mod() {
        let change = encode("cn", Some(&s("Alice")), None, ChangeKind::Replace).remove(0);
        match change.into_mod() {
            Mod::Replace(attr, values) => {
                assert_eq!(attr, b"cn".to_vec());
                assert!(values.contains(&b"Alice".to_vec()));
            }
            other => panic!("unexpected mod {other:?}"),
        }

        match Change::remove("title").into_mod() {
            Mod::Replace(_, values) => assert!(values.is_empty()),
            other => panic!("unexpected mod {other:?}"),
        }
    }

    #[test]
    fn test_bool_wire_form() {
        assert_eq!(to_wire(&AttrValue::Bool(true)), vec![b"TRUE".to_vec()]);
        assert_eq!(AttrValue::Bool(false).to_string(), "FALSE");
    }

    proptest! {
        #[test]
        fn prop_string_round_trip(value in any::<String>()) {
            let wire = to_wire(&AttrValue::Str(value.clone()));
            prop_assert_eq!(decode(&wire[0]), value);
        }

        #[test]
        fn prop_printable_ascii_round_trip(value in "[ -~]*") {
            let wire = to_wire(&AttrValue::Str(value.clone()));
            prop_assert_eq!(decode_first(&wire), Some(value));
        }

        #[test]
        fn prop_replace_empty_is_removal(default in "[a-z]{0,8}") {
            let default = AttrValue::Str(default);
            let changes = encode("attr", Some(&AttrValue::Str(String::new())), Some(&default), ChangeKind::Replace);
            prop_assert_eq!(changes, vec![Change::remove("attr")]);
        }
    }
}

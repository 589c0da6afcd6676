//! Expected shapes of directory attributes.
//!
//! A [`Schema`] names the attributes an application reads and the variant
//! each one must decode to. [`Schema::decode_record`] checks every named
//! attribute at decode time and reports all failures at once.

use std::collections::{BTreeSet, HashMap};

use mailadm_core::ValidationErrors;

use crate::codec::{decode, decode_values, AttrValue};
use crate::dn::Dn;
use crate::transport::Record;

/// Variant an attribute must decode to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrKind {
    Bool,
    Int,
    Str,
    List,
    Set,
}

#[derive(Debug, Clone)]
struct AttrSpec {
    name: String,
    kind: AttrKind,
    required: bool,
}

/// Attribute name to expected kind, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    attrs: Vec<AttrSpec>,
}

impl Schema {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an optional attribute.
    #[must_use]
    pub fn optional(mut self, name: &str, kind: AttrKind) -> Self {
        self.attrs.push(AttrSpec {
            name: name.to_string(),
            kind,
            required: false,
        });
        self
    }

    /// Declare an attribute that must be present with at least one value.
    #[must_use]
    pub fn required(mut self, name: &str, kind: AttrKind) -> Self {
        self.attrs.push(AttrSpec {
            name: name.to_string(),
            kind,
            required: true,
        });
        self
    }

    /// Attribute names to request in a search.
    #[must_use]
    pub fn attribute_names(&self) -> Vec<&str> {
        self.attrs.iter().map(|a| a.name.as_str()).collect()
    }

    #[must_use]
    pub fn kind_of(&self, name: &str) -> Option<AttrKind> {
        self.attrs
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
            .map(|a| a.kind)
    }

    /// Decode and validate a record against this schema.
    ///
    /// Attributes the schema does not name are ignored. Attribute names are
    /// matched case-insensitively, as the directory does.
    pub fn decode_record(&self, record: &Record) -> Result<TypedEntry, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let mut values = HashMap::with_capacity(self.attrs.len());

        for spec in &self.attrs {
            let raw = record
                .attrs
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(&spec.name))
                .map(|(_, v)| v)
                .filter(|v| !v.is_empty());

            let Some(raw) = raw else {
                if spec.required {
                    errors.add_coded(&spec.name, "required", "is required");
                }
                continue;
            };

            match decode_as(spec.kind, raw) {
                Ok(value) => {
                    values.insert(spec.name.clone(), value);
                }
                Err((code, message)) => errors.add_coded(&spec.name, code, message),
            }
        }

        errors.into_result()?;
        Ok(TypedEntry {
            dn: record.dn.clone(),
            values,
        })
    }
}

fn decode_as(kind: AttrKind, raw: &[Vec<u8>]) -> Result<AttrValue, (&'static str, String)> {
    let single = || -> Result<String, (&'static str, String)> {
        match raw {
            [one] => Ok(decode(one)),
            _ => Err((
                "multiple_values",
                format!("expected a single value, got {}", raw.len()),
            )),
        }
    };

    match kind {
        AttrKind::Str => single().map(AttrValue::Str),
        AttrKind::Int => {
            let text = single()?;
            text.trim()
                .parse::<i64>()
                .map(AttrValue::Int)
                .map_err(|_| ("not_an_integer", format!("'{text}' is not an integer")))
        }
        AttrKind::Bool => {
            let text = single()?;
            parse_bool(&text)
                .map(AttrValue::Bool)
                .ok_or_else(|| ("not_a_boolean", format!("'{text}' is not a boolean")))
        }
        AttrKind::List => Ok(AttrValue::List(decode_values(raw))),
        AttrKind::Set => Ok(AttrValue::Set(
            decode_values(raw).into_iter().collect::<BTreeSet<_>>(),
        )),
    }
}

/// Directory spellings of a boolean.
#[must_use]
pub fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "active" | "1" => Some(true),
        "false" | "no" | "disabled" | "0" => Some(false),
        _ => None,
    }
}

/// A record whose attributes passed schema validation.
#[derive(Debug, Clone)]
pub struct TypedEntry {
    dn: Dn,
    values: HashMap<String, AttrValue>,
}

impl TypedEntry {
    #[must_use]
    pub fn dn(&self) -> &Dn {
        &self.dn
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.values.get(name)
    }

    #[must_use]
    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(AttrValue::as_str)
    }

    /// String attribute, or the empty string when absent.
    #[must_use]
    pub fn str_or_empty(&self, name: &str) -> String {
        self.str(name).unwrap_or_default().to_string()
    }

    #[must_use]
    pub fn int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(AttrValue::as_int)
    }

    #[must_use]
    pub fn bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(AttrValue::as_bool)
    }

    /// Values of a list or set attribute; empty when absent.
    #[must_use]
    pub fn strings(&self, name: &str) -> Vec<String> {
        match self.get(name) {
            Some(AttrValue::List(items)) => items.clone(),
            Some(AttrValue::Set(items)) => items.iter().cloned().collect(),
            Some(AttrValue::Str(s)) => vec![s.clone()],
            _ => Vec::new(),
        }
    }
}

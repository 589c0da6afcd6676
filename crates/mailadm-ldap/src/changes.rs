//! Whole-record replace sets.
//!
//! Partial single-attribute updates call [`crate::codec::encode`] directly;
//! this module is for rewriting every editable attribute of an entry in one
//! modify request.

use crate::codec::{encode, AttrValue, Change, ChangeKind};

/// Replace change for every `(attribute, desired value)` pair, in the order
/// given. `None` or an empty value removes the attribute.
pub fn build_replace_set<'a, I>(desired: I) -> Vec<Change>
where
    I: IntoIterator<Item = (&'a str, Option<AttrValue>)>,
{
    desired
        .into_iter()
        .flat_map(|(attr, value)| encode(attr, value.as_ref(), None, ChangeKind::Replace))
        .collect()
}

/// Fluent form of [`build_replace_set`].
#[derive(Debug, Default)]
pub struct ReplaceSetBuilder {
    changes: Vec<Change>,
}

impl ReplaceSetBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn set(mut self, attr: &str, value: Option<AttrValue>) -> Self {
        self.changes
            .extend(encode(attr, value.as_ref(), None, ChangeKind::Replace));
        self
    }

    #[must_use]
    pub fn build(self) -> Vec<Change> {
        self.changes
    }
}

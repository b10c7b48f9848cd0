//! Name Index
//!
//! Reference to display name lookup produced by one aggregation run.

use super::reference::{Category, ObjectReference};
use crate::error::{Error, Result};
use std::collections::HashMap;

/// Rendered in place of a name that could not be resolved
pub const UNAVAILABLE: &str = "<unavailable>";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameIndex {
    names: HashMap<ObjectReference, String>,
}

impl NameIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one category's names. A reference already present means it was
    /// collected under two categories.
    pub fn merge(&mut self, category: Category, names: HashMap<ObjectReference, String>) -> Result<()> {
        for (reference, name) in names {
            if self.names.contains_key(&reference) {
                return Err(Error::invariant(format!(
                    "reference {} resolved again under category {}",
                    reference, category
                )));
            }
            self.names.insert(reference, name);
        }
        Ok(())
    }

    pub fn get(&self, reference: &ObjectReference) -> Option<&str> {
        self.names.get(reference).map(String::as_str)
    }

    /// Name for display, falling back to [`UNAVAILABLE`]
    pub fn display(&self, reference: &ObjectReference) -> &str {
        self.get(reference).unwrap_or(UNAVAILABLE)
    }

    /// Names for several references joined in the given order
    pub fn join(&self, references: &[ObjectReference]) -> String {
        references
            .iter()
            .map(|r| self.display(r))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn contains(&self, reference: &ObjectReference) -> bool {
        self.names.contains_key(reference)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl FromIterator<(ObjectReference, String)> for NameIndex {
    fn from_iter<I: IntoIterator<Item = (ObjectReference, String)>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().collect(),
        }
    }
}

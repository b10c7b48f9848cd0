//! Reference Set
//!
//! Collects secondary references per category without duplicates, keeping the
//! order in which each reference was first seen.

use super::reference::{Category, ObjectReference};
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Default)]
pub struct ReferenceSet {
    seen: HashSet<ObjectReference>,
    by_category: BTreeMap<Category, Vec<ObjectReference>>,
}

impl ReferenceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a reference; returns false if it was already collected
    pub fn add(&mut self, category: Category, reference: &ObjectReference) -> bool {
        if self.seen.contains(reference) {
            return false;
        }
        self.seen.insert(reference.clone());
        self.by_category
            .entry(category)
            .or_default()
            .push(reference.clone());
        true
    }

    /// References collected for a category, in first-seen order
    pub fn references(&self, category: Category) -> &[ObjectReference] {
        self.by_category
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Categories that have at least one reference
    pub fn categories(&self) -> impl Iterator<Item = Category> + '_ {
        self.by_category
            .iter()
            .filter(|(_, refs)| !refs.is_empty())
            .map(|(category, _)| *category)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ObjectReference> {
        self.by_category.values().flatten()
    }
}

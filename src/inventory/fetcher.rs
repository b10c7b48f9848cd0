//! Category Fetcher
//!
//! Resolves the display names of one category's references with a single
//! batched retrieval.

use super::reference::{Category, ObjectReference};
use crate::error::{Error, Result};
use crate::vsphere::collector::{property_str, CollectorError, PropertyCollector};
use std::collections::HashMap;

/// The only property requested for secondary objects
pub const NAME_PROPERTY: &str = "name";

pub struct CategoryFetcher<'a, C: ?Sized> {
    collector: &'a C,
    category: Category,
}

impl<'a, C: PropertyCollector + ?Sized> CategoryFetcher<'a, C> {
    pub fn new(collector: &'a C, category: Category) -> Self {
        Self {
            collector,
            category,
        }
    }

    /// Fetch names for a non-empty batch of references
    pub async fn fetch(
        &self,
        references: &[ObjectReference],
    ) -> Result<HashMap<ObjectReference, String>> {
        if references.is_empty() {
            return Err(Error::invariant(format!(
                "empty {} batch passed to fetcher",
                self.category
            )));
        }

        tracing::debug!(
            "Fetching {} name(s) for category {}",
            references.len(),
            self.category
        );

        let properties = [NAME_PROPERTY.to_string()];
        let bags = self
            .collector
            .retrieve(references, Some(&properties))
            .await
            .map_err(|source| self.retrieval_error(references, source))?;

        let mut names = HashMap::with_capacity(references.len());
        for reference in references {
            let Some(bag) = bags.get(reference) else {
                return Err(self.retrieval_error(
                    references,
                    CollectorError::NotFound(reference.clone()),
                ));
            };
            let Some(name) = property_str(bag, NAME_PROPERTY) else {
                return Err(self.retrieval_error(
                    references,
                    CollectorError::Malformed {
                        reference: reference.clone(),
                        detail: "missing name property".to_string(),
                    },
                ));
            };
            names.insert(reference.clone(), name.to_string());
        }

        Ok(names)
    }

    fn retrieval_error(&self, references: &[ObjectReference], source: CollectorError) -> Error {
        tracing::warn!(
            "Retrieval of {} {} name(s) failed: {}",
            references.len(),
            self.category,
            source
        );
        Error::Retrieval {
            category: self.category,
            count: references.len(),
            source,
        }
    }
}

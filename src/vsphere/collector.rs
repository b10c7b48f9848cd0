//! Property Collector
//!
//! The two server operations the aggregation core depends on: bulk property
//! retrieval and waiting for an object to reach a state.

use crate::inventory::ObjectReference;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::Duration;

/// Properties of one managed object, keyed by property path
pub type PropertyBag = Map<String, Value>;

/// Predicate evaluated against an object's properties while waiting
pub type Predicate = dyn Fn(&PropertyBag) -> bool + Send + Sync;

#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    #[error("object {0} not found")]
    NotFound(ObjectReference),

    #[error("timed out after {after:?} waiting on {reference}")]
    Timeout {
        reference: ObjectReference,
        after: Duration,
    },

    #[error("malformed response for {reference}: {detail}")]
    Malformed {
        reference: ObjectReference,
        detail: String,
    },

    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

#[async_trait]
pub trait PropertyCollector: Send + Sync {
    /// Retrieve properties for a batch of references in one round trip.
    ///
    /// `None` loads every property. The returned map carries no ordering.
    async fn retrieve(
        &self,
        references: &[ObjectReference],
        properties: Option<&[String]>,
    ) -> Result<HashMap<ObjectReference, PropertyBag>, CollectorError>;

    /// Block until `predicate` holds for `reference` and return the properties
    /// it was last observed with.
    async fn wait_until(
        &self,
        reference: &ObjectReference,
        properties: &[String],
        predicate: &Predicate,
    ) -> Result<PropertyBag, CollectorError>;
}

/// Look up a property by path.
///
/// Bags loaded with an explicit projection carry flat keys such as
/// `guest.ipAddress`; bags loaded with every property nest them instead.
pub fn property<'a>(bag: &'a PropertyBag, path: &str) -> Option<&'a Value> {
    if let Some(value) = bag.get(path) {
        return Some(value);
    }

    let mut parts = path.split('.');
    let mut current = bag.get(parts.next()?)?;
    for part in parts {
        current = current.get(part)?;
    }
    Some(current)
}

/// Look up a string property, treating empty strings as absent
pub fn property_str<'a>(bag: &'a PropertyBag, path: &str) -> Option<&'a str> {
    property(bag, path)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
}

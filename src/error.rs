//! Errors surfaced by an aggregation run

use crate::inventory::{Category, ObjectReference};
use crate::vsphere::collector::CollectorError;
use std::time::Duration;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to retrieve {category} names for {count} reference(s)")]
    Retrieval {
        category: Category,
        count: usize,
        #[source]
        source: CollectorError,
    },

    #[error("failed to load virtual machine {reference}")]
    Primary {
        reference: ObjectReference,
        #[source]
        source: CollectorError,
    },

    #[error("failed to look up virtual machines")]
    Lookup(#[source] CollectorError),

    #[error("no virtual machines matched {0}")]
    NotFound(String),

    #[error("timed out after {after:?} while {stage}")]
    Timeout { stage: &'static str, after: Duration },

    #[error("invariant violated: {0}")]
    Invariant(String),
}

impl Error {
    /// Category whose batched lookup failed, if any
    pub fn category(&self) -> Option<Category> {
        match self {
            Self::Retrieval { category, .. } => Some(*category),
            _ => None,
        }
    }

    pub(crate) fn invariant(message: String) -> Self {
        tracing::error!("{}", message);
        Self::Invariant(message)
    }
}

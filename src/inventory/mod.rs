//! Inventory aggregation
//!
//! Resolves the secondary objects a set of virtual machines points at
//! (hosts, datastores, networks and distributed port-groups) so they can be
//! reported by name.
//!
//! # Architecture
//!
//! - [`reference`] - Object references and the categories they fall into
//! - [`reference_set`] - Deduplicating per-category reference collector
//! - [`fetcher`] - One batched name lookup per category
//! - [`aggregator`] - Discovery, dispatch and merge into a [`NameIndex`]
//! - [`model`] - Typed view over a virtual machine's properties
//!
//! # Example
//!
//! ```ignore
//! use vminfo::inventory::{Aggregator, ReportOptions};
//!
//! async fn names(client: &VsphereClient, vms: &mut [VirtualMachine]) -> vminfo::Result<NameIndex> {
//!     Aggregator::new(client, ReportOptions::default()).aggregate(vms).await
//! }
//! ```

pub mod aggregator;
pub mod fetcher;
pub mod model;
mod name_index;
mod options;
pub mod reference;
mod reference_set;

pub use aggregator::{discover, Aggregator, Deadline};
pub use fetcher::CategoryFetcher;
pub use model::VirtualMachine;
pub use name_index::{NameIndex, UNAVAILABLE};
pub use options::ReportOptions;
pub use reference::{Category, ObjectReference};
pub use reference_set::ReferenceSet;

//! vSphere API interaction module
//!
//! Transport side of the tool: sessions, HTTP calls to the property gateway,
//! and the [`collector::PropertyCollector`] implementation the aggregation
//! core runs against.
//!
//! # Module Structure
//!
//! - [`auth`] - Session creation and caching from basic credentials
//! - [`client`] - Main client for making gateway requests
//! - [`collector`] - Property retrieval and wait operations
//! - [`finder`] - Inventory path lookup for virtual machines
//! - [`http`] - HTTP utilities for REST API calls
//!
//! # Example
//!
//! ```ignore
//! use vminfo::vsphere::client::VsphereClient;
//!
//! async fn example(client: &VsphereClient) -> anyhow::Result<()> {
//!     let vms = vminfo::vsphere::finder::find_virtual_machines(client, &[]).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod collector;
pub mod finder;
pub mod http;

//! vminfo
//!
//! Reports on virtual machines with the names of their hosts, datastores and
//! networks resolved. References are collected across every virtual machine
//! first, deduplicated, and resolved with one batched property retrieval per
//! category.
//!
//! - [`inventory`] - Reference discovery, batched name resolution and the VM model
//! - [`render`] - Ordered report rows and their text/JSON writers
//! - [`vsphere`] - Gateway transport implementing the property collector
//! - [`info`] - The end-to-end report command

pub mod config;
pub mod error;
pub mod info;
pub mod inventory;
pub mod render;
pub mod vsphere;

pub use error::{Error, Result};

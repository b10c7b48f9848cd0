//! Report options
//!
//! Feature toggles that decide which properties are loaded for virtual
//! machines and which reference categories get resolved.

use super::model::{PROP_DATASTORE, PROP_EXTRA_CONFIG, PROP_IP_ADDRESS, PROP_NETWORK, PROP_SUMMARY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOptions {
    /// General summary, including the host name
    pub general: bool,
    /// ExtraConfig key/value pairs
    pub extra_config: bool,
    /// Resource usage, including datastore and network names
    pub resources: bool,
    /// Wait for each virtual machine to report a guest IP address
    pub wait_for_ip: bool,
    /// Structured output loads every property
    pub json: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            general: true,
            extra_config: false,
            resources: false,
            wait_for_ip: false,
            json: false,
        }
    }
}

impl ReportOptions {
    /// Properties to load for virtual machines; `None` loads everything
    pub fn primary_properties(&self) -> Option<Vec<String>> {
        if self.json {
            return None;
        }

        let mut props = vec![PROP_SUMMARY];
        if self.general {
            props.push(PROP_IP_ADDRESS);
        }
        if self.extra_config {
            props.push(PROP_EXTRA_CONFIG);
        }
        if self.resources {
            props.extend([PROP_DATASTORE, PROP_NETWORK]);
        }

        Some(props.into_iter().map(String::from).collect())
    }
}

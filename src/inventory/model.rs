//! Virtual machine model
//!
//! Typed view over the property bag retrieved for a virtual machine.

use super::reference::ObjectReference;
use crate::vsphere::collector::{property, property_str, PropertyBag};
use serde::de::DeserializeOwned;
use serde::Deserialize;

pub const PROP_SUMMARY: &str = "summary";
pub const PROP_IP_ADDRESS: &str = "guest.ipAddress";
pub const PROP_EXTRA_CONFIG: &str = "config.extraConfig";
pub const PROP_DATASTORE: &str = "datastore";
pub const PROP_NETWORK: &str = "network";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VmSummary {
    pub config: SummaryConfig,
    pub runtime: SummaryRuntime,
    pub guest: SummaryGuest,
    pub quick_stats: QuickStats,
    pub storage: StorageSummary,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SummaryConfig {
    pub name: String,
    pub uuid: String,
    pub guest_full_name: String,
    #[serde(rename = "memorySizeMB")]
    pub memory_size_mb: i64,
    pub num_cpu: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SummaryRuntime {
    pub host: Option<ObjectReference>,
    pub power_state: String,
    pub boot_time: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SummaryGuest {
    pub ip_address: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuickStats {
    pub overall_cpu_usage: i64,
    pub host_memory_usage: i64,
    pub guest_memory_usage: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageSummary {
    pub committed: i64,
    pub uncommitted: i64,
    pub unshared: i64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OptionValue {
    pub key: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

/// A virtual machine being reported on
#[derive(Debug, Clone)]
pub struct VirtualMachine {
    pub reference: ObjectReference,
    pub inventory_path: String,
    pub properties: PropertyBag,
    pub summary: VmSummary,
    pub datastores: Vec<ObjectReference>,
    pub networks: Vec<ObjectReference>,
    pub extra_config: Vec<OptionValue>,
}

impl VirtualMachine {
    pub fn new(reference: ObjectReference, inventory_path: &str, properties: PropertyBag) -> Self {
        let summary = typed::<VmSummary>(&properties, PROP_SUMMARY);
        let datastores = typed(&properties, PROP_DATASTORE);
        let networks = typed(&properties, PROP_NETWORK);
        let extra_config = typed(&properties, PROP_EXTRA_CONFIG);

        Self {
            reference,
            inventory_path: inventory_path.to_string(),
            properties,
            summary,
            datastores,
            networks,
            extra_config,
        }
    }

    /// Replace the properties after a refresh
    pub fn refresh(&mut self, properties: PropertyBag) {
        *self = Self::new(self.reference.clone(), &self.inventory_path, properties);
    }

    pub fn name(&self) -> &str {
        if self.summary.config.name.is_empty() {
            &self.reference.value
        } else {
            &self.summary.config.name
        }
    }

    pub fn host(&self) -> Option<&ObjectReference> {
        self.summary.runtime.host.as_ref()
    }

    /// Guest IP address, from `guest.ipAddress` or the summary
    pub fn ip_address(&self) -> Option<&str> {
        property_str(&self.properties, PROP_IP_ADDRESS).or_else(|| {
            self.summary
                .guest
                .ip_address
                .as_deref()
                .filter(|ip| !ip.is_empty())
        })
    }
}

/// Whether a freshly observed bag carries a guest IP address
pub fn has_ip_address(bag: &PropertyBag) -> bool {
    property_str(bag, PROP_IP_ADDRESS).is_some()
}

fn typed<T: DeserializeOwned + Default>(bag: &PropertyBag, path: &str) -> T {
    let Some(value) = property(bag, path) else {
        return T::default();
    };

    match serde_json::from_value(value.clone()) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!("Ignoring malformed property {}: {}", path, e);
            T::default()
        }
    }
}

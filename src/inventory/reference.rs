//! Object references and reference categories

use serde::{Deserialize, Serialize};
use std::fmt;

/// Managed object kind of a virtual machine
pub const VIRTUAL_MACHINE: &str = "VirtualMachine";

/// Identifier of a managed object on the server.
///
/// Two references naming the same object compare equal no matter where they
/// were observed, so they can be used directly as map keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectReference {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

impl ObjectReference {
    pub fn new(kind: &str, value: &str) -> Self {
        Self {
            kind: kind.to_string(),
            value: value.to_string(),
        }
    }

    pub fn virtual_machine(value: &str) -> Self {
        Self::new(VIRTUAL_MACHINE, value)
    }
}

impl fmt::Display for ObjectReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.value)
    }
}

/// Secondary object categories, one batched name lookup each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Host,
    Datastore,
    Network,
    DistributedPortgroup,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Host,
        Category::Datastore,
        Category::Network,
        Category::DistributedPortgroup,
    ];

    /// Managed object kind collected under this category
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Host => "HostSystem",
            Self::Datastore => "Datastore",
            Self::Network => "Network",
            Self::DistributedPortgroup => "DistributedVirtualPortgroup",
        }
    }

    /// Category a reference belongs to, if any
    pub fn of(reference: &ObjectReference) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|category| category.kind() == reference.kind)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Host => "host",
            Self::Datastore => "datastore",
            Self::Network => "network",
            Self::DistributedPortgroup => "port-group",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

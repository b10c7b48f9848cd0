//! Ordered Renderer
//!
//! Turns virtual machines and a resolved [`NameIndex`] into report rows, in
//! the order the caller listed the virtual machines, and writes them as an
//! aligned text report or as JSON.

use crate::inventory::model::OptionValue;
use crate::inventory::{NameIndex, ObjectReference, ReportOptions, VirtualMachine, UNAVAILABLE};
use crate::vsphere::collector::PropertyBag;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::io::{self, Write};

/// Padding between a key column and its value
const CELL_PADDING: usize = 2;

/// One virtual machine ready for output
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedRow {
    pub reference: ObjectReference,
    pub name: String,
    pub path: String,
    #[serde(serialize_with = "pairs_as_map")]
    pub fields: Vec<(String, String)>,
    #[serde(serialize_with = "pairs_as_map", skip_serializing_if = "Vec::is_empty")]
    pub extra_config: Vec<(String, String)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<PropertyBag>,
}

fn pairs_as_map<S: Serializer>(pairs: &[(String, String)], serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(pairs.len()))?;
    for (key, value) in pairs {
        map.serialize_entry(key, value)?;
    }
    map.end()
}

pub struct OrderedRenderer<'a> {
    index: &'a NameIndex,
    options: ReportOptions,
}

impl<'a> OrderedRenderer<'a> {
    pub fn new(index: &'a NameIndex, options: ReportOptions) -> Self {
        Self { index, options }
    }

    /// Render rows in the order of `primaries`
    pub fn render(&self, primaries: &[VirtualMachine]) -> Vec<RenderedRow> {
        primaries.iter().map(|vm| self.render_one(vm)).collect()
    }

    fn render_one(&self, vm: &VirtualMachine) -> RenderedRow {
        let s = &vm.summary;
        let mut fields = Vec::new();

        if self.options.general {
            let host = vm
                .host()
                .map(|h| self.index.display(h))
                .unwrap_or(UNAVAILABLE);

            fields.extend([
                ("Path", vm.inventory_path.clone()),
                ("UUID", s.config.uuid.clone()),
                ("Guest name", s.config.guest_full_name.clone()),
                ("Memory", format!("{}MB", s.config.memory_size_mb)),
                ("CPU", format!("{} vCPU(s)", s.config.num_cpu)),
                ("Power state", s.runtime.power_state.clone()),
                ("Boot time", format_boot_time(s.runtime.boot_time.as_deref())),
                ("IP address", vm.ip_address().unwrap_or_default().to_string()),
                ("Host", host.to_string()),
            ]);
        }

        if self.options.resources {
            fields.extend([
                ("CPU usage", format!("{}MHz", s.quick_stats.overall_cpu_usage)),
                ("Host memory usage", format!("{}MB", s.quick_stats.host_memory_usage)),
                ("Guest memory usage", format!("{}MB", s.quick_stats.guest_memory_usage)),
                ("Storage uncommitted", format_bytes(s.storage.uncommitted)),
                ("Storage committed", format_bytes(s.storage.committed)),
                ("Storage unshared", format_bytes(s.storage.unshared)),
                ("Storage", self.index.join(&vm.datastores)),
                ("Network", self.index.join(&vm.networks)),
            ]);
        }

        let extra_config = if self.options.extra_config {
            vm.extra_config.iter().map(option_pair).collect()
        } else {
            Vec::new()
        };

        RenderedRow {
            reference: vm.reference.clone(),
            name: vm.name().to_string(),
            path: vm.inventory_path.clone(),
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            extra_config,
            properties: self.options.json.then(|| vm.properties.clone()),
        }
    }
}

fn option_pair(option: &OptionValue) -> (String, String) {
    let value = match &option.value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    };
    (option.key.clone(), value)
}

fn format_boot_time(boot_time: Option<&str>) -> String {
    let Some(raw) = boot_time else {
        return "-".to_string();
    };
    match chrono::DateTime::parse_from_rfc3339(raw) {
        Ok(ts) => ts
            .with_timezone(&chrono::Utc)
            .format("%Y-%m-%d %H:%M:%S UTC")
            .to_string(),
        Err(_) => raw.to_string(),
    }
}

/// Format bytes to human readable
fn format_bytes(bytes: i64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;
    const TB: f64 = GB * 1024.0;

    let b = bytes as f64;
    if b >= TB {
        format!("{:.1}TB", b / TB)
    } else if b >= GB {
        format!("{:.1}GB", b / GB)
    } else if b >= MB {
        format!("{:.1}MB", b / MB)
    } else if b >= KB {
        format!("{:.1}KB", b / KB)
    } else {
        format!("{}B", bytes)
    }
}

struct Line {
    key: String,
    value: Option<String>,
}

fn text_lines(rows: &[RenderedRow]) -> Vec<Line> {
    let cell = |indent: usize, key: &str, value: &str| Line {
        key: format!("{:indent$}{}:", "", key, indent = indent),
        value: Some(value.to_string()),
    };

    let mut lines = Vec::new();
    for row in rows {
        lines.push(cell(0, "Name", &row.name));
        for (key, value) in &row.fields {
            lines.push(cell(2, key, value));
        }
        if !row.extra_config.is_empty() {
            lines.push(Line {
                key: "  ExtraConfig:".to_string(),
                value: None,
            });
            for (key, value) in &row.extra_config {
                lines.push(cell(4, key, value));
            }
        }
    }
    lines
}

/// Write rows as two-space-indented key/value text.
///
/// Values line up within each run of key/value lines; a line without a
/// value (the ExtraConfig header) starts a new run.
pub fn write_text<W: Write>(rows: &[RenderedRow], out: &mut W) -> io::Result<()> {
    let lines = text_lines(rows);

    for block in lines.split_inclusive(|l| l.value.is_none()) {
        let width = block
            .iter()
            .filter(|l| l.value.is_some())
            .map(|l| l.key.chars().count())
            .max()
            .unwrap_or(0)
            + CELL_PADDING;

        for line in block {
            match &line.value {
                Some(value) => writeln!(out, "{:width$}{}", line.key, value, width = width)?,
                None => writeln!(out, "{}", line.key)?,
            }
        }
    }

    out.flush()
}

/// Write rows as a JSON document
pub fn write_json<W: Write>(rows: &[RenderedRow], out: &mut W) -> io::Result<()> {
    let document = serde_json::json!({ "virtualMachines": rows });
    serde_json::to_writer_pretty(&mut *out, &document)?;
    writeln!(out)?;
    out.flush()
}

//! Virtual machine info report
//!
//! Looks up virtual machines by path, loads their properties, resolves the
//! names of everything they reference and writes the report.

use crate::error::{Error, Result};
use crate::inventory::{Aggregator, Deadline, ReportOptions, VirtualMachine};
use crate::render::{write_json, write_text, OrderedRenderer, RenderedRow};
use crate::vsphere::client::VsphereClient;
use crate::vsphere::collector::{CollectorError, PropertyCollector};
use crate::vsphere::finder::find_virtual_machines;
use std::collections::HashSet;
use std::io::Write;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct InfoRequest {
    /// Inventory paths; empty matches every virtual machine
    pub paths: Vec<String>,
    pub options: ReportOptions,
    pub deadline: Option<Duration>,
}

/// Produce report rows, in lookup order.
///
/// A lookup that matches nothing yields no rows rather than an error.
pub async fn collect(client: &VsphereClient, request: &InfoRequest) -> Result<Vec<RenderedRow>> {
    let deadline = request.deadline.map(Deadline::after);
    let options = request.options;

    let load = load_primaries(client, &request.paths, &options);
    let loaded = match &deadline {
        Some(d) => d.run("loading virtual machines", load).await,
        None => load.await,
    };

    let mut primaries = match loaded {
        Ok(primaries) => primaries,
        Err(Error::NotFound(paths)) => {
            tracing::info!("No virtual machines matched {}, reporting nothing", paths);
            return Ok(Vec::new());
        }
        Err(e) => return Err(e),
    };

    let index = Aggregator::new(client, options)
        .with_deadline(deadline)
        .aggregate(&mut primaries)
        .await?;

    Ok(OrderedRenderer::new(&index, options).render(&primaries))
}

/// Run the report and write it to `out`, returning the number of rows.
///
/// Nothing is written unless every stage succeeds.
pub async fn run<W: Write>(client: &VsphereClient, request: &InfoRequest, out: &mut W) -> anyhow::Result<usize> {
    let rows = collect(client, request).await?;

    if request.options.json {
        write_json(&rows, out)?;
    } else {
        write_text(&rows, out)?;
    }

    Ok(rows.len())
}

async fn load_primaries(
    client: &VsphereClient,
    paths: &[String],
    options: &ReportOptions,
) -> Result<Vec<VirtualMachine>> {
    let found = match find_virtual_machines(client, paths).await {
        Ok(found) => found,
        Err(CollectorError::NotFound(_)) => return Err(Error::NotFound(paths.join(", "))),
        Err(e) => return Err(Error::Lookup(e)),
    };

    if found.is_empty() {
        return Ok(Vec::new());
    }

    // Overlapping paths can match a VM more than once; retrieve it once
    let mut seen = HashSet::new();
    let references: Vec<_> = found
        .iter()
        .filter(|f| seen.insert(&f.reference))
        .map(|f| f.reference.clone())
        .collect();
    let properties = options.primary_properties();
    let bags = client
        .retrieve(&references, properties.as_deref())
        .await
        .map_err(Error::Lookup)?;

    // The collector does not keep request order; rebuild it from the lookup
    found
        .into_iter()
        .map(|f| match bags.get(&f.reference).cloned() {
            Some(bag) => Ok(VirtualMachine::new(f.reference, &f.path, bag)),
            None => Err(Error::Primary {
                source: CollectorError::NotFound(f.reference.clone()),
                reference: f.reference,
            }),
        })
        .collect()
}

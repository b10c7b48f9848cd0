//! Aggregator
//!
//! Discovers the hosts, datastores and networks a set of virtual machines
//! refer to and resolves their names with one batched call per category.

use super::fetcher::CategoryFetcher;
use super::model::{has_ip_address, VirtualMachine, PROP_IP_ADDRESS};
use super::name_index::NameIndex;
use super::options::ReportOptions;
use super::reference::{Category, ObjectReference};
use super::reference_set::ReferenceSet;
use crate::error::{Error, Result};
use crate::vsphere::collector::{CollectorError, PropertyBag, PropertyCollector};
use futures::future::try_join_all;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Caller-supplied time budget shared by every stage of a run
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
    budget: Duration,
}

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Self {
            at: Instant::now() + budget,
            budget,
        }
    }

    /// Run `fut`, failing with [`Error::Timeout`] once the deadline passes
    pub async fn run<T>(&self, stage: &'static str, fut: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout_at(self.at, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!("Deadline of {:?} exceeded while {}", self.budget, stage);
                Err(Error::Timeout {
                    stage,
                    after: self.budget,
                })
            }
        }
    }
}

impl Category {
    /// Whether the options ask for this category to be resolved
    pub fn enabled(&self, options: &ReportOptions) -> bool {
        match self {
            Self::Host => options.general,
            Self::Datastore | Self::Network | Self::DistributedPortgroup => options.resources,
        }
    }

    /// References of this category held by a virtual machine, in declared order
    pub fn references<'a>(&self, vm: &'a VirtualMachine) -> Vec<&'a ObjectReference> {
        match self {
            Self::Host => vm.host().into_iter().collect(),
            Self::Datastore => vm.datastores.iter().collect(),
            Self::Network | Self::DistributedPortgroup => vm
                .networks
                .iter()
                .filter(|net| net.kind == self.kind())
                .collect(),
        }
    }
}

/// Collect the references every enabled category needs, one pass over the
/// virtual machines
pub fn discover(primaries: &[VirtualMachine], options: &ReportOptions) -> ReferenceSet {
    let categories: Vec<Category> = Category::ALL
        .into_iter()
        .filter(|c| c.enabled(options))
        .collect();

    let mut set = ReferenceSet::new();
    for vm in primaries {
        for category in &categories {
            for reference in category.references(vm) {
                set.add(*category, reference);
            }
        }
    }
    set
}

pub struct Aggregator<'a, C: ?Sized> {
    collector: &'a C,
    options: ReportOptions,
    deadline: Option<Deadline>,
}

impl<'a, C: PropertyCollector + ?Sized> Aggregator<'a, C> {
    pub fn new(collector: &'a C, options: ReportOptions) -> Self {
        Self {
            collector,
            options,
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Option<Deadline>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Build the name index for `primaries`.
    ///
    /// With `wait_for_ip` set, virtual machines without an address are waited
    /// on and refreshed in place before any reference is collected.
    pub async fn aggregate(&self, primaries: &mut [VirtualMachine]) -> Result<NameIndex> {
        if self.options.wait_for_ip {
            let refreshed = self
                .bounded("waiting for guest IP addresses", self.await_addresses(primaries))
                .await?;
            for (i, bag) in refreshed {
                primaries[i].refresh(bag);
            }
        }

        let references = discover(primaries, &self.options);
        tracing::debug!(
            "Discovered {} distinct reference(s) across {} virtual machine(s)",
            references.len(),
            primaries.len()
        );

        self.bounded("resolving reference names", self.resolve(&references))
            .await
    }

    async fn bounded<T>(&self, stage: &'static str, fut: impl Future<Output = Result<T>>) -> Result<T> {
        match &self.deadline {
            Some(deadline) => deadline.run(stage, fut).await,
            None => fut.await,
        }
    }

    /// Wait for every address-less virtual machine and re-read it once
    async fn await_addresses(
        &self,
        primaries: &[VirtualMachine],
    ) -> Result<Vec<(usize, PropertyBag)>> {
        let properties = self.options.primary_properties();
        let watched = [PROP_IP_ADDRESS.to_string()];

        let waits = primaries
            .iter()
            .enumerate()
            .filter(|(_, vm)| vm.ip_address().is_none())
            .map(|(i, vm)| {
                let reference = vm.reference.clone();
                let properties = properties.as_deref();
                let watched = &watched;
                async move {
                    tracing::info!("Waiting for {} to acquire an IP address", reference);
                    let primary_error = |source: CollectorError| Error::Primary {
                        reference: reference.clone(),
                        source,
                    };

                    self.collector
                        .wait_until(&reference, watched, &has_ip_address)
                        .await
                        .map_err(primary_error)?;

                    let mut bags = self
                        .collector
                        .retrieve(std::slice::from_ref(&reference), properties)
                        .await
                        .map_err(primary_error)?;
                    let bag = bags
                        .remove(&reference)
                        .ok_or_else(|| primary_error(CollectorError::NotFound(reference.clone())))?;

                    Ok::<_, Error>((i, bag))
                }
            });

        try_join_all(waits).await
    }

    /// One fetch per non-empty category, merged after all of them succeed
    async fn resolve(&self, references: &ReferenceSet) -> Result<NameIndex> {
        let fetches = references.categories().map(|category| {
            let batch = references.references(category);
            async move {
                let names = CategoryFetcher::new(self.collector, category)
                    .fetch(batch)
                    .await?;
                Ok::<_, Error>((category, names))
            }
        });
        let results = try_join_all(fetches).await?;

        let mut index = NameIndex::new();
        for (category, names) in results {
            index.merge(category, names)?;
        }

        if let Some(missing) = references.iter().find(|r| !index.contains(r)) {
            return Err(Error::invariant(format!(
                "reference {} has no entry in the name index",
                missing
            )));
        }

        Ok(index)
    }
}

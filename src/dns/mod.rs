// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! DNS adapter.
//!
//! Publishes forward (`A`/`AAAA`) and, optionally, reverse (`PTR`) records
//! for a VM and removes them again on deprovisioning. The backend is
//! abstracted behind [`DnsBackend`]; [`gcloud::GoogleCloudDnsClient`] talks to
//! Google Cloud DNS.
//!
//! ## Modules
//!
//! - [`reverse`] - Reverse-lookup names for IP addresses
//! - [`zone`] - Managed zones and most-specific-zone resolution
//! - [`records`] - Idempotent record reconciliation within one zone
//! - [`gcloud`] - Google Cloud DNS REST client

pub mod gcloud;
pub mod records;
pub mod reverse;
pub mod zone;

use crate::constants::{DEFAULT_DNS_RECORD_TTL_SECS, SERVICE_NAME_DNS};
use crate::context::RequestContext;
use crate::errors::{BackendError, ProvisionError};
use crate::events::{EventSink, Reporter};
use crate::service::{report_outcome, ProvisionService};
use crate::types::VirtualMachineSpec;
use async_trait::async_trait;
use records::{RecordReconciler, RecordType, ResourceRecord};
use reverse::reverse_name;
use std::collections::HashMap;
use tracing::info;
use zone::{find_zone, fqdn, ManagedZone};

/// Operations the DNS adapter needs from a DNS hosting backend.
#[async_trait]
pub trait DnsBackend: Send + Sync {
    /// All zones hosted for the configured project.
    async fn list_zones(&self) -> Result<Vec<ManagedZone>, BackendError>;

    /// All record sets of `zone`.
    async fn list_records(&self, zone: &ManagedZone) -> Result<Vec<ResourceRecord>, BackendError>;

    /// Add `record` to `zone`, returning the raw backend response.
    async fn create_record(
        &self,
        zone: &ManagedZone,
        record: &ResourceRecord,
    ) -> Result<String, BackendError>;

    /// Remove `record` from `zone`, returning the raw backend response.
    async fn delete_record(
        &self,
        zone: &ManagedZone,
        record: &ResourceRecord,
    ) -> Result<String, BackendError>;
}

/// One record the VM should (or should no longer) have.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredRecord {
    pub name: String,
    pub record_type: RecordType,
    pub value: String,
}

/// Absolute FQDN of the VM, if it has one.
fn host_fqdn(vm: &VirtualMachineSpec) -> Option<String> {
    vm.fqdn
        .as_deref()
        .filter(|f| !f.trim_matches('.').is_empty())
        .map(fqdn)
}

/// Records derived from the VM: address records first, then reverse pointers.
///
/// Returns an empty list if the VM has no FQDN or no addresses.
#[must_use]
pub fn desired_records(vm: &VirtualMachineSpec, manage_ptr: bool) -> Vec<DesiredRecord> {
    let Some(host) = host_fqdn(vm) else {
        return Vec::new();
    };
    let addresses: Vec<_> = vm.addresses().into_iter().map(|ip| ip.to_canonical()).collect();

    let mut desired: Vec<DesiredRecord> = addresses
        .iter()
        .map(|ip| DesiredRecord {
            name: host.clone(),
            record_type: RecordType::for_address(*ip),
            value: ip.to_string(),
        })
        .collect();

    if manage_ptr {
        desired.extend(addresses.iter().map(|ip| DesiredRecord {
            name: fqdn(&reverse_name(*ip)),
            record_type: RecordType::PTR,
            value: host.clone(),
        }));
    }

    desired
}

/// Zones and per-zone reconcilers of a single request.
///
/// Each zone's snapshot is loaded on first use and reused afterwards.
struct ZoneSession<'a, B: ?Sized> {
    backend: &'a B,
    ttl: u32,
    zones: Vec<ManagedZone>,
    reconcilers: HashMap<String, RecordReconciler<'a, B>>,
}

impl<'a, B: DnsBackend + ?Sized> ZoneSession<'a, B> {
    async fn open(backend: &'a B, ttl: u32) -> Result<Self, BackendError> {
        let zones = backend.list_zones().await?;
        Ok(Self {
            backend,
            ttl,
            zones,
            reconcilers: HashMap::new(),
        })
    }

    async fn reconciler_for(
        &mut self,
        name: &str,
    ) -> Result<&mut RecordReconciler<'a, B>, ProvisionError> {
        let zone = find_zone(name, &self.zones)
            .cloned()
            .ok_or_else(|| ProvisionError::ZoneNotFound {
                name: name.to_string(),
            })?;

        if !self.reconcilers.contains_key(&zone.name) {
            let key = zone.name.clone();
            let reconciler = RecordReconciler::load(self.backend, zone.clone(), self.ttl).await?;
            self.reconcilers.insert(key, reconciler);
        }

        self.reconcilers
            .get_mut(&zone.name)
            .ok_or_else(|| ProvisionError::ZoneNotFound {
                name: name.to_string(),
            })
    }
}

/// DNS adapter over any [`DnsBackend`].
pub struct DnsService<B> {
    backend: B,
    ttl: u32,
    manage_ptr: bool,
}

impl<B: DnsBackend> DnsService<B> {
    /// Adapter with default TTL and reverse records enabled.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            ttl: DEFAULT_DNS_RECORD_TTL_SECS,
            manage_ptr: true,
        }
    }

    /// TTL of created records.
    #[must_use]
    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
        self
    }

    /// Whether `PTR` records are managed as well.
    #[must_use]
    pub fn with_ptr_records(mut self, manage_ptr: bool) -> Self {
        self.manage_ptr = manage_ptr;
        self
    }

    /// Resolve the zones of all desired records.
    ///
    /// The forward zone is resolved first so that a VM outside every
    /// managed zone fails before anything is changed.
    async fn prepare(
        &self,
        host: &str,
        desired: &[DesiredRecord],
    ) -> Result<ZoneSession<'_, B>, ProvisionError> {
        let mut session = ZoneSession::open(&self.backend, self.ttl).await?;

        session.reconciler_for(host).await?;
        for record in desired {
            session.reconciler_for(&record.name).await?;
        }

        Ok(session)
    }

    async fn add_records(
        &self,
        reporter: Reporter<'_>,
        vm: &VirtualMachineSpec,
    ) -> Result<(), ProvisionError> {
        let Some(host) = host_fqdn(vm) else {
            reporter
                .info(format!("No FQDN set for VM {}: skipping", vm.name))
                .await?;
            return Ok(());
        };

        let desired = desired_records(vm, self.manage_ptr);
        if desired.is_empty() {
            reporter
                .info(format!("No addresses configured for {host}: skipping"))
                .await?;
            return Ok(());
        }

        let mut session = self.prepare(&host, &desired).await?;
        for record in &desired {
            session
                .reconciler_for(&record.name)
                .await?
                .ensure_exists(reporter, &record.name, record.record_type, &record.value)
                .await?;
        }

        Ok(())
    }

    async fn remove_records(
        &self,
        reporter: Reporter<'_>,
        vm: &VirtualMachineSpec,
    ) -> Result<(), ProvisionError> {
        let Some(host) = host_fqdn(vm) else {
            reporter
                .info(format!("No FQDN set for VM {}: skipping", vm.name))
                .await?;
            return Ok(());
        };

        let desired = desired_records(vm, self.manage_ptr);
        if desired.is_empty() {
            reporter
                .info(format!("No addresses configured for {host}: skipping"))
                .await?;
            return Ok(());
        }

        let mut session = self.prepare(&host, &desired).await?;
        for record in desired.iter().rev() {
            session
                .reconciler_for(&record.name)
                .await?
                .ensure_absent(reporter, &record.name, record.record_type)
                .await?;
        }

        Ok(())
    }
}

#[async_trait]
impl<B: DnsBackend> ProvisionService for DnsService<B> {
    fn name(&self) -> &'static str {
        SERVICE_NAME_DNS
    }

    async fn provision(
        &self,
        ctx: &RequestContext,
        vm: &VirtualMachineSpec,
        events: &EventSink,
    ) -> bool {
        let reporter = events.reporter(self.name());
        info!(request_id = %ctx.request_id(), vm = %vm.name, "Ensuring DNS records exist");

        let result = tokio::select! {
            biased;
            () = ctx.cancelled() => Err(ProvisionError::from(BackendError::Cancelled)),
            result = self.add_records(reporter, vm) => result,
        };
        report_outcome(reporter, ctx, result).await
    }

    async fn deprovision(
        &self,
        ctx: &RequestContext,
        vm: &VirtualMachineSpec,
        events: &EventSink,
    ) -> bool {
        let reporter = events.reporter(self.name());
        info!(request_id = %ctx.request_id(), vm = %vm.name, "Ensuring DNS records are removed");

        let result = tokio::select! {
            biased;
            () = ctx.cancelled() => Err(ProvisionError::from(BackendError::Cancelled)),
            result = self.remove_records(reporter, vm) => result,
        };
        report_outcome(reporter, ctx, result).await
    }
}

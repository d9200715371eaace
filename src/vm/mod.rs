// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Virtualization adapter.
//!
//! Provisioning clones a VM from the oVirt template mapped to the request's
//! provisioning template and waits until it is `down` (initialization done).
//! If the clone has no bootable disk, the template's boot disk is attached
//! and the VM is awaited `down` again. The VM is then powered on and awaited
//! `up`. Deprovisioning deletes a VM that
//! is powered off and waits until oVirt no longer knows it.
//!
//! ## Modules
//!
//! - [`ovirt`] - oVirt REST client
//! - [`types`] - oVirt API payloads

pub mod ovirt;
pub mod types;

use crate::constants::{
    OVIRT_STATUS_DOWN, OVIRT_STATUS_UP, OVIRT_TRANSIENT_SUBMIT_STATUS, SERVICE_NAME_OVIRT,
    SUBMIT_RETRY_BACKOFF_MILLIS,
};
use crate::context::RequestContext;
use crate::errors::{BackendError, ProvisionError};
use crate::events::{EventSink, Reporter};
use crate::retry::SubmitRetry;
use crate::service::{report_outcome, ProvisionService};
use crate::templates::TemplateManager;
use crate::types::VirtualMachineSpec;
use crate::waiter::{Probed, WaitTarget, Waiter};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use types::{Disk, DiskAttachment, NewDiskAttachment, Vm, VmCreateRequest};

/// Operations the virtualization adapter needs from the hypervisor manager.
///
/// Calls returning a `String` yield the raw response body, which is
/// forwarded as diagnostic payload.
#[async_trait]
pub trait VmBackend: Send + Sync {
    /// Submit a create request; returns the created VM and the raw response.
    async fn create_vm(&self, request: &VmCreateRequest) -> Result<(Vm, String), BackendError>;

    /// Current state of VM `id`. A vanished VM yields a 404 error.
    async fn get_vm(&self, id: &str) -> Result<Vm, BackendError>;

    /// Look a VM up by exact name.
    async fn find_vm_by_name(&self, name: &str) -> Result<Option<Vm>, BackendError>;

    /// Disks attached to VM `id`.
    async fn list_disk_attachments(&self, id: &str) -> Result<Vec<DiskAttachment>, BackendError>;

    /// The most recently created disk not attached to any VM, if it is named `name`.
    async fn find_unattached_disk(&self, name: &str) -> Result<Option<Disk>, BackendError>;

    /// Attach a disk to VM `id`.
    async fn attach_disk(
        &self,
        id: &str,
        attachment: &NewDiskAttachment,
    ) -> Result<String, BackendError>;

    /// Power VM `id` on.
    async fn start_vm(&self, id: &str) -> Result<String, BackendError>;

    /// Delete VM `id`.
    async fn delete_vm(&self, id: &str) -> Result<String, BackendError>;
}

/// Virtualization adapter over any [`VmBackend`].
pub struct OvirtService<B> {
    backend: B,
    templates: Arc<TemplateManager>,
    waiter: Waiter,
    retry: SubmitRetry,
}

impl<B: VmBackend> OvirtService<B> {
    pub fn new(backend: B, templates: Arc<TemplateManager>, waiter: Waiter) -> Self {
        Self {
            backend,
            templates,
            waiter,
            retry: SubmitRetry::new(
                OVIRT_TRANSIENT_SUBMIT_STATUS,
                Duration::from_millis(SUBMIT_RETRY_BACKOFF_MILLIS),
            ),
        }
    }

    async fn wait_for_status(
        &self,
        ctx: &RequestContext,
        reporter: Reporter<'_>,
        id: &str,
        status: &str,
    ) -> Result<(), ProvisionError> {
        let backend = &self.backend;
        self.waiter
            .wait(ctx, reporter, &WaitTarget::status(status), move || async move {
                backend.get_vm(id).await.map(|vm| Probed::new(vm.status))
            })
            .await?;
        Ok(())
    }

    async fn create_and_start(
        &self,
        ctx: &RequestContext,
        reporter: Reporter<'_>,
        vm: &VirtualMachineSpec,
    ) -> Result<(), ProvisionError> {
        let template = self.templates.ovirt_template(&vm.template).ok_or_else(|| {
            ProvisionError::TemplateNotFound {
                backend: SERVICE_NAME_OVIRT,
                template: vm.template.clone(),
            }
        })?;

        let request = VmCreateRequest::for_vm(vm, template);
        let body = serde_json::to_string_pretty(&request)?;
        info!(
            request_id = %ctx.request_id(),
            vm = %vm.name,
            template = %template,
            "Creating VM"
        );
        reporter.info_with_debug("Start creating VM", body).await?;

        let (created, response) = self
            .retry
            .submit(ctx, "create VM", || self.backend.create_vm(&request))
            .await?;
        reporter
            .info_with_debug("VM created successfully", response)
            .await?;

        reporter
            .info("Waiting for VM initialization to complete")
            .await?;
        self.wait_for_status(ctx, reporter, &created.id, OVIRT_STATUS_DOWN)
            .await?;
        self.ensure_boot_disk(ctx, reporter, vm, &created.id).await?;

        let response = self.backend.start_vm(&created.id).await?;
        reporter.info_with_debug("VM started", response).await?;

        self.wait_for_status(ctx, reporter, &created.id, OVIRT_STATUS_UP)
            .await
    }

    async fn ensure_boot_disk(
        &self,
        ctx: &RequestContext,
        reporter: Reporter<'_>,
        vm: &VirtualMachineSpec,
        id: &str,
    ) -> Result<(), ProvisionError> {
        reporter.info("Check if boot disk is attached to VM").await?;
        let attachments = self.backend.list_disk_attachments(id).await?;
        if attachments.iter().any(|a| a.bootable) {
            return Ok(());
        }

        let disk = match self.templates.boot_disk(&vm.template) {
            Some(name) => self.backend.find_unattached_disk(name).await?,
            None => None,
        };
        let Some(disk) = disk else {
            return Err(ProvisionError::Precondition(
                "No boot disk attached".to_string(),
            ));
        };

        let attachment = NewDiskAttachment::boot(&disk.id);
        info!(
            request_id = %ctx.request_id(),
            vm = %vm.name,
            disk = %disk.name,
            "Attaching boot disk"
        );
        reporter
            .info_with_debug(
                format!("Attaching disk {}", disk.id),
                serde_json::to_string_pretty(&attachment)?,
            )
            .await?;
        let response = self.backend.attach_disk(id, &attachment).await?;
        reporter.info_with_debug("Disk attached", response).await?;

        self.wait_for_status(ctx, reporter, id, OVIRT_STATUS_DOWN)
            .await
    }

    async fn delete(
        &self,
        ctx: &RequestContext,
        reporter: Reporter<'_>,
        vm: &VirtualMachineSpec,
    ) -> Result<(), ProvisionError> {
        let Some(existing) = self.backend.find_vm_by_name(&vm.name).await? else {
            reporter
                .info(format!("VM {} does not exist: skipping", vm.name))
                .await?;
            return Ok(());
        };

        if existing.status != OVIRT_STATUS_DOWN {
            return Err(ProvisionError::Precondition(format!(
                "VM is not down. Current status: {}",
                existing.status
            )));
        }

        info!(
            request_id = %ctx.request_id(),
            vm = %vm.name,
            id = %existing.id,
            "Deleting VM"
        );
        let response = self.backend.delete_vm(&existing.id).await?;
        reporter
            .info_with_debug("VM deletion initiated", response)
            .await?;

        let backend = &self.backend;
        let id = existing.id.as_str();
        self.waiter
            .wait(ctx, reporter, &WaitTarget::vanish(), move || async move {
                backend.get_vm(id).await.map(|vm| Probed::new(vm.status))
            })
            .await?;
        reporter.info("VM deleted").await?;

        Ok(())
    }
}

#[async_trait]
impl<B: VmBackend> ProvisionService for OvirtService<B> {
    fn name(&self) -> &'static str {
        SERVICE_NAME_OVIRT
    }

    async fn provision(
        &self,
        ctx: &RequestContext,
        vm: &VirtualMachineSpec,
        events: &EventSink,
    ) -> bool {
        let reporter = events.reporter(self.name());
        let result = tokio::select! {
            biased;
            () = ctx.cancelled() => Err(ProvisionError::from(BackendError::Cancelled)),
            result = self.create_and_start(ctx, reporter, vm) => result,
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
        let result = tokio::select! {
            biased;
            () = ctx.cancelled() => Err(ProvisionError::from(BackendError::Cancelled)),
            result = self.delete(ctx, reporter, vm) => result,
        };
        report_outcome(reporter, ctx, result).await
    }
}

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Configuration-management adapter.
//!
//! Runs the Ansible Tower job templates mapped to the VM's provisioning
//! template, one after another, limited to the new host. Each job must reach
//! `successful` before the next one is launched; the first job that fails,
//! errors, is canceled or does not finish in time fails the step.
//!
//! Deprovisioning has nothing to undo here.

pub mod tower;

use crate::constants::{SERVICE_NAME_TOWER, TOWER_FAILURE_STATUSES, TOWER_STATUS_SUCCESSFUL};
use crate::context::RequestContext;
use crate::errors::{BackendError, ProvisionError};
use crate::events::{EventSink, Reporter};
use crate::service::{report_outcome, ProvisionService};
use crate::templates::TemplateManager;
use crate::types::VirtualMachineSpec;
use crate::waiter::{Probed, WaitTarget, Waiter};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// A Tower job as returned by the launch and job endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub playbook: String,
    #[serde(default)]
    pub status: String,
}

/// Body of a job template launch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaunchRequest<'a> {
    /// Host pattern the playbook is restricted to
    pub limit: &'a str,
}

/// Operations the configuration adapter needs from the job runner.
#[async_trait]
pub trait JobBackend: Send + Sync {
    /// Endpoint a launch of `template_id` is sent to, for diagnostics.
    fn launch_url(&self, template_id: u64) -> String;

    /// Launch `template_id`; returns the new job and the raw response.
    async fn launch_job(
        &self,
        template_id: u64,
        request: &LaunchRequest<'_>,
    ) -> Result<(Job, String), BackendError>;

    /// Current state of job `id` and the raw response.
    async fn get_job(&self, id: u64) -> Result<(Job, String), BackendError>;
}

/// Configuration-management adapter over any [`JobBackend`].
pub struct TowerService<B> {
    backend: B,
    templates: Arc<TemplateManager>,
    waiter: Waiter,
}

impl<B: JobBackend> TowerService<B> {
    pub fn new(backend: B, templates: Arc<TemplateManager>, waiter: Waiter) -> Self {
        Self {
            backend,
            templates,
            waiter,
        }
    }

    async fn run_job(
        &self,
        ctx: &RequestContext,
        reporter: Reporter<'_>,
        template_id: u64,
        limit: &str,
    ) -> Result<(), ProvisionError> {
        let request = LaunchRequest { limit };
        let body = serde_json::to_string(&request)?;
        reporter
            .info_with_debug(
                format!("Starting Job with template {template_id}"),
                format!("URL: {}\nBody: {body}", self.backend.launch_url(template_id)),
            )
            .await?;

        let (job, response) = self.backend.launch_job(template_id, &request).await?;
        debug!(
            request_id = %ctx.request_id(),
            job_id = job.id,
            response_len = response.len(),
            "Job launched"
        );
        reporter
            .info(format!(
                "Started job {} ({}) for playbook {}",
                job.id, job.name, job.playbook
            ))
            .await?;

        let target = WaitTarget::status(TOWER_STATUS_SUCCESSFUL).failing_on(TOWER_FAILURE_STATUSES);
        let backend = &self.backend;
        let job_id = job.id;
        self.waiter
            .wait(ctx, reporter, &target, move || async move {
                backend
                    .get_job(job_id)
                    .await
                    .map(|(job, raw)| Probed::new(job.status).with_debug(raw))
            })
            .await?;

        Ok(())
    }

    async fn run_jobs(
        &self,
        ctx: &RequestContext,
        reporter: Reporter<'_>,
        vm: &VirtualMachineSpec,
    ) -> Result<(), ProvisionError> {
        let template_ids = self.templates.tower_templates(&vm.template);
        info!(
            request_id = %ctx.request_id(),
            vm = %vm.name,
            jobs = template_ids.len(),
            "Running configuration jobs"
        );

        for template_id in template_ids {
            self.run_job(ctx, reporter, *template_id, vm.host_name())
                .await?;
        }

        Ok(())
    }
}

#[async_trait]
impl<B: JobBackend> ProvisionService for TowerService<B> {
    fn name(&self) -> &'static str {
        SERVICE_NAME_TOWER
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
            result = self.run_jobs(ctx, reporter, vm) => result,
        };
        report_outcome(reporter, ctx, result).await
    }

    async fn deprovision(
        &self,
        ctx: &RequestContext,
        vm: &VirtualMachineSpec,
        _events: &EventSink,
    ) -> bool {
        debug!(
            request_id = %ctx.request_id(),
            vm = %vm.name,
            "Nothing to undo for configuration management"
        );
        true
    }
}

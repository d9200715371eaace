// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The capability every backend adapter implements.

use crate::context::RequestContext;
use crate::errors::ProvisionError;
use crate::events::{EventSink, Reporter};
use crate::types::VirtualMachineSpec;
use async_trait::async_trait;
use tracing::warn;

/// A backend taking part in provisioning and deprovisioning.
///
/// Implementations convert every error into a failure-flagged status event
/// and return `false`; returning `false` without having emitted a failure
/// event is a contract violation. Implementations must be safe to call from
/// concurrently handled requests.
#[async_trait]
pub trait ProvisionService: Send + Sync {
    /// Name reported in status events and logs.
    fn name(&self) -> &'static str;

    /// Perform this backend's provisioning step.
    async fn provision(
        &self,
        ctx: &RequestContext,
        vm: &VirtualMachineSpec,
        events: &EventSink,
    ) -> bool;

    /// Undo this backend's provisioning step.
    async fn deprovision(
        &self,
        ctx: &RequestContext,
        vm: &VirtualMachineSpec,
        events: &EventSink,
    ) -> bool;
}

/// Convert the outcome of an adapter step into the boolean contract.
///
/// On error the failure is reported as an event carrying the error's
/// diagnostic payload. Cancellation is reported the same way. If nobody is
/// listening anymore the event is dropped, which is logged, and the step
/// still reports `false`.
pub async fn report_outcome(
    reporter: Reporter<'_>,
    ctx: &RequestContext,
    result: Result<(), ProvisionError>,
) -> bool {
    let Err(err) = result else {
        return true;
    };

    warn!(
        request_id = %ctx.request_id(),
        service = reporter.service_name(),
        error = %err,
        "Step failed"
    );

    if let Err(send_err) = reporter.failure(err.to_string(), err.debug_payload()).await {
        warn!(
            request_id = %ctx.request_id(),
            service = reporter.service_name(),
            error = %send_err,
            cancelled = err.is_cancelled(),
            "Could not deliver failure event"
        );
    }

    false
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod service_tests;

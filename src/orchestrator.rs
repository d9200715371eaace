// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Sequential execution of backend adapters for one request.
//!
//! For every request the orchestrator opens one event channel, spawns a relay
//! task forwarding events to the caller in arrival order, and runs the
//! configured adapters one after another. The first adapter reporting
//! failure ends the run; later adapters are not invoked. Once iteration ends
//! the channel is closed and the relay is awaited, so every emitted event has
//! reached the caller before the outcome is returned.
//!
//! ```text
//! Idle ──► Running ──► Completed   (every adapter succeeded)
//!                  └─► Failed      (an adapter returned false)
//! ```
//!
//! Deprovisioning runs the adapters in the same configured order as
//! provisioning.

use crate::constants::EVENT_CHANNEL_CAPACITY;
use crate::context::RequestContext;
use crate::errors::EventError;
use crate::events::EventSink;
use crate::metrics;
use crate::service::ProvisionService;
use crate::types::{Operation, StatusEvent, VirtualMachineSpec};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

/// Caller-facing destination of a request's events.
#[async_trait]
pub trait StatusSink: Send + 'static {
    /// Deliver one event. An error means the caller is gone.
    async fn deliver(&mut self, event: StatusEvent) -> Result<(), EventError>;
}

#[async_trait]
impl StatusSink for mpsc::Sender<StatusEvent> {
    async fn deliver(&mut self, event: StatusEvent) -> Result<(), EventError> {
        self.send(event).await.map_err(|_| EventError::Closed)
    }
}

#[async_trait]
impl StatusSink for mpsc::UnboundedSender<StatusEvent> {
    async fn deliver(&mut self, event: StatusEvent) -> Result<(), EventError> {
        self.send(event).map_err(|_| EventError::Closed)
    }
}

/// Result of one orchestrated request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Every adapter succeeded
    Completed,
    /// The named adapter failed; later adapters were skipped
    Failed {
        /// Name of the failing adapter
        service: &'static str,
    },
}

impl Outcome {
    /// Whether every adapter succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Forward events until the channel is closed and drained.
///
/// If the caller goes away the request is cancelled, so adapters blocked on
/// the channel or in a wait unwind instead of running to completion.
async fn relay<S: StatusSink>(
    mut rx: mpsc::Receiver<StatusEvent>,
    mut sink: S,
    cancel: CancellationToken,
) -> usize {
    let mut relayed = 0;
    while let Some(event) = rx.recv().await {
        metrics::record_event(&event.service_name, event.failed);
        if sink.deliver(event).await.is_err() {
            warn!("Caller stopped listening, cancelling request");
            cancel.cancel();
            break;
        }
        relayed += 1;
    }
    relayed
}

/// Runs the configured adapters in order.
#[derive(Clone, Default)]
pub struct Orchestrator {
    services: Vec<Arc<dyn ProvisionService>>,
}

impl Orchestrator {
    /// Orchestrator running `services` in the given order.
    #[must_use]
    pub fn new(services: Vec<Arc<dyn ProvisionService>>) -> Self {
        Self { services }
    }

    /// Names of the configured adapters, in execution order.
    #[must_use]
    pub fn service_names(&self) -> Vec<&'static str> {
        self.services.iter().map(|s| s.name()).collect()
    }

    /// Provision `vm`, streaming events into `sink`.
    pub async fn provisionize<S: StatusSink>(
        &self,
        ctx: &RequestContext,
        vm: &VirtualMachineSpec,
        sink: S,
    ) -> Outcome {
        self.run(Operation::Provision, ctx, vm, sink).await
    }

    /// Deprovision `vm`, streaming events into `sink`.
    pub async fn deprovisionize<S: StatusSink>(
        &self,
        ctx: &RequestContext,
        vm: &VirtualMachineSpec,
        sink: S,
    ) -> Outcome {
        self.run(Operation::Deprovision, ctx, vm, sink).await
    }

    async fn run<S: StatusSink>(
        &self,
        operation: Operation,
        ctx: &RequestContext,
        vm: &VirtualMachineSpec,
        sink: S,
    ) -> Outcome {
        let span = info_span!(
            "request",
            request_id = %ctx.request_id(),
            operation = %operation,
            vm = %vm.name
        );

        async move {
            let started = Instant::now();
            metrics::record_request_started(operation);
            info!(services = ?self.service_names(), "Request started");

            let (events, rx) = EventSink::channel(ctx, EVENT_CHANNEL_CAPACITY);
            let relay_task = tokio::spawn(relay(rx, sink, ctx.token()).in_current_span());

            let mut outcome = Outcome::Completed;
            for service in &self.services {
                debug!(service = service.name(), "Running step");
                let ok = match operation {
                    Operation::Provision => service.provision(ctx, vm, &events).await,
                    Operation::Deprovision => service.deprovision(ctx, vm, &events).await,
                };
                metrics::record_step(service.name(), operation, ok);

                if !ok {
                    warn!(service = service.name(), "Step failed, skipping remaining steps");
                    outcome = Outcome::Failed {
                        service: service.name(),
                    };
                    break;
                }
            }

            drop(events);
            match relay_task.await {
                Ok(relayed) => debug!(events = relayed, "Relay finished"),
                Err(e) => warn!(error = %e, "Relay task failed"),
            }

            let label = match outcome {
                Outcome::Completed => "completed",
                Outcome::Failed { .. } if ctx.is_cancelled() => "cancelled",
                Outcome::Failed { .. } => "failed",
            };
            metrics::record_request(operation, label, started.elapsed());
            metrics::record_request_finished(operation);
            info!(outcome = label, duration = ?started.elapsed(), "Request finished");

            outcome
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod orchestrator_tests;

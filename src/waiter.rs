// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Bounded polling for long-running remote operations.
//!
//! Every backend that submits an operation and then has to poll until it
//! settles goes through [`Waiter::wait`]: a VM reaching a power state, a
//! configuration job finishing, a deleted VM disappearing from inventory.
//!
//! # States
//!
//! ```text
//! Polling ──► Succeeded   (success status observed, or resource vanished)
//!    │
//!    ├──────► Failed      (failure status observed, or probe error)
//!    ├──────► TimedOut    (deadline passed)
//!    └──────► Cancelled   (request withdrawn)
//! ```
//!
//! The deadline is computed once on entry. Every distinct status the backend
//! passes through is reported as a status event before terminal conditions
//! are evaluated, so callers see the whole progression and not only the
//! final status.

use crate::context::RequestContext;
use crate::errors::{BackendError, EventError, WaitError};
use crate::events::Reporter;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// One observation returned by a status probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Probed {
    /// Current status string reported by the backend
    pub status: String,
    /// Raw response, forwarded as diagnostic payload on status changes
    pub debug: Option<String>,
}

impl Probed {
    /// Observation without diagnostic payload.
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            debug: None,
        }
    }

    /// Attach the raw response.
    #[must_use]
    pub fn with_debug(mut self, debug: impl Into<String>) -> Self {
        self.debug = Some(debug.into());
        self
    }
}

impl From<&str> for Probed {
    fn from(status: &str) -> Self {
        Self::new(status)
    }
}

/// What the waiter is waiting for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WaitTarget {
    success: Option<String>,
    failures: Vec<String>,
    vanish: bool,
}

impl WaitTarget {
    /// Wait until the probe reports `success`.
    pub fn status(success: impl Into<String>) -> Self {
        Self {
            success: Some(success.into()),
            ..Self::default()
        }
    }

    /// Wait until the probe reports that the resource no longer exists.
    #[must_use]
    pub fn vanish() -> Self {
        Self {
            vanish: true,
            ..Self::default()
        }
    }

    /// Treat any of `statuses` as a terminal failure.
    #[must_use]
    pub fn failing_on(mut self, statuses: &[&str]) -> Self {
        self.failures
            .extend(statuses.iter().map(|s| (*s).to_string()));
        self
    }

    fn is_success(&self, status: &str) -> bool {
        self.success.as_deref() == Some(status)
    }

    fn is_failure(&self, status: &str) -> bool {
        self.failures.iter().any(|f| f == status)
    }
}

/// How the wait ended successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The success status was observed
    Reached(Probed),
    /// The probe reported "not found" while waiting in vanish mode
    Vanished,
}

/// Polling parameters shared by all waits of one adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Waiter {
    interval: Duration,
    timeout: Duration,
}

impl Waiter {
    /// Poll every `interval`, give up after `timeout`.
    #[must_use]
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    /// Interval between probes.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Maximum total wait.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Poll `probe` until `target` is reached.
    ///
    /// Status changes are published through `reporter` as
    /// `New status: <status>` events.
    ///
    /// # Errors
    ///
    /// - [`WaitError::RemoteFailure`] if a failure status is observed
    /// - [`WaitError::Probe`] if the probe fails (except "not found" in vanish mode)
    /// - [`WaitError::TimedOut`] once the deadline has passed, including while a
    ///   probe is still outstanding
    /// - [`WaitError::Cancelled`] if the request is withdrawn
    pub async fn wait<F, Fut>(
        &self,
        ctx: &RequestContext,
        reporter: Reporter<'_>,
        target: &WaitTarget,
        mut probe: F,
    ) -> Result<Completion, WaitError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Probed, BackendError>>,
    {
        let deadline = Instant::now() + self.timeout;
        let mut last_status: Option<String> = None;

        loop {
            if Instant::now() >= deadline {
                return Err(self.timed_out(ctx, reporter, last_status));
            }

            tokio::select! {
                biased;
                () = ctx.cancelled() => return Err(WaitError::Cancelled),
                () = tokio::time::sleep(self.interval) => {}
            }

            // A probe that never answers must not outlive the deadline.
            let result = tokio::select! {
                biased;
                () = ctx.cancelled() => return Err(WaitError::Cancelled),
                result = probe() => result,
                () = tokio::time::sleep_until(deadline) => {
                    return Err(self.timed_out(ctx, reporter, last_status));
                }
            };

            let probed = match result {
                Ok(probed) => probed,
                Err(e) if target.vanish && e.is_not_found() => {
                    debug!(
                        request_id = %ctx.request_id(),
                        service = reporter.service_name(),
                        "Resource vanished"
                    );
                    return Ok(Completion::Vanished);
                }
                Err(BackendError::Cancelled) => return Err(WaitError::Cancelled),
                Err(e) => return Err(WaitError::Probe(e)),
            };

            if last_status.as_deref() != Some(probed.status.as_str()) {
                let message = format!("New status: {}", probed.status);
                let sent = match &probed.debug {
                    Some(debug) => reporter.info_with_debug(message, debug.clone()).await,
                    None => reporter.info(message).await,
                };
                sent.map_err(|e| match e {
                    EventError::Cancelled => WaitError::Cancelled,
                    EventError::Closed => WaitError::EventsClosed,
                })?;
                last_status = Some(probed.status.clone());
            }

            if target.is_success(&probed.status) {
                return Ok(Completion::Reached(probed));
            }

            if target.is_failure(&probed.status) {
                return Err(WaitError::RemoteFailure {
                    status: probed.status,
                });
            }
        }
    }

    fn timed_out(
        &self,
        ctx: &RequestContext,
        reporter: Reporter<'_>,
        last_status: Option<String>,
    ) -> WaitError {
        debug!(
            request_id = %ctx.request_id(),
            service = reporter.service_name(),
            last_status = ?last_status,
            "Wait deadline passed"
        );
        WaitError::TimedOut {
            timeout: self.timeout,
            last_status,
        }
    }
}

#[cfg(test)]
#[path = "waiter_tests.rs"]
mod waiter_tests;

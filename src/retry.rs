// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Resubmission policy for operations rejected with a transient status.
//!
//! Some backends reject a submission while they are not ready yet (oVirt
//! answers `400 Bad Request` in that case). Starting an operation is retried
//! exactly once after a short fixed backoff; any further failure is fatal.
//! Polling an operation that was already accepted is never retried, see
//! [`crate::waiter`].

use crate::context::RequestContext;
use crate::errors::BackendError;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Single-retry policy for submitting an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitRetry {
    /// HTTP status treated as transient
    pub transient_status: u16,
    /// Wait before the one resubmission
    pub backoff: Duration,
}

impl SubmitRetry {
    /// Build a policy retrying once on `transient_status` after `backoff`.
    #[must_use]
    pub fn new(transient_status: u16, backoff: Duration) -> Self {
        Self {
            transient_status,
            backoff,
        }
    }

    /// Whether `err` is the transient rejection this policy retries.
    #[must_use]
    pub fn is_transient(&self, err: &BackendError) -> bool {
        err.status() == Some(self.transient_status)
    }

    /// Run `submit`, resubmitting at most once if it fails transiently.
    ///
    /// # Arguments
    ///
    /// * `ctx` - Request context; cancellation interrupts the backoff
    /// * `operation_name` - Human-readable name for logging (e.g., "create VM")
    /// * `submit` - Async function that performs the submission
    ///
    /// # Errors
    ///
    /// Returns the first non-transient error, the error of the resubmission,
    /// or [`BackendError::Cancelled`] if the request is withdrawn during the backoff.
    pub async fn submit<T, F, Fut>(
        &self,
        ctx: &RequestContext,
        operation_name: &str,
        mut submit: F,
    ) -> Result<T, BackendError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, BackendError>>,
    {
        let mut retried = false;

        loop {
            match submit().await {
                Ok(value) => {
                    if retried {
                        debug!(
                            request_id = %ctx.request_id(),
                            operation = operation_name,
                            "Submission succeeded after retry"
                        );
                    }
                    return Ok(value);
                }
                Err(e) if !retried && self.is_transient(&e) => {
                    warn!(
                        request_id = %ctx.request_id(),
                        operation = operation_name,
                        retry_after = ?self.backoff,
                        error = %e,
                        "Transient submission error, will retry once"
                    );
                    retried = true;

                    tokio::select! {
                        biased;
                        () = ctx.cancelled() => return Err(BackendError::Cancelled),
                        () = tokio::time::sleep(self.backoff) => {}
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod retry_tests;

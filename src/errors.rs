// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for Provisionize.
//!
//! This module provides specialized error types for:
//! - Backend HTTP API calls (oVirt, Google Cloud DNS, Ansible Tower)
//! - The per-request event channel
//! - Waiting for long-running remote operations
//! - Adapter steps, which convert every error into a failure event
//!
//! Adapters never let these errors escape: they are rendered into a
//! failure-flagged [`StatusEvent`](crate::types::StatusEvent) and a `false`
//! result. The orchestrator only sees that boolean.

use std::time::Duration;
use thiserror::Error;

/// Errors returned by backend API clients.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The request never produced an HTTP response (connection refused, DNS, TLS)
    #[error("HTTP request to {url} failed: {reason}")]
    Transport {
        /// Requested URL
        url: String,
        /// Transport error message
        reason: String,
    },

    /// The backend answered with a status code the caller did not expect
    #[error("{url} returned HTTP {status}")]
    UnexpectedStatus {
        /// Requested URL
        url: String,
        /// HTTP status code
        status: u16,
        /// Response body, kept as diagnostic payload
        body: String,
    },

    /// The response body could not be decoded
    #[error("could not parse response from {url}: {reason}")]
    InvalidResponse {
        /// Requested URL
        url: String,
        /// Decoder error message
        reason: String,
        /// Raw response body
        body: String,
    },

    /// The request was withdrawn while waiting on the backend
    #[error("request cancelled")]
    Cancelled,
}

impl BackendError {
    /// HTTP status code, if the backend answered at all.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the backend reported that the resource does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Raw response body useful as diagnostic payload.
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::UnexpectedStatus { body, .. } | Self::InvalidResponse { body, .. }
                if !body.is_empty() =>
            {
                Some(body)
            }
            _ => None,
        }
    }
}

/// Errors raised when publishing a status event.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventError {
    /// The request was cancelled while the event was waiting to be consumed
    #[error("request cancelled")]
    Cancelled,

    /// Nobody is listening for events anymore
    #[error("event channel closed")]
    Closed,
}

/// Terminal outcomes of the completion waiter other than success.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WaitError {
    /// The backend reported a terminal failure status
    #[error("operation failed with status '{status}'")]
    RemoteFailure {
        /// Terminal status reported by the backend
        status: String,
    },

    /// The status probe itself failed
    #[error("could not get status update: {0}")]
    Probe(#[source] BackendError),

    /// The deadline passed before a terminal status was observed
    #[error("operation timed out after {timeout:?}")]
    TimedOut {
        /// Configured maximum wait
        timeout: Duration,
        /// Last status observed before giving up
        last_status: Option<String>,
    },

    /// The request was withdrawn while waiting
    #[error("operation cancelled")]
    Cancelled,

    /// A status change could not be reported because nobody is listening
    #[error("event channel closed while waiting")]
    EventsClosed,
}

/// Errors raised inside a single adapter step.
#[derive(Error, Debug)]
pub enum ProvisionError {
    /// Backend call failed
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Waiting for a remote operation failed, timed out or was cancelled
    #[error(transparent)]
    Wait(#[from] WaitError),

    /// A status event could not be delivered
    #[error(transparent)]
    Event(#[from] EventError),

    /// No managed zone contains the given name
    #[error("no zone found for {name}")]
    ZoneNotFound {
        /// Name that could not be placed in a zone
        name: String,
    },

    /// The VM references a template the configuration does not know
    #[error("no {backend} template configured for '{template}'")]
    TemplateNotFound {
        /// Backend the template was looked up for
        backend: &'static str,
        /// Template name from the VM spec
        template: String,
    },

    /// A record create/delete call failed
    #[error("could not {action} {record_type} record for {name} in {zone}: {source}")]
    RecordChange {
        /// `create` or `delete`
        action: &'static str,
        /// Record type
        record_type: String,
        /// Record name
        name: String,
        /// Zone name
        zone: String,
        /// Underlying backend error
        #[source]
        source: BackendError,
    },

    /// A request body could not be encoded
    #[error("could not encode request: {0}")]
    Encode(#[from] serde_json::Error),

    /// The remote state does not allow the step to proceed
    #[error("{0}")]
    Precondition(String),
}

impl ProvisionError {
    /// Diagnostic payload to attach to the failure event, if any.
    #[must_use]
    pub fn debug_payload(&self) -> Option<String> {
        match self {
            Self::Backend(e)
            | Self::RecordChange { source: e, .. }
            | Self::Wait(WaitError::Probe(e)) => e.body().map(str::to_string),
            _ => None,
        }
    }

    /// Whether the step ended because the caller withdrew the request.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            Self::Backend(BackendError::Cancelled)
                | Self::Wait(WaitError::Cancelled)
                | Self::Event(EventError::Cancelled)
        )
    }
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Per-request context shared by the orchestrator and every adapter.
//!
//! The context carries the request identifier (for logging) and the
//! cancellation signal. Every blocking wait in an adapter selects on
//! [`RequestContext::cancelled`] so a withdrawn request unwinds promptly.

use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

/// Context handed to adapters for the lifetime of one request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: String,
    cancel: CancellationToken,
}

impl RequestContext {
    /// Create a context with a fresh cancellation token.
    pub fn new(request_id: impl Into<String>) -> Self {
        Self::with_token(request_id, CancellationToken::new())
    }

    /// Create a context bound to an existing token, e.g. one tied to the caller's connection.
    pub fn with_token(request_id: impl Into<String>, cancel: CancellationToken) -> Self {
        Self {
            request_id: request_id.into(),
            cancel,
        }
    }

    /// Identifier supplied by the caller.
    #[must_use]
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Withdraw the request.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether the request has been withdrawn.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once the request is withdrawn.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.cancel.cancelled()
    }

    /// Clone of the underlying token.
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod context_tests;

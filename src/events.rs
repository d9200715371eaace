// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Per-request status event channel.
//!
//! Each request owns one bounded channel. Adapters write to it one at a time
//! (the orchestrator runs them sequentially) and the relay task is the only
//! reader. The channel holds a single event, so a producing adapter blocks
//! until the relay has taken the previous one; this bounds memory to one
//! in-flight event per request.
//!
//! Sending also selects on the request's cancellation signal, so an adapter
//! blocked on a slow caller unwinds with [`EventError::Cancelled`] as soon as
//! the request is withdrawn. Failure events are the exception: they close an
//! adapter's step and are queued even after cancellation, as long as the
//! relay is still reading.

use crate::context::RequestContext;
use crate::errors::EventError;
use crate::types::StatusEvent;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Write side of a request's event channel.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::Sender<StatusEvent>,
    cancel: CancellationToken,
}

impl EventSink {
    /// Open a channel bound to the request's cancellation signal.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn channel(ctx: &RequestContext, capacity: usize) -> (Self, mpsc::Receiver<StatusEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (
            Self {
                tx,
                cancel: ctx.token(),
            },
            rx,
        )
    }

    /// Publish an event, waiting until the relay has room for it.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::Cancelled`] if the request is withdrawn before the
    /// event is accepted, [`EventError::Closed`] if the reader is gone.
    pub async fn send(&self, event: StatusEvent) -> Result<(), EventError> {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(EventError::Cancelled),
            result = self.tx.send(event) => result.map_err(|_| EventError::Closed),
        }
    }

    /// Publish the event that ends a step, ignoring cancellation.
    ///
    /// The relay keeps draining the channel until it is closed, so this only
    /// waits for the caller to take the previous event.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::Closed`] if the reader is gone.
    pub async fn send_terminal(&self, event: StatusEvent) -> Result<(), EventError> {
        self.tx.send(event).await.map_err(|_| EventError::Closed)
    }

    /// Scope the sink to one adapter so callers need not repeat the service name.
    #[must_use]
    pub fn reporter(&self, service_name: &'static str) -> Reporter<'_> {
        Reporter {
            sink: self,
            service_name,
        }
    }
}

/// Event writer bound to one adapter's service name.
#[derive(Debug, Clone, Copy)]
pub struct Reporter<'a> {
    sink: &'a EventSink,
    service_name: &'static str,
}

impl Reporter<'_> {
    /// Service name stamped on every event.
    #[must_use]
    pub fn service_name(&self) -> &'static str {
        self.service_name
    }

    /// Publish an informational event.
    ///
    /// # Errors
    ///
    /// See [`EventSink::send`].
    pub async fn info(&self, message: impl Into<String>) -> Result<(), EventError> {
        self.sink
            .send(StatusEvent::info(self.service_name, message))
            .await
    }

    /// Publish an informational event with a diagnostic payload.
    ///
    /// # Errors
    ///
    /// See [`EventSink::send`].
    pub async fn info_with_debug(
        &self,
        message: impl Into<String>,
        debug: impl Into<String>,
    ) -> Result<(), EventError> {
        self.sink
            .send(StatusEvent::info(self.service_name, message).with_debug(debug))
            .await
    }

    /// Publish a failure-flagged event.
    ///
    /// Delivered even if the request was cancelled, so a step that reports
    /// failure always leaves a failure event behind.
    ///
    /// # Errors
    ///
    /// See [`EventSink::send_terminal`].
    pub async fn failure(
        &self,
        message: impl Into<String>,
        debug: Option<String>,
    ) -> Result<(), EventError> {
        let mut event = StatusEvent::failure(self.service_name, message);
        event.debug_message = debug;
        self.sink.send_terminal(event).await
    }
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod events_tests;

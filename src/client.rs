// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Client for the provisioning server.
//!
//! Sends a [`ProvisionRequest`] and decodes the NDJSON response as it
//! arrives, handing each [`StatusEvent`] to a callback. Used by the
//! `provisionizer` binary.

use crate::constants::{DEPROVISIONIZE_PATH, PROVISIONIZE_PATH};
use crate::http::build_api_url;
use crate::types::{Operation, ProvisionRequest, StatusEvent};
use anyhow::{bail, Context, Result};
use std::io::Write;

/// Incremental NDJSON decoder.
///
/// Chunks may split lines anywhere; complete lines are decoded as soon as
/// their newline arrives.
#[derive(Debug, Default)]
pub struct NdjsonDecoder {
    buffer: Vec<u8>,
}

impl NdjsonDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `chunk` and decode every complete line.
    ///
    /// # Errors
    ///
    /// Returns an error if a complete line is not a valid event.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<StatusEvent>> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(event) = decode_line(&line)? {
                events.push(event);
            }
        }
        Ok(events)
    }

    /// Decode a trailing line without newline, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the remaining bytes are not a valid event.
    pub fn finish(mut self) -> Result<Option<StatusEvent>> {
        let rest = std::mem::take(&mut self.buffer);
        decode_line(&rest)
    }
}

fn decode_line(line: &[u8]) -> Result<Option<StatusEvent>> {
    let text = std::str::from_utf8(line).context("Response is not valid UTF-8")?;
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    let event = serde_json::from_str(text)
        .with_context(|| format!("Invalid status event: {text}"))?;
    Ok(Some(event))
}

/// Render one event for terminal output.
#[must_use]
pub fn format_event(event: &StatusEvent, debug: bool) -> String {
    let mut line = if event.failed {
        format!("[{}] FAILED: {}", event.service_name, event.message)
    } else {
        format!("[{}] {}", event.service_name, event.message)
    };
    if debug {
        if let Some(details) = &event.debug_message {
            for detail in details.lines() {
                line.push_str("\n    ");
                line.push_str(detail);
            }
        }
    }
    line
}

/// Summary of a finished request stream.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StreamSummary {
    pub events: usize,
    pub failures: usize,
}

impl StreamSummary {
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.failures == 0
    }
}

/// HTTP client for one provisioning server.
#[derive(Debug, Clone)]
pub struct ProvisionClient {
    client: reqwest::Client,
    base_url: String,
}

impl ProvisionClient {
    /// Client for the server at `api` (e.g. `http://localhost:1337`).
    #[must_use]
    pub fn new(api: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: build_api_url(api),
        }
    }

    fn url(&self, operation: Operation) -> String {
        let path = match operation {
            Operation::Provision => PROVISIONIZE_PATH,
            Operation::Deprovision => DEPROVISIONIZE_PATH,
        };
        format!("{}{path}", self.base_url)
    }

    /// Send `request` and pass every streamed event to `on_event`.
    ///
    /// # Errors
    ///
    /// Returns an error if the server cannot be reached, rejects the
    /// request, or sends an undecodable event.
    pub async fn run<F>(
        &self,
        operation: Operation,
        request: &ProvisionRequest,
        mut on_event: F,
    ) -> Result<StreamSummary>
    where
        F: FnMut(&StatusEvent),
    {
        let url = self.url(operation);
        let mut response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .with_context(|| format!("Failed to reach {url}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Server rejected the request with HTTP {status}: {body}");
        }

        let mut summary = StreamSummary::default();
        let mut record = |event: StatusEvent| {
            summary.events += 1;
            if event.failed {
                summary.failures += 1;
            }
            on_event(&event);
        };

        let mut decoder = NdjsonDecoder::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .context("Connection lost while streaming events")?
        {
            for event in decoder.push(&chunk)? {
                record(event);
            }
        }
        if let Some(event) = decoder.finish()? {
            record(event);
        }

        Ok(summary)
    }
}

/// Print an event to `out`, ignoring broken pipes.
pub fn print_event(out: &mut impl Write, event: &StatusEvent, debug: bool) {
    let _ = writeln!(out, "{}", format_event(event, debug));
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod client_tests;

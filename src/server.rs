// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! HTTP front end.
//!
//! Each provisioning call runs the orchestrator in its own task and streams
//! the request's status events back as newline-delimited JSON while the
//! adapters run. The response body ends when the orchestrator finishes.
//!
//! | Method | Path | Body |
//! |--------|------|------|
//! | `POST` | `/api/v1/provisionize` | `ProvisionRequest` → NDJSON `StatusEvent` stream |
//! | `POST` | `/api/v1/deprovisionize` | `ProvisionRequest` → NDJSON `StatusEvent` stream |
//! | `GET`  | `/healthz` | `ok` |
//! | `GET`  | `/metrics` | Prometheus text format |
//!
//! A client that disconnects mid-stream cancels its request.

use crate::constants::{
    DEPROVISIONIZE_PATH, HEALTH_PATH, METRICS_SERVER_PATH, NDJSON_CONTENT_TYPE,
    PROVISIONIZE_PATH, RESPONSE_CHANNEL_CAPACITY,
};
use crate::context::RequestContext;
use crate::metrics::gather_metrics;
use crate::orchestrator::Orchestrator;
use crate::types::{Operation, ProvisionRequest, StatusEvent};
use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::convert::Infallible;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::DropGuard;
use tracing::{error, info, warn};

/// Shared handler state.
#[derive(Clone)]
struct AppState {
    orchestrator: Arc<Orchestrator>,
    next_request: Arc<AtomicU64>,
}

impl AppState {
    fn request_id(&self, requested: &str) -> String {
        if requested.is_empty() {
            let n = self.next_request.fetch_add(1, Ordering::Relaxed);
            format!("req-{n}")
        } else {
            requested.to_string()
        }
    }
}

/// Build the router serving `orchestrator`.
pub fn router(orchestrator: Arc<Orchestrator>) -> Router {
    let state = AppState {
        orchestrator,
        next_request: Arc::new(AtomicU64::new(1)),
    };

    Router::new()
        .route(PROVISIONIZE_PATH, post(provisionize_handler))
        .route(DEPROVISIONIZE_PATH, post(deprovisionize_handler))
        .route(HEALTH_PATH, get(health_handler))
        .route(METRICS_SERVER_PATH, get(metrics_handler))
        .with_state(state)
}

/// Serve requests on `listener` until `shutdown` resolves.
///
/// In-flight responses are allowed to finish before this returns.
///
/// # Errors
///
/// Returns an error if accepting connections fails.
pub async fn serve<F>(
    listener: TcpListener,
    orchestrator: Arc<Orchestrator>,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!(address = %addr, "Listening for provisioning requests");
    }
    axum::serve(listener, router(orchestrator))
        .with_graceful_shutdown(shutdown)
        .await
}

/// Resolve on Ctrl-C, or on SIGTERM on Unix platforms.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl-C, initiating graceful shutdown"),
        () = terminate => info!("Received SIGTERM, initiating graceful shutdown"),
    }
}

async fn provisionize_handler(
    State(state): State<AppState>,
    Json(request): Json<ProvisionRequest>,
) -> Response {
    start_request(&state, Operation::Provision, request)
}

async fn deprovisionize_handler(
    State(state): State<AppState>,
    Json(request): Json<ProvisionRequest>,
) -> Response {
    start_request(&state, Operation::Deprovision, request)
}

async fn health_handler() -> &'static str {
    "ok"
}

async fn metrics_handler() -> Response {
    match gather_metrics() {
        Ok(text) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// Validate the request, spawn the orchestrator and return the event stream.
fn start_request(state: &AppState, operation: Operation, request: ProvisionRequest) -> Response {
    let vm = request.virtual_machine;
    if vm.name.trim().is_empty() {
        warn!(operation = %operation, "Rejected request without a VM name");
        return (StatusCode::BAD_REQUEST, "virtual_machine.name must not be empty").into_response();
    }

    let ctx = RequestContext::new(state.request_id(&request.request_id));
    let guard = ctx.token().drop_guard();
    let (tx, rx) = mpsc::channel::<StatusEvent>(RESPONSE_CHANNEL_CAPACITY);

    let orchestrator = state.orchestrator.clone();
    tokio::spawn(async move {
        match operation {
            Operation::Provision => orchestrator.provisionize(&ctx, &vm, tx).await,
            Operation::Deprovision => orchestrator.deprovisionize(&ctx, &vm, tx).await,
        }
    });

    (
        [(header::CONTENT_TYPE, NDJSON_CONTENT_TYPE)],
        Body::from_stream(ndjson_stream(rx, guard)),
    )
        .into_response()
}

/// Encode events as NDJSON lines.
///
/// The guard cancels the request if the body is dropped before the event
/// stream ended, which happens when the client disconnects.
fn ndjson_stream(
    rx: mpsc::Receiver<StatusEvent>,
    guard: DropGuard,
) -> impl futures::Stream<Item = Result<String, Infallible>> {
    futures::stream::unfold((rx, Some(guard)), |(mut rx, mut guard)| async move {
        loop {
            let Some(event) = rx.recv().await else {
                if let Some(guard) = guard.take() {
                    let _token = guard.disarm();
                }
                return None;
            };
            match serde_json::to_string(&event) {
                Ok(mut line) => {
                    line.push('\n');
                    return Some((Ok(line), (rx, guard)));
                }
                Err(e) => warn!(error = %e, "Dropping event that could not be encoded"),
            }
        }
    })
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod server_tests;

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::{Context, Result};
use clap::Parser;
use provisionize::{
    config::Config,
    constants::{DEFAULT_CONFIG_PATH, TOKIO_WORKER_THREADS},
    orchestrator::Orchestrator,
    server,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info};

/// Provisioning server running VMs through the configured backends
#[derive(Debug, Parser)]
#[command(name = "provisionize", version, about)]
struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Override the listen address from the configuration file
    #[arg(short, long)]
    listen: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("provisionize")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(args))
}

/// Install the tracing subscriber.
///
/// Respects `RUST_LOG` (default `info`) and `RUST_LOG_FORMAT` (`json` or
/// compact text).
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }
}

async fn async_main(args: Args) -> Result<()> {
    init_tracing();

    info!("Starting Provisionize");
    debug!(config = %args.config.display(), "Loading configuration");

    let config = Config::load(&args.config)?;
    let services = config
        .build_services()
        .context("Failed to configure backend services")?;
    let orchestrator = Arc::new(Orchestrator::new(services));
    info!(services = ?orchestrator.service_names(), "Pipeline configured");

    let address = args.listen.unwrap_or(config.listen_address);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;

    server::serve(listener, orchestrator, server::shutdown_signal())
        .await
        .context("Server exited with an error")?;

    info!("Provisionize stopped");
    Ok(())
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod main_tests;

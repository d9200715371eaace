// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # Provisionize - virtual machine provisioning pipeline
//!
//! Provisionize brings a virtual machine to life across several independent
//! infrastructure backends and tears it down again. A request runs through a
//! fixed pipeline of adapters, each streaming human-readable status events
//! back to the caller while it works.
//!
//! ## Overview
//!
//! - **Virtualization** - create, boot and delete VMs in oVirt
//! - **DNS** - forward and reverse records in Google Cloud DNS
//! - **Configuration management** - Ansible Tower job templates run against the VM
//!
//! Adapters run sequentially and the first failure stops the pipeline.
//! Long-running backend operations are awaited by polling with a fixed
//! deadline, and every wait honors request cancellation.
//!
//! ## Modules
//!
//! - [`orchestrator`] - Sequential adapter execution and event relay
//! - [`service`] - The adapter capability trait
//! - [`vm`] - oVirt adapter
//! - [`dns`] - DNS adapter, zone resolution, record reconciliation, reverse names
//! - [`configuration`] - Ansible Tower adapter
//! - [`waiter`] - Polling completion waiter
//! - [`retry`] - Single-retry submission policy
//! - [`server`] - HTTP front end streaming NDJSON events
//! - [`client`] - Client for the HTTP front end
//! - [`config`] - YAML configuration
//!
//! ## Example
//!
//! ```rust,no_run
//! use provisionize::dns::reverse::reverse_name;
//! use std::net::IpAddr;
//!
//! let ip: IpAddr = "192.0.2.10".parse().unwrap();
//! assert_eq!(reverse_name(ip), "10.2.0.192.in-addr.arpa");
//! ```

pub mod client;
pub mod config;
pub mod configuration;
pub mod constants;
pub mod context;
pub mod dns;
pub mod errors;
pub mod events;
mod http;
pub mod metrics;
pub mod orchestrator;
pub mod retry;
pub mod server;
pub mod service;
pub mod templates;
pub mod types;
pub mod vm;
pub mod waiter;

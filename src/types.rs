// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Request and event types exchanged between callers, the orchestrator and adapters.
//!
//! All types serialize with `serde` so the HTTP front end can accept a
//! [`ProvisionRequest`] as JSON and stream [`StatusEvent`]s back as NDJSON.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

/// Address configuration of one IP family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpConfig {
    /// Address assigned to the VM
    pub address: IpAddr,
    /// Prefix length of the attached network
    pub prefix_length: u8,
    /// Default gateway, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway: Option<IpAddr>,
}

/// Description of the virtual machine to provision or deprovision.
///
/// Immutable once a request has been accepted; every adapter sees the same value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VirtualMachineSpec {
    /// Internal identifier
    #[serde(default)]
    pub id: String,
    /// Display name of the VM
    pub name: String,
    /// Cluster/pool the VM is placed on
    #[serde(default)]
    pub cluster_name: String,
    /// Provisioning template name, mapped to backend templates by configuration
    #[serde(default)]
    pub template: String,
    /// Number of CPU cores
    #[serde(default)]
    pub cores: u32,
    /// Memory size in megabytes
    #[serde(default)]
    pub memory_mb: u32,
    /// Fully-qualified domain name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fqdn: Option<String>,
    /// IPv4 configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv4: Option<IpConfig>,
    /// IPv6 configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv6: Option<IpConfig>,
}

impl VirtualMachineSpec {
    /// All configured addresses, IPv4 first.
    #[must_use]
    pub fn addresses(&self) -> Vec<IpAddr> {
        self.ipv4
            .iter()
            .chain(self.ipv6.iter())
            .map(|c| c.address)
            .collect()
    }

    /// The FQDN if set, otherwise the VM name.
    #[must_use]
    pub fn host_name(&self) -> &str {
        self.fqdn.as_deref().unwrap_or(&self.name)
    }
}

/// Inbound request: an identifier plus the VM to act on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionRequest {
    /// Caller-chosen request identifier, used for logging
    #[serde(default)]
    pub request_id: String,
    /// VM to provision or deprovision
    pub virtual_machine: VirtualMachineSpec,
}

/// Progress or failure report from one adapter.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusEvent {
    /// Name of the adapter that produced the event
    pub service_name: String,
    /// Human-readable message
    #[serde(default)]
    pub message: String,
    /// Raw diagnostic payload (request/response bodies)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_message: Option<String>,
    /// Set when the event reports a failure
    #[serde(default)]
    pub failed: bool,
}

impl StatusEvent {
    /// Informational event.
    pub fn info(service_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            message: message.into(),
            debug_message: None,
            failed: false,
        }
    }

    /// Failure-flagged event.
    pub fn failure(service_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            failed: true,
            ..Self::info(service_name, message)
        }
    }

    /// Attach a diagnostic payload.
    #[must_use]
    pub fn with_debug(mut self, debug_message: impl Into<String>) -> Self {
        self.debug_message = Some(debug_message.into());
        self
    }
}

/// The two request kinds handled by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Create the VM and everything around it
    Provision,
    /// Tear it down again
    Deprovision,
}

impl Operation {
    /// Lowercase name used in logs and metric labels.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Provision => "provision",
            Self::Deprovision => "deprovision",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod types_tests;

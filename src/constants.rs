// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for Provisionize.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// Service Names
// ============================================================================

/// Name reported in status events emitted by the virtualization adapter
pub const SERVICE_NAME_OVIRT: &str = "oVirt";

/// Name reported in status events emitted by the DNS adapter
pub const SERVICE_NAME_DNS: &str = "Google Cloud DNS";

/// Name reported in status events emitted by the configuration-management adapter
pub const SERVICE_NAME_TOWER: &str = "Ansible Tower";

// ============================================================================
// DNS Constants
// ============================================================================

/// Default TTL for records created by the reconciler (5 minutes)
pub const DEFAULT_DNS_RECORD_TTL_SECS: u32 = 300;

/// Suffix of IPv4 reverse-lookup names
pub const IPV4_REVERSE_SUFFIX: &str = "in-addr.arpa";

/// Suffix of IPv6 reverse-lookup names
pub const IPV6_REVERSE_SUFFIX: &str = "ip6.arpa";

/// Google Cloud DNS REST API base URL
pub const GOOGLE_CLOUD_DNS_API_URL: &str = "https://dns.googleapis.com/dns/v1";

// ============================================================================
// Polling Constants
// ============================================================================

/// Default interval between two status probes (10 seconds)
pub const DEFAULT_POLLING_INTERVAL_SECS: u64 = 10;

/// Default maximum time to wait for a remote operation (2 minutes)
pub const DEFAULT_WAIT_TIMEOUT_SECS: u64 = 120;

/// Backoff before resubmitting an operation rejected with a transient status (100ms)
pub const SUBMIT_RETRY_BACKOFF_MILLIS: u64 = 100;

// ============================================================================
// oVirt Constants
// ============================================================================

/// VM status reported once the VM is created and powered off
pub const OVIRT_STATUS_DOWN: &str = "down";

/// VM status reported once the VM is running
pub const OVIRT_STATUS_UP: &str = "up";

/// oVirt answers 400 while its API is not ready to accept a create request
pub const OVIRT_TRANSIENT_SUBMIT_STATUS: u16 = 400;

/// Disk interface used when attaching a boot disk
pub const OVIRT_BOOT_DISK_INTERFACE: &str = "virtio_scsi";

/// Disk search matching disks not attached to any VM
pub const OVIRT_UNATTACHED_DISK_SEARCH: &str = "number_of_vms=0";

/// Number of bytes per megabyte used for VM memory sizes
pub const BYTES_PER_MEGABYTE: u64 = 1 << 20;

// ============================================================================
// Ansible Tower Constants
// ============================================================================

/// Job status reported by Tower when a playbook run completed
pub const TOWER_STATUS_SUCCESSFUL: &str = "successful";

/// Job statuses Tower reports when a playbook run will not complete
pub const TOWER_FAILURE_STATUSES: &[&str] = &["failed", "error", "canceled"];

/// Tower REST API path prefix
pub const TOWER_API_PATH: &str = "/api/v2";

// ============================================================================
// Event Channel Constants
// ============================================================================

/// Capacity of the per-request event channel (one in-flight event)
pub const EVENT_CHANNEL_CAPACITY: usize = 1;

/// Capacity of the channel feeding the HTTP response stream
pub const RESPONSE_CHANNEL_CAPACITY: usize = 16;

// ============================================================================
// Server Constants
// ============================================================================

/// Default API listen address
pub const DEFAULT_LISTEN_ADDRESS: &str = "[::]:1337";

/// Default configuration file path
pub const DEFAULT_CONFIG_PATH: &str = "config.yml";

/// Path for provisioning requests
pub const PROVISIONIZE_PATH: &str = "/api/v1/provisionize";

/// Path for deprovisioning requests
pub const DEPROVISIONIZE_PATH: &str = "/api/v1/deprovisionize";

/// Path for Prometheus metrics endpoint
pub const METRICS_SERVER_PATH: &str = "/metrics";

/// Path for the liveness endpoint
pub const HEALTH_PATH: &str = "/healthz";

/// Content type of streamed status events
pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 4;

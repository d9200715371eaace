// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Idempotent record management within one zone.
//!
//! A [`RecordReconciler`] is loaded with a snapshot of a zone's records once
//! per request. `ensure_exists` and `ensure_absent` consult that snapshot to
//! decide whether the backend has to be contacted at all, and fold their own
//! successful changes back into it. The snapshot is never re-fetched.
//!
//! Records are identified by (name, type); values are not compared. A record
//! that exists with a different value is left untouched.

use crate::dns::zone::{fqdn, names_equal, ManagedZone};
use crate::dns::DnsBackend;
use crate::errors::{BackendError, ProvisionError};
use crate::events::Reporter;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use tracing::{debug, info};

/// Record types managed for a VM.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    /// IPv4 address record
    A,
    /// IPv6 address record
    AAAA,
    /// Reverse pointer record
    PTR,
}

impl RecordType {
    /// Wire name of the type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::AAAA => "AAAA",
            Self::PTR => "PTR",
        }
    }

    /// Address record type for `ip`.
    #[must_use]
    pub fn for_address(ip: IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => Self::A,
            IpAddr::V6(v6) if v6.to_ipv4_mapped().is_some() => Self::A,
            IpAddr::V6(_) => Self::AAAA,
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One record set as stored by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecord {
    /// Absolute owner name (trailing dot)
    pub name: String,
    /// Record type as reported by the backend
    #[serde(rename = "type")]
    pub record_type: String,
    /// Time-to-live in seconds
    #[serde(default)]
    pub ttl: u32,
    /// Record data
    #[serde(rename = "rrdatas", default)]
    pub values: Vec<String>,
}

impl ResourceRecord {
    pub fn new(name: &str, record_type: RecordType, ttl: u32, value: impl Into<String>) -> Self {
        Self {
            name: fqdn(name),
            record_type: record_type.as_str().to_string(),
            ttl,
            values: vec![value.into()],
        }
    }

    /// Whether this record has the identity (`name`, `record_type`).
    #[must_use]
    pub fn matches(&self, name: &str, record_type: RecordType) -> bool {
        self.record_type.eq_ignore_ascii_case(record_type.as_str()) && names_equal(&self.name, name)
    }
}

impl fmt::Display for ResourceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}",
            self.name,
            self.ttl,
            self.record_type,
            self.values.join(" ")
        )
    }
}

/// What an ensure call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    /// The record was created
    Created,
    /// A record with the same identity was already there
    AlreadyPresent,
    /// The record was deleted
    Deleted,
    /// No record with that identity was there
    AlreadyAbsent,
}

/// Record reconciler for one zone.
pub struct RecordReconciler<'a, B: ?Sized> {
    backend: &'a B,
    zone: ManagedZone,
    records: Vec<ResourceRecord>,
    ttl: u32,
}

impl<'a, B: DnsBackend + ?Sized> RecordReconciler<'a, B> {
    /// Fetch the snapshot of `zone`.
    ///
    /// # Errors
    ///
    /// Returns the backend error if the records cannot be listed.
    pub async fn load(backend: &'a B, zone: ManagedZone, ttl: u32) -> Result<Self, BackendError> {
        let records = backend.list_records(&zone).await?;
        debug!(
            zone = %zone.name,
            records = records.len(),
            "Loaded zone snapshot"
        );
        Ok(Self::with_snapshot(backend, zone, records, ttl))
    }

    /// Build a reconciler from an already fetched snapshot.
    pub fn with_snapshot(
        backend: &'a B,
        zone: ManagedZone,
        records: Vec<ResourceRecord>,
        ttl: u32,
    ) -> Self {
        Self {
            backend,
            zone,
            records,
            ttl,
        }
    }

    #[must_use]
    pub fn zone(&self) -> &ManagedZone {
        &self.zone
    }

    /// Current view of the zone's records.
    #[must_use]
    pub fn records(&self) -> &[ResourceRecord] {
        &self.records
    }

    fn position(&self, name: &str, record_type: RecordType) -> Option<usize> {
        self.records
            .iter()
            .position(|r| r.matches(name, record_type))
    }

    /// Make sure a `record_type` record for `name` exists.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::RecordChange`] if the create call fails and
    /// [`ProvisionError::Event`] if an event cannot be delivered.
    pub async fn ensure_exists(
        &mut self,
        reporter: Reporter<'_>,
        name: &str,
        record_type: RecordType,
        value: &str,
    ) -> Result<Reconciled, ProvisionError> {
        let name = fqdn(name);

        if self.position(&name, record_type).is_some() {
            reporter
                .info(format!(
                    "{record_type} record for {name} already exists: skipping"
                ))
                .await?;
            return Ok(Reconciled::AlreadyPresent);
        }

        let record = ResourceRecord::new(&name, record_type, self.ttl, value);
        info!(
            zone = %self.zone.name,
            record = %record,
            "Creating DNS record"
        );

        let response = self
            .backend
            .create_record(&self.zone, &record)
            .await
            .map_err(|source| ProvisionError::RecordChange {
                action: "create",
                record_type: record.record_type.clone(),
                name: name.clone(),
                zone: self.zone.name.clone(),
                source,
            })?;

        let message = format!(
            "Created {record_type} record for {name} with value {value} in zone {}",
            self.zone.name
        );
        self.records.push(record);
        reporter.info_with_debug(message, response).await?;

        Ok(Reconciled::Created)
    }

    /// Make sure no `record_type` record for `name` exists.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::RecordChange`] if the delete call fails and
    /// [`ProvisionError::Event`] if an event cannot be delivered.
    pub async fn ensure_absent(
        &mut self,
        reporter: Reporter<'_>,
        name: &str,
        record_type: RecordType,
    ) -> Result<Reconciled, ProvisionError> {
        let name = fqdn(name);

        let Some(index) = self.position(&name, record_type) else {
            reporter
                .info(format!(
                    "{record_type} record for {name} already removed: skipping"
                ))
                .await?;
            return Ok(Reconciled::AlreadyAbsent);
        };

        let record = &self.records[index];
        info!(
            zone = %self.zone.name,
            record = %record,
            "Deleting DNS record"
        );

        let response = self
            .backend
            .delete_record(&self.zone, record)
            .await
            .map_err(|source| ProvisionError::RecordChange {
                action: "delete",
                record_type: record.record_type.clone(),
                name: name.clone(),
                zone: self.zone.name.clone(),
                source,
            })?;

        self.records.remove(index);
        reporter
            .info_with_debug(
                format!(
                    "Deleted {record_type} record for {name} in zone {}",
                    self.zone.name
                ),
                response,
            )
            .await?;

        Ok(Reconciled::Deleted)
    }
}

#[cfg(test)]
#[path = "records_tests.rs"]
mod records_tests;

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Managed zones and the most-specific-zone lookup.
//!
//! Names are compared label by label, case-insensitively and with the
//! trailing dot ignored, so `Host.Example.COM.` and `host.example.com` are
//! the same name.

use serde::{Deserialize, Serialize};

/// A DNS zone hosted by the DNS backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedZone {
    /// Backend identifier of the zone (used in API paths)
    pub name: String,
    /// Domain suffix the zone is authoritative for, e.g. `example.com.`
    pub dns_name: String,
}

impl ManagedZone {
    pub fn new(name: impl Into<String>, dns_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dns_name: dns_name.into(),
        }
    }
}

/// Lowercase `name` and strip surrounding dots.
#[must_use]
pub fn normalize(name: &str) -> String {
    name.trim_matches('.').to_ascii_lowercase()
}

/// Absolute form of `name`: exactly one trailing dot.
///
/// # Example
///
/// ```rust
/// use provisionize::dns::zone::fqdn;
///
/// assert_eq!(fqdn("host.example.com"), "host.example.com.");
/// assert_eq!(fqdn("host.example.com."), "host.example.com.");
/// ```
#[must_use]
pub fn fqdn(name: &str) -> String {
    format!("{}.", name.trim_matches('.'))
}

/// Whether `a` and `b` name the same node.
#[must_use]
pub fn names_equal(a: &str, b: &str) -> bool {
    a.trim_matches('.').eq_ignore_ascii_case(b.trim_matches('.'))
}

fn labels(name: &str) -> Vec<String> {
    let normalized = normalize(name);
    if normalized.is_empty() {
        return Vec::new();
    }
    normalized.split('.').map(str::to_string).collect()
}

/// Whether `target` is `zone_name` or lies below it.
#[must_use]
pub fn is_within(target: &str, zone_name: &str) -> bool {
    labels(target).ends_with(&labels(zone_name))
}

/// Find the most specific zone containing `target`.
///
/// Returns `None` if no zone matches. Among zones with equally long
/// suffixes the first one in `zones` wins.
///
/// # Example
///
/// ```rust
/// use provisionize::dns::zone::{find_zone, ManagedZone};
///
/// let zones = vec![
///     ManagedZone::new("routing-rocks", "routing.rocks."),
///     ManagedZone::new("dus", "dus.routing.rocks."),
/// ];
/// let zone = find_zone("abc.dus.routing.rocks", &zones).unwrap();
/// assert_eq!(zone.name, "dus");
/// ```
#[must_use]
pub fn find_zone<'a>(target: &str, zones: &'a [ManagedZone]) -> Option<&'a ManagedZone> {
    let target_labels = labels(target);

    let mut best: Option<(&ManagedZone, usize)> = None;
    for zone in zones {
        let zone_labels = labels(&zone.dns_name);
        if !target_labels.ends_with(&zone_labels) {
            continue;
        }

        let len = zone_labels.len();
        if best.is_none_or(|(_, best_len)| len > best_len) {
            best = Some((zone, len));
        }
    }

    best.map(|(zone, _)| zone)
}

#[cfg(test)]
#[path = "zone_tests.rs"]
mod zone_tests;

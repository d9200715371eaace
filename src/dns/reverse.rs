// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reverse-lookup domain names (RFC 1035 §3.5, RFC 3596 §2.5).

use crate::constants::{IPV4_REVERSE_SUFFIX, IPV6_REVERSE_SUFFIX};
use std::fmt::Write;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Reverse-lookup name of `ip`, without trailing dot.
///
/// IPv4-mapped IPv6 addresses are treated as the IPv4 address they carry.
///
/// # Example
///
/// ```rust
/// use provisionize::dns::reverse::reverse_name;
///
/// let ip = "185.138.53.1".parse().unwrap();
/// assert_eq!(reverse_name(ip), "1.53.138.185.in-addr.arpa");
/// ```
#[must_use]
pub fn reverse_name(ip: IpAddr) -> String {
    match ip {
        IpAddr::V4(v4) => ipv4_reverse_name(v4),
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => ipv4_reverse_name(v4),
            None => ipv6_reverse_name(v6),
        },
    }
}

/// Octets in reverse order under `in-addr.arpa`.
#[must_use]
pub fn ipv4_reverse_name(ip: Ipv4Addr) -> String {
    let mut name = String::with_capacity(29);
    for octet in ip.octets().iter().rev() {
        let _ = write!(name, "{octet}.");
    }
    name.push_str(IPV4_REVERSE_SUFFIX);
    name
}

/// 32 nibbles in reverse order under `ip6.arpa`.
#[must_use]
pub fn ipv6_reverse_name(ip: Ipv6Addr) -> String {
    let mut name = String::with_capacity(72);
    for byte in ip.octets().iter().rev() {
        let _ = write!(name, "{:x}.{:x}.", byte & 0x0f, byte >> 4);
    }
    name.push_str(IPV6_REVERSE_SUFFIX);
    name
}

#[cfg(test)]
#[path = "reverse_tests.rs"]
mod reverse_tests;

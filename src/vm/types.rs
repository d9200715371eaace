// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! oVirt REST API payloads.

use crate::constants::{BYTES_PER_MEGABYTE, OVIRT_BOOT_DISK_INTERFACE};
use crate::types::{IpConfig, VirtualMachineSpec};
use serde::{Deserialize, Serialize};

/// A VM as reported by oVirt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vm {
    /// oVirt identifier
    pub id: String,
    /// VM name
    #[serde(default)]
    pub name: String,
    /// Power/lifecycle status (`image_locked`, `down`, `up`, ...)
    #[serde(default)]
    pub status: String,
}

/// Response of `GET vms`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VmList {
    #[serde(default)]
    pub vm: Vec<Vm>,
}

/// A disk as reported by `GET disks`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disk {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Response of `GET disks`, newest disk first.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiskList {
    #[serde(default)]
    pub disk: Vec<Disk>,
}

/// A disk attached to a VM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskAttachment {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub bootable: bool,
}

/// Response of `GET vms/{id}/diskattachments`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiskAttachmentList {
    #[serde(default)]
    pub disk_attachment: Vec<DiskAttachment>,
}

/// Reference to another oVirt object by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdRef {
    pub id: String,
}

/// Body of `POST vms/{id}/diskattachments`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewDiskAttachment {
    pub bootable: bool,
    pub pass_discard: bool,
    pub interface: &'static str,
    pub active: bool,
    pub disk: IdRef,
}

impl NewDiskAttachment {
    /// Attach `disk_id` as the active boot disk.
    #[must_use]
    pub fn boot(disk_id: &str) -> Self {
        Self {
            bootable: true,
            pass_discard: false,
            interface: OVIRT_BOOT_DISK_INTERFACE,
            active: true,
            disk: IdRef {
                id: disk_id.to_string(),
            },
        }
    }
}

/// Reference to another oVirt object by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameRef {
    pub name: String,
}

impl NameRef {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CpuTopology {
    pub cores: u32,
    pub sockets: u32,
    pub threads: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cpu {
    pub topology: CpuTopology,
}

/// Static address assignment of one IP family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IpSettings {
    pub address: String,
    pub netmask: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway: Option<String>,
    pub version: &'static str,
}

impl IpSettings {
    fn from_config(config: &IpConfig, version: &'static str) -> Self {
        Self {
            address: config.address.to_string(),
            netmask: config.prefix_length.to_string(),
            gateway: config.gateway.map(|g| g.to_string()),
            version,
        }
    }
}

/// Guest network configuration applied on first boot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NicConfiguration {
    pub name: String,
    pub on_boot: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boot_protocol: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<IpSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipv6_boot_protocol: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipv6: Option<IpSettings>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NicConfigurations {
    pub nic_configuration: Vec<NicConfiguration>,
}

/// Guest initialization (cloud-init) settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Initialization {
    pub host_name: String,
    pub nic_configurations: NicConfigurations,
}

/// Body of `POST vms`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VmCreateRequest {
    pub name: String,
    pub cluster: NameRef,
    pub template: NameRef,
    /// Memory in bytes
    pub memory: u64,
    pub cpu: Cpu,
    pub initialization: Initialization,
}

impl VmCreateRequest {
    /// Build the create request for `vm` cloned from `ovirt_template`.
    #[must_use]
    pub fn for_vm(vm: &VirtualMachineSpec, ovirt_template: &str) -> Self {
        let nic = NicConfiguration {
            name: "eth0".to_string(),
            on_boot: true,
            boot_protocol: vm.ipv4.as_ref().map(|_| "static"),
            ip: vm.ipv4.as_ref().map(|c| IpSettings::from_config(c, "v4")),
            ipv6_boot_protocol: vm.ipv6.as_ref().map(|_| "static"),
            ipv6: vm.ipv6.as_ref().map(|c| IpSettings::from_config(c, "v6")),
        };

        Self {
            name: vm.name.clone(),
            cluster: NameRef::new(&vm.cluster_name),
            template: NameRef::new(ovirt_template),
            memory: u64::from(vm.memory_mb) * BYTES_PER_MEGABYTE,
            cpu: Cpu {
                topology: CpuTopology {
                    cores: vm.cores,
                    sockets: 1,
                    threads: 1,
                },
            },
            initialization: Initialization {
                host_name: vm.host_name().to_string(),
                nic_configurations: NicConfigurations {
                    nic_configuration: vec![nic],
                },
            },
        }
    }
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod types_tests;

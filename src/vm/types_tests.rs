// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `vm/types.rs`

#[cfg(test)]
mod tests {
    use crate::types::{IpConfig, VirtualMachineSpec};
    use crate::vm::types::{DiskAttachmentList, DiskList, NewDiskAttachment, Vm, VmCreateRequest, VmList};
    use serde_json::json;

    fn spec() -> VirtualMachineSpec {
        VirtualMachineSpec {
            id: "42".to_string(),
            name: "web-01".to_string(),
            cluster_name: "cluster-a".to_string(),
            template: "debian".to_string(),
            cores: 4,
            memory_mb: 1024,
            fqdn: Some("web-01.example.com".to_string()),
            ipv4: Some(IpConfig {
                address: "192.0.2.10".parse().unwrap(),
                prefix_length: 24,
                gateway: Some("192.0.2.1".parse().unwrap()),
            }),
            ipv6: None,
        }
    }

    #[test]
    fn test_create_request_body() {
        let request = VmCreateRequest::for_vm(&spec(), "debian-12-template");
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(
            body,
            json!({
                "name": "web-01",
                "cluster": {"name": "cluster-a"},
                "template": {"name": "debian-12-template"},
                "memory": 1_073_741_824u64,
                "cpu": {"topology": {"cores": 4, "sockets": 1, "threads": 1}},
                "initialization": {
                    "host_name": "web-01.example.com",
                    "nic_configurations": {
                        "nic_configuration": [{
                            "name": "eth0",
                            "on_boot": true,
                            "boot_protocol": "static",
                            "ip": {
                                "address": "192.0.2.10",
                                "netmask": "24",
                                "gateway": "192.0.2.1",
                                "version": "v4"
                            }
                        }]
                    }
                }
            })
        );
    }

    #[test]
    fn test_create_request_ipv6_and_name_fallback() {
        let mut vm = spec();
        vm.fqdn = None;
        vm.ipv4 = None;
        vm.ipv6 = Some(IpConfig {
            address: "2001:db8::10".parse().unwrap(),
            prefix_length: 64,
            gateway: None,
        });

        let request = VmCreateRequest::for_vm(&vm, "t");
        let nic = &request.initialization.nic_configurations.nic_configuration[0];

        assert_eq!(request.initialization.host_name, "web-01");
        assert!(nic.ip.is_none());
        assert_eq!(nic.ipv6_boot_protocol, Some("static"));
        assert_eq!(nic.ipv6.as_ref().unwrap().version, "v6");
        assert_eq!(nic.ipv6.as_ref().unwrap().netmask, "64");
    }

    #[test]
    fn test_memory_does_not_overflow() {
        let mut vm = spec();
        vm.memory_mb = u32::MAX;
        let request = VmCreateRequest::for_vm(&vm, "t");
        assert_eq!(request.memory, u64::from(u32::MAX) << 20);
    }

    #[test]
    fn test_parse_vm_list() {
        let list: VmList = serde_json::from_value(json!({
            "vm": [
                {"id": "a1", "name": "web-01", "status": "down", "href": "/ovirt-engine/api/vms/a1"},
                {"id": "b2", "name": "web-02"}
            ]
        }))
        .unwrap();

        assert_eq!(list.vm.len(), 2);
        assert_eq!(
            list.vm[0],
            Vm {
                id: "a1".to_string(),
                name: "web-01".to_string(),
                status: "down".to_string(),
            }
        );
        assert_eq!(list.vm[1].status, "");
    }

    #[test]
    fn test_parse_empty_vm_list() {
        let list: VmList = serde_json::from_value(json!({})).unwrap();
        assert!(list.vm.is_empty());
    }

    #[test]
    fn test_boot_disk_attachment_body() {
        let body = serde_json::to_value(NewDiskAttachment::boot("disk-7")).unwrap();
        assert_eq!(
            body,
            json!({
                "bootable": true,
                "pass_discard": false,
                "interface": "virtio_scsi",
                "active": true,
                "disk": {"id": "disk-7"}
            })
        );
    }

    #[test]
    fn test_disk_lists_tolerate_missing_fields() {
        let attachments: DiskAttachmentList = serde_json::from_value(json!({
            "disk_attachment": [{"id": "a-1"}, {"id": "a-2", "bootable": true}]
        }))
        .unwrap();
        assert!(!attachments.disk_attachment[0].bootable);
        assert!(attachments.disk_attachment[1].bootable);

        let disks: DiskList = serde_json::from_value(json!({})).unwrap();
        assert!(disks.disk.is_empty());
    }
}

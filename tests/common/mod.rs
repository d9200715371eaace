// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-memory backends shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use provisionize::configuration::{Job, JobBackend, LaunchRequest, TowerService};
use provisionize::dns::records::ResourceRecord;
use provisionize::dns::zone::ManagedZone;
use provisionize::dns::{DnsBackend, DnsService};
use provisionize::errors::BackendError;
use provisionize::orchestrator::Orchestrator;
use provisionize::service::ProvisionService;
use provisionize::templates::{ProvisionTemplate, TemplateManager};
use provisionize::types::{IpConfig, StatusEvent, VirtualMachineSpec};
use provisionize::vm::types::{Disk, DiskAttachment, NewDiskAttachment, Vm, VmCreateRequest};
use provisionize::vm::{OvirtService, VmBackend};
use provisionize::waiter::Waiter;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn not_found(url: String) -> BackendError {
    BackendError::UnexpectedStatus {
        url,
        status: 404,
        body: String::new(),
    }
}

// ============================================================================
// Virtualization
// ============================================================================

#[derive(Debug, Default)]
struct HypervisorState {
    /// id -> (vm, statuses still to report before settling)
    vms: HashMap<String, (Vm, Vec<&'static str>)>,
    next_id: u64,
    created: Vec<VmCreateRequest>,
    deleted: Vec<String>,
}

/// Hypervisor whose VMs go `image_locked` -> `down` after creation and
/// `powering_up` -> `up` after start.
#[derive(Debug, Clone, Default)]
pub struct FakeHypervisor {
    state: Arc<Mutex<HypervisorState>>,
}

impl FakeHypervisor {
    /// Register an existing VM.
    pub fn with_vm(self, name: &str, status: &str) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.next_id += 1;
            let id = format!("vm-{}", state.next_id);
            let vm = Vm {
                id: id.clone(),
                name: name.to_string(),
                status: status.to_string(),
            };
            state.vms.insert(id, (vm, Vec::new()));
        }
        self
    }

    pub fn created(&self) -> Vec<VmCreateRequest> {
        self.state.lock().unwrap().created.clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.state.lock().unwrap().deleted.clone()
    }

    pub fn vm_named(&self, name: &str) -> Option<Vm> {
        self.state
            .lock()
            .unwrap()
            .vms
            .values()
            .find(|(vm, _)| vm.name == name)
            .map(|(vm, _)| vm.clone())
    }
}

#[async_trait]
impl VmBackend for FakeHypervisor {
    async fn create_vm(&self, request: &VmCreateRequest) -> Result<(Vm, String), BackendError> {
        let mut state = self.state.lock().unwrap();
        state.created.push(request.clone());
        state.next_id += 1;
        let vm = Vm {
            id: format!("vm-{}", state.next_id),
            name: request.name.clone(),
            status: "image_locked".to_string(),
        };
        state
            .vms
            .insert(vm.id.clone(), (vm.clone(), vec!["image_locked", "down"]));
        Ok((vm.clone(), format!("{{\"id\":\"{}\"}}", vm.id)))
    }

    async fn get_vm(&self, id: &str) -> Result<Vm, BackendError> {
        let mut state = self.state.lock().unwrap();
        let Some((vm, pending)) = state.vms.get_mut(id) else {
            return Err(not_found(format!("vms/{id}")));
        };
        if !pending.is_empty() {
            vm.status = pending.remove(0).to_string();
        }
        Ok(vm.clone())
    }

    async fn find_vm_by_name(&self, name: &str) -> Result<Option<Vm>, BackendError> {
        Ok(self.vm_named(name))
    }

    /// Clones always come with their boot disk attached.
    async fn list_disk_attachments(&self, id: &str) -> Result<Vec<DiskAttachment>, BackendError> {
        if !self.state.lock().unwrap().vms.contains_key(id) {
            return Err(not_found(format!("vms/{id}/diskattachments")));
        }
        Ok(vec![DiskAttachment {
            id: format!("{id}-boot"),
            bootable: true,
        }])
    }

    async fn find_unattached_disk(&self, _name: &str) -> Result<Option<Disk>, BackendError> {
        Ok(None)
    }

    async fn attach_disk(
        &self,
        id: &str,
        _attachment: &NewDiskAttachment,
    ) -> Result<String, BackendError> {
        Err(not_found(format!("vms/{id}/diskattachments")))
    }

    async fn start_vm(&self, id: &str) -> Result<String, BackendError> {
        let mut state = self.state.lock().unwrap();
        let Some((_, pending)) = state.vms.get_mut(id) else {
            return Err(not_found(format!("vms/{id}/start")));
        };
        *pending = vec!["powering_up", "up"];
        Ok("{\"status\":\"complete\"}".to_string())
    }

    async fn delete_vm(&self, id: &str) -> Result<String, BackendError> {
        let mut state = self.state.lock().unwrap();
        if state.vms.remove(id).is_none() {
            return Err(not_found(format!("vms/{id}")));
        }
        state.deleted.push(id.to_string());
        Ok("{\"status\":\"complete\"}".to_string())
    }
}

// ============================================================================
// DNS
// ============================================================================

#[derive(Debug, Default)]
struct DnsState {
    zones: Vec<ManagedZone>,
    records: HashMap<String, Vec<ResourceRecord>>,
    creates: usize,
    deletes: usize,
    zone_listings: usize,
}

/// DNS host keeping record sets in memory.
#[derive(Debug, Clone, Default)]
pub struct FakeDns {
    state: Arc<Mutex<DnsState>>,
}

impl FakeDns {
    pub fn with_zone(self, name: &str, dns_name: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .zones
            .push(ManagedZone::new(name, dns_name));
        self
    }

    /// Records of zone `name`, sorted as `name type value` lines.
    pub fn records(&self, zone: &str) -> Vec<String> {
        let state = self.state.lock().unwrap();
        let mut lines: Vec<String> = state
            .records
            .get(zone)
            .map(|records| {
                records
                    .iter()
                    .map(|r| format!("{} {} {}", r.name, r.record_type, r.values.join(",")))
                    .collect()
            })
            .unwrap_or_default();
        lines.sort();
        lines
    }

    pub fn creates(&self) -> usize {
        self.state.lock().unwrap().creates
    }

    pub fn deletes(&self) -> usize {
        self.state.lock().unwrap().deletes
    }
}

#[async_trait]
impl DnsBackend for FakeDns {
    async fn list_zones(&self) -> Result<Vec<ManagedZone>, BackendError> {
        let mut state = self.state.lock().unwrap();
        state.zone_listings += 1;
        Ok(state.zones.clone())
    }

    async fn list_records(&self, zone: &ManagedZone) -> Result<Vec<ResourceRecord>, BackendError> {
        let state = self.state.lock().unwrap();
        Ok(state.records.get(&zone.name).cloned().unwrap_or_default())
    }

    async fn create_record(
        &self,
        zone: &ManagedZone,
        record: &ResourceRecord,
    ) -> Result<String, BackendError> {
        let mut state = self.state.lock().unwrap();
        state.creates += 1;
        state
            .records
            .entry(zone.name.clone())
            .or_default()
            .push(record.clone());
        Ok("{\"status\":\"done\"}".to_string())
    }

    async fn delete_record(
        &self,
        zone: &ManagedZone,
        record: &ResourceRecord,
    ) -> Result<String, BackendError> {
        let mut state = self.state.lock().unwrap();
        state.deletes += 1;
        if let Some(records) = state.records.get_mut(&zone.name) {
            records.retain(|r| !(r.name == record.name && r.record_type == record.record_type));
        }
        Ok("{\"status\":\"done\"}".to_string())
    }
}

// ============================================================================
// Configuration management
// ============================================================================

#[derive(Debug, Default)]
struct TowerState {
    launches: Vec<(u64, String)>,
    polls: HashMap<u64, usize>,
}

/// Job runner whose jobs report `running` once, then `successful`.
#[derive(Debug, Clone, Default)]
pub struct FakeTower {
    state: Arc<Mutex<TowerState>>,
}

impl FakeTower {
    pub fn launches(&self) -> Vec<(u64, String)> {
        self.state.lock().unwrap().launches.clone()
    }
}

#[async_trait]
impl JobBackend for FakeTower {
    fn launch_url(&self, template_id: u64) -> String {
        format!("https://tower.test/api/v2/job_templates/{template_id}/launch/")
    }

    async fn launch_job(
        &self,
        template_id: u64,
        request: &LaunchRequest<'_>,
    ) -> Result<(Job, String), BackendError> {
        self.state
            .lock()
            .unwrap()
            .launches
            .push((template_id, request.limit.to_string()));
        let job = Job {
            id: template_id + 1000,
            name: format!("job for template {template_id}"),
            playbook: "site.yml".to_string(),
            status: "pending".to_string(),
        };
        Ok((job, "{}".to_string()))
    }

    async fn get_job(&self, id: u64) -> Result<(Job, String), BackendError> {
        let mut state = self.state.lock().unwrap();
        let polls = state.polls.entry(id).or_default();
        *polls += 1;
        let status = if *polls == 1 { "running" } else { "successful" };
        let job = Job {
            id,
            name: String::new(),
            playbook: String::new(),
            status: status.to_string(),
        };
        Ok((job, format!("{{\"status\":\"{status}\"}}")))
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Fakes wired into a full oVirt -> DNS -> Tower pipeline.
pub struct Pipeline {
    pub hypervisor: FakeHypervisor,
    pub dns: FakeDns,
    pub tower: FakeTower,
    pub orchestrator: Orchestrator,
}

pub fn templates() -> Arc<TemplateManager> {
    Arc::new(TemplateManager::new(vec![ProvisionTemplate {
        name: "debian-web".to_string(),
        ovirt_template: Some("debian-12".to_string()),
        boot_disk: Some("debian-12-boot".to_string()),
        tower_templates: vec![10, 11],
    }]))
}

pub fn pipeline(hypervisor: FakeHypervisor, dns: FakeDns, interval: Duration) -> Pipeline {
    let tower = FakeTower::default();
    let templates = templates();
    let waiter = Waiter::new(interval, interval * 30);

    let services: Vec<Arc<dyn ProvisionService>> = vec![
        Arc::new(OvirtService::new(hypervisor.clone(), templates.clone(), waiter)),
        Arc::new(DnsService::new(dns.clone())),
        Arc::new(TowerService::new(tower.clone(), templates, waiter)),
    ];

    Pipeline {
        hypervisor,
        dns,
        tower,
        orchestrator: Orchestrator::new(services),
    }
}

/// Zones covering `example.com` and both reverse networks of [`vm`].
pub fn standard_dns() -> FakeDns {
    FakeDns::default()
        .with_zone("example-com", "example.com.")
        .with_zone("rev-192-0-2", "2.0.192.in-addr.arpa.")
        .with_zone("rev-2001-db8", "8.b.d.0.1.0.0.2.ip6.arpa.")
}

pub fn vm() -> VirtualMachineSpec {
    VirtualMachineSpec {
        id: "42".to_string(),
        name: "web-01".to_string(),
        cluster_name: "Default".to_string(),
        template: "debian-web".to_string(),
        cores: 2,
        memory_mb: 2048,
        fqdn: Some("web-01.example.com".to_string()),
        ipv4: Some(IpConfig {
            address: "192.0.2.10".parse().unwrap(),
            prefix_length: 24,
            gateway: Some("192.0.2.1".parse().unwrap()),
        }),
        ipv6: Some(IpConfig {
            address: "2001:db8::10".parse().unwrap(),
            prefix_length: 64,
            gateway: None,
        }),
    }
}

/// Messages of `events` emitted by `service`.
pub fn messages_of<'a>(events: &'a [StatusEvent], service: &str) -> Vec<&'a str> {
    events
        .iter()
        .filter(|e| e.service_name == service)
        .map(|e| e.message.as_str())
        .collect()
}

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! End-to-end tests of the provisioning pipeline.
//!
//! The real adapters run against in-memory backends; only the remote
//! systems are faked. Waits use paused virtual time.

mod common;

use common::{messages_of, pipeline, standard_dns, vm, FakeDns, FakeHypervisor};
use provisionize::context::RequestContext;
use provisionize::orchestrator::Outcome;
use provisionize::types::StatusEvent;
use std::time::Duration;
use tokio::sync::mpsc;

const INTERVAL: Duration = Duration::from_secs(10);

fn collect(mut rx: mpsc::UnboundedReceiver<StatusEvent>) -> Vec<StatusEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test(start_paused = true)]
async fn test_provision_runs_every_backend() {
    let p = pipeline(FakeHypervisor::default(), standard_dns(), INTERVAL);
    let ctx = RequestContext::new("it-provision");
    let (tx, rx) = mpsc::unbounded_channel();

    let outcome = p.orchestrator.provisionize(&ctx, &vm(), tx).await;
    assert_eq!(outcome, Outcome::Completed);

    let events = collect(rx);
    assert!(events.iter().all(|e| !e.failed));

    // Services report in pipeline order
    let order: Vec<&str> = events.iter().map(|e| e.service_name.as_str()).collect();
    let first_dns = order.iter().position(|s| *s == "Google Cloud DNS").unwrap();
    let first_tower = order.iter().position(|s| *s == "Ansible Tower").unwrap();
    assert!(order[..first_dns].iter().all(|s| *s == "oVirt"));
    assert!(order[first_dns..first_tower].iter().all(|s| *s == "Google Cloud DNS"));

    assert_eq!(
        messages_of(&events, "oVirt"),
        vec![
            "Start creating VM",
            "VM created successfully",
            "Waiting for VM initialization to complete",
            "New status: image_locked",
            "New status: down",
            "Check if boot disk is attached to VM",
            "VM started",
            "New status: powering_up",
            "New status: up",
        ]
    );

    // VM built from the template mapping
    let created = p.hypervisor.created();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].template.name, "debian-12");
    assert_eq!(created[0].memory, 2048 * 1024 * 1024);
    assert_eq!(p.hypervisor.vm_named("web-01").unwrap().status, "up");

    // Forward and reverse records
    assert_eq!(
        p.dns.records("example-com"),
        vec![
            "web-01.example.com. A 192.0.2.10",
            "web-01.example.com. AAAA 2001:db8::10",
        ]
    );
    assert_eq!(
        p.dns.records("rev-192-0-2"),
        vec!["10.2.0.192.in-addr.arpa. PTR web-01.example.com."]
    );
    assert_eq!(
        p.dns.records("rev-2001-db8"),
        vec![
            "0.1.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.8.b.d.0.1.0.0.2.ip6.arpa. PTR web-01.example.com."
        ]
    );

    // Both job templates launched against the FQDN
    assert_eq!(
        p.tower.launches(),
        vec![
            (10, "web-01.example.com".to_string()),
            (11, "web-01.example.com".to_string()),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_dns_records_are_idempotent() {
    let dns = standard_dns();
    let first = pipeline(FakeHypervisor::default(), dns.clone(), INTERVAL);
    let (tx, _rx) = mpsc::unbounded_channel();
    assert!(first
        .orchestrator
        .provisionize(&RequestContext::new("first"), &vm(), tx)
        .await
        .is_success());
    assert_eq!(dns.creates(), 4);

    let second = pipeline(FakeHypervisor::default(), dns.clone(), INTERVAL);
    let (tx, rx) = mpsc::unbounded_channel();
    assert!(second
        .orchestrator
        .provisionize(&RequestContext::new("second"), &vm(), tx)
        .await
        .is_success());

    assert_eq!(dns.creates(), 4);
    let events = collect(rx);
    let dns_messages = messages_of(&events, "Google Cloud DNS");
    assert_eq!(dns_messages.len(), 4);
    assert!(dns_messages.iter().all(|m| m.ends_with("already exists: skipping")));
}

#[tokio::test(start_paused = true)]
async fn test_missing_zone_stops_pipeline() {
    let dns = FakeDns::default().with_zone("other", "example.org.");
    let p = pipeline(FakeHypervisor::default(), dns, INTERVAL);
    let (tx, rx) = mpsc::unbounded_channel();

    let outcome = p
        .orchestrator
        .provisionize(&RequestContext::new("it-no-zone"), &vm(), tx)
        .await;

    assert_eq!(
        outcome,
        Outcome::Failed {
            service: "Google Cloud DNS"
        }
    );
    assert_eq!(p.dns.creates(), 0);
    assert!(p.tower.launches().is_empty());

    let events = collect(rx);
    let last = events.last().unwrap();
    assert!(last.failed);
    assert_eq!(last.service_name, "Google Cloud DNS");
    assert!(messages_of(&events, "Ansible Tower").is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_deprovision_removes_vm_and_records() {
    let dns = standard_dns();
    let hypervisor = FakeHypervisor::default();
    let p = pipeline(hypervisor.clone(), dns.clone(), INTERVAL);
    let (tx, _rx) = mpsc::unbounded_channel();
    assert!(p
        .orchestrator
        .provisionize(&RequestContext::new("setup"), &vm(), tx)
        .await
        .is_success());

    // oVirt only deletes VMs that are down
    let hypervisor = FakeHypervisor::default().with_vm("web-01", "down");
    let p = pipeline(hypervisor.clone(), dns.clone(), INTERVAL);
    let (tx, rx) = mpsc::unbounded_channel();

    let outcome = p
        .orchestrator
        .deprovisionize(&RequestContext::new("it-deprovision"), &vm(), tx)
        .await;
    assert_eq!(outcome, Outcome::Completed);

    assert_eq!(hypervisor.deleted().len(), 1);
    assert!(hypervisor.vm_named("web-01").is_none());
    assert!(dns.records("example-com").is_empty());
    assert!(dns.records("rev-192-0-2").is_empty());
    assert!(dns.records("rev-2001-db8").is_empty());
    assert_eq!(dns.deletes(), 4);
    assert!(p.tower.launches().is_empty());

    let events = collect(rx);
    assert_eq!(
        messages_of(&events, "oVirt"),
        vec!["VM deletion initiated", "VM deleted"]
    );
    assert!(messages_of(&events, "Ansible Tower").is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_deprovision_twice_skips_everything() {
    let p = pipeline(FakeHypervisor::default(), standard_dns(), INTERVAL);
    let (tx, rx) = mpsc::unbounded_channel();

    let outcome = p
        .orchestrator
        .deprovisionize(&RequestContext::new("it-absent"), &vm(), tx)
        .await;

    assert_eq!(outcome, Outcome::Completed);
    assert_eq!(p.dns.deletes(), 0);

    let events = collect(rx);
    assert_eq!(
        messages_of(&events, "oVirt"),
        vec!["VM web-01 does not exist: skipping"]
    );
    assert!(messages_of(&events, "Google Cloud DNS")
        .iter()
        .all(|m| m.ends_with("already removed: skipping")));
}

#[tokio::test(start_paused = true)]
async fn test_running_vm_blocks_deprovision() {
    let hypervisor = FakeHypervisor::default().with_vm("web-01", "up");
    let p = pipeline(hypervisor.clone(), standard_dns(), INTERVAL);
    let (tx, rx) = mpsc::unbounded_channel();

    let outcome = p
        .orchestrator
        .deprovisionize(&RequestContext::new("it-running"), &vm(), tx)
        .await;

    assert_eq!(outcome, Outcome::Failed { service: "oVirt" });
    assert!(hypervisor.deleted().is_empty());

    let events = collect(rx);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].message, "VM is not down. Current status: up");
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_request_stops_during_wait() {
    let p = pipeline(FakeHypervisor::default(), standard_dns(), INTERVAL);
    let ctx = RequestContext::new("it-cancel");
    let (tx, rx) = mpsc::unbounded_channel();

    let canceller = ctx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(15)).await;
        canceller.cancel();
    });

    let outcome = p.orchestrator.provisionize(&ctx, &vm(), tx).await;

    assert_eq!(outcome, Outcome::Failed { service: "oVirt" });
    assert_eq!(p.dns.creates(), 0);

    let events = collect(rx);
    assert!(events.iter().all(|e| e.service_name == "oVirt"));
    let last = events.last().unwrap();
    assert!(last.failed);
    assert!(last.message.ends_with("cancelled"), "{}", last.message);
}

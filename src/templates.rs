// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Mapping of provisioning template names to backend templates.
//!
//! A VM request names one provisioning template (e.g. `debian-web`). The
//! configuration maps that name to the oVirt template the VM is cloned from,
//! the disk it boots from and the Ansible Tower job templates run against it
//! afterwards.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One provisioning template from the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionTemplate {
    /// Name referenced by `VirtualMachineSpec::template`
    pub name: String,
    /// oVirt template to clone the VM from
    #[serde(default)]
    pub ovirt_template: Option<String>,
    /// Disk to attach as boot disk if the cloned VM comes up without one
    #[serde(default)]
    pub boot_disk: Option<String>,
    /// Tower job template IDs, launched in this order
    #[serde(default)]
    pub tower_templates: Vec<u64>,
}

/// Lookup of provisioning templates by name.
#[derive(Debug, Clone, Default)]
pub struct TemplateManager {
    templates: HashMap<String, ProvisionTemplate>,
}

impl TemplateManager {
    /// Index `templates` by name. A later duplicate replaces an earlier one.
    pub fn new(templates: impl IntoIterator<Item = ProvisionTemplate>) -> Self {
        Self {
            templates: templates
                .into_iter()
                .map(|t| (t.name.clone(), t))
                .collect(),
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ProvisionTemplate> {
        self.templates.get(name)
    }

    /// oVirt template for the provisioning template `name`.
    #[must_use]
    pub fn ovirt_template(&self, name: &str) -> Option<&str> {
        self.get(name)
            .and_then(|t| t.ovirt_template.as_deref())
            .filter(|t| !t.is_empty())
    }

    #[must_use]
    pub fn boot_disk(&self, name: &str) -> Option<&str> {
        self.get(name)
            .and_then(|t| t.boot_disk.as_deref())
            .filter(|d| !d.is_empty())
    }

    /// Tower job template IDs for `name`; empty if unknown.
    #[must_use]
    pub fn tower_templates(&self, name: &str) -> &[u64] {
        self.get(name)
            .map(|t| t.tower_templates.as_slice())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[cfg(test)]
#[path = "templates_tests.rs"]
mod templates_tests;

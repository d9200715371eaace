// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! YAML configuration file.
//!
//! The configuration is loaded once at startup and used to construct the
//! backend adapters in pipeline order:
//!
//! ```yaml
//! listen_address: "[::]:1337"
//! pipeline: [ovirt, dns, tower]
//! polling:
//!   interval_secs: 10
//!   timeout_secs: 120
//! ovirt:
//!   url: https://engine.example.com/ovirt-engine/api
//!   username: admin@internal
//!   password: secret
//! google_cloud_dns:
//!   project_id: my-project
//!   access_token_file: /run/secrets/gcloud-token
//! tower:
//!   url: https://tower.example.com
//!   username: admin
//!   password: secret
//! templates:
//!   - name: debian-web
//!     ovirt_template: debian-12
//!     boot_disk: debian-12-boot
//!     tower_templates: [10, 11]
//! ```
//!
//! Sections for backends that are not part of the pipeline may be omitted.

use crate::configuration::tower::TowerClient;
use crate::configuration::TowerService;
use crate::constants::{
    DEFAULT_DNS_RECORD_TTL_SECS, DEFAULT_LISTEN_ADDRESS, DEFAULT_POLLING_INTERVAL_SECS,
    DEFAULT_WAIT_TIMEOUT_SECS,
};
use crate::dns::gcloud::GoogleCloudDnsClient;
use crate::dns::DnsService;
use crate::service::ProvisionService;
use crate::templates::{ProvisionTemplate, TemplateManager};
use crate::vm::ovirt::OvirtClient;
use crate::vm::OvirtService;
use crate::waiter::Waiter;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Backend adapter selectable in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Ovirt,
    Dns,
    Tower,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ovirt => "ovirt",
            Self::Dns => "dns",
            Self::Tower => "tower",
        })
    }
}

fn default_listen_address() -> String {
    DEFAULT_LISTEN_ADDRESS.to_string()
}

fn default_pipeline() -> Vec<Backend> {
    vec![Backend::Ovirt, Backend::Dns, Backend::Tower]
}

fn default_interval_secs() -> u64 {
    DEFAULT_POLLING_INTERVAL_SECS
}

fn default_timeout_secs() -> u64 {
    DEFAULT_WAIT_TIMEOUT_SECS
}

fn default_true() -> bool {
    true
}

fn default_ttl() -> u32 {
    DEFAULT_DNS_RECORD_TTL_SECS
}

/// Poll interval and deadline used by every completion wait.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_POLLING_INTERVAL_SECS,
            timeout_secs: DEFAULT_WAIT_TIMEOUT_SECS,
        }
    }
}

impl PollingConfig {
    #[must_use]
    pub fn waiter(&self) -> Waiter {
        Waiter::new(
            Duration::from_secs(self.interval_secs),
            Duration::from_secs(self.timeout_secs),
        )
    }
}

/// oVirt engine connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OvirtConfig {
    /// Engine API URL, e.g. `https://engine/ovirt-engine/api`
    pub url: String,
    pub username: String,
    pub password: String,
    /// Accept invalid TLS certificates
    #[serde(default)]
    pub insecure: bool,
}

/// Google Cloud DNS project and credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoogleCloudDnsConfig {
    pub project_id: String,
    /// OAuth2 access token, used as given
    #[serde(default)]
    pub access_token: Option<String>,
    /// File holding the access token; read at startup
    #[serde(default)]
    pub access_token_file: Option<PathBuf>,
    /// Also manage PTR records in reverse zones
    #[serde(default = "default_true")]
    pub manage_ptr: bool,
    #[serde(default = "default_ttl")]
    pub ttl: u32,
    /// Override of the Cloud DNS API endpoint
    #[serde(default)]
    pub api_url: Option<String>,
}

impl GoogleCloudDnsConfig {
    /// The configured access token, read from `access_token_file` if no
    /// inline token is set.
    ///
    /// # Errors
    ///
    /// Returns an error if neither source is configured or the file cannot
    /// be read.
    pub fn access_token(&self) -> Result<String> {
        if let Some(token) = self.access_token.as_deref().filter(|t| !t.is_empty()) {
            return Ok(token.to_string());
        }
        let Some(path) = &self.access_token_file else {
            bail!("google_cloud_dns: one of access_token or access_token_file is required");
        };
        let token = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read access token from {}", path.display()))?;
        let token = token.trim();
        if token.is_empty() {
            bail!("Access token file {} is empty", path.display());
        }
        Ok(token.to_string())
    }
}

/// Ansible Tower connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TowerConfig {
    /// Tower base URL without the API path
    pub url: String,
    pub username: String,
    pub password: String,
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_listen_address")]
    pub listen_address: String,
    /// Adapter order for every request
    #[serde(default = "default_pipeline")]
    pub pipeline: Vec<Backend>,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub ovirt: Option<OvirtConfig>,
    #[serde(default)]
    pub google_cloud_dns: Option<GoogleCloudDnsConfig>,
    #[serde(default)]
    pub tower: Option<TowerConfig>,
    #[serde(default)]
    pub templates: Vec<ProvisionTemplate>,
}

impl Config {
    /// Read and validate the configuration file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid YAML, or
    /// fails validation.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {}", path.display()))?;
        let config = Self::from_yaml(&contents)
            .with_context(|| format!("Invalid configuration file {}", path.display()))?;
        info!(
            path = %path.display(),
            pipeline = ?config.pipeline,
            templates = config.templates.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Parse and validate a configuration document.
    ///
    /// # Errors
    ///
    /// Returns an error on invalid YAML or failed validation.
    pub fn from_yaml(contents: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(contents).context("Failed to parse YAML")?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first violated constraint.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for backend in &self.pipeline {
            if !seen.insert(backend) {
                bail!("Backend '{backend}' appears more than once in the pipeline");
            }
            let configured = match backend {
                Backend::Ovirt => self.ovirt.is_some(),
                Backend::Dns => self.google_cloud_dns.is_some(),
                Backend::Tower => self.tower.is_some(),
            };
            if !configured {
                bail!("Backend '{backend}' is in the pipeline but has no configuration section");
            }
        }

        if self.polling.interval_secs == 0 {
            bail!("polling.interval_secs must be greater than zero");
        }
        if self.polling.timeout_secs == 0 {
            bail!("polling.timeout_secs must be greater than zero");
        }

        Ok(())
    }

    /// Build the adapters named in `pipeline`, in pipeline order.
    ///
    /// # Errors
    ///
    /// Returns an error if a backend client cannot be constructed or its
    /// credentials cannot be read.
    pub fn build_services(&self) -> Result<Vec<Arc<dyn ProvisionService>>> {
        let templates = Arc::new(TemplateManager::new(self.templates.iter().cloned()));
        let waiter = self.polling.waiter();
        let mut services: Vec<Arc<dyn ProvisionService>> = Vec::with_capacity(self.pipeline.len());

        for backend in &self.pipeline {
            let service: Arc<dyn ProvisionService> = match backend {
                Backend::Ovirt => {
                    let cfg = self
                        .ovirt
                        .as_ref()
                        .context("ovirt section is missing")?;
                    let client =
                        OvirtClient::new(&cfg.url, &cfg.username, &cfg.password, cfg.insecure)
                            .context("Failed to create oVirt client")?;
                    Arc::new(OvirtService::new(client, templates.clone(), waiter))
                }
                Backend::Dns => {
                    let cfg = self
                        .google_cloud_dns
                        .as_ref()
                        .context("google_cloud_dns section is missing")?;
                    let token = cfg.access_token()?;
                    let client = match &cfg.api_url {
                        Some(url) => GoogleCloudDnsClient::with_base_url(url, &cfg.project_id, token),
                        None => GoogleCloudDnsClient::new(&cfg.project_id, token),
                    };
                    Arc::new(
                        DnsService::new(client)
                            .with_ttl(cfg.ttl)
                            .with_ptr_records(cfg.manage_ptr),
                    )
                }
                Backend::Tower => {
                    let cfg = self.tower.as_ref().context("tower section is missing")?;
                    let client = TowerClient::new(&cfg.url, &cfg.username, &cfg.password);
                    Arc::new(TowerService::new(client, templates.clone(), waiter))
                }
            };
            debug!(service = service.name(), "Configured service");
            services.push(service);
        }

        Ok(services)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;

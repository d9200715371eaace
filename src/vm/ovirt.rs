// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! oVirt REST client.
//!
//! Talks to the oVirt engine API (`.../ovirt-engine/api`) with basic
//! authentication and JSON payloads.

use super::types::{
    Disk, DiskAttachment, DiskAttachmentList, DiskList, NewDiskAttachment, Vm, VmCreateRequest,
    VmList,
};
use super::VmBackend;
use crate::constants::OVIRT_UNATTACHED_DISK_SEARCH;
use crate::errors::BackendError;
use crate::http::{build_api_url, decode, execute};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client as HttpClient, RequestBuilder, StatusCode};
use std::sync::Arc;
use url::Url;

/// Connection settings of an oVirt engine.
#[derive(Debug, Clone)]
pub struct OvirtClient {
    client: Arc<HttpClient>,
    base_url: String,
    username: String,
    password: Arc<String>,
}

impl OvirtClient {
    /// Create a client for the engine API at `url`.
    ///
    /// With `insecure` set, invalid TLS certificates are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Transport`] if the HTTP client cannot be built.
    pub fn new(
        url: &str,
        username: impl Into<String>,
        password: impl Into<String>,
        insecure: bool,
    ) -> Result<Self, BackendError> {
        let base_url = build_api_url(url);
        let client = HttpClient::builder()
            .danger_accept_invalid_certs(insecure)
            .build()
            .map_err(|e| BackendError::Transport {
                url: base_url.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            client: Arc::new(client),
            base_url,
            username: username.into(),
            password: Arc::new(password.into()),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    fn search_url(&self, path: &str, search: &str) -> Result<Url, BackendError> {
        let url = self.url(path);
        let mut search_url = Url::parse(&url).map_err(|e| BackendError::Transport {
            url: url.clone(),
            reason: e.to_string(),
        })?;
        search_url.query_pairs_mut().append_pair("search", search);
        Ok(search_url)
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .basic_auth(&self.username, Some(self.password.as_str()))
            .header(ACCEPT, "application/json")
    }
}

#[async_trait]
impl VmBackend for OvirtClient {
    async fn create_vm(&self, request: &VmCreateRequest) -> Result<(Vm, String), BackendError> {
        let url = self.url("vms?clone=true");
        let builder = self.request(self.client.post(&url)).json(request);
        let body = execute(
            builder,
            "POST",
            &url,
            &[StatusCode::OK, StatusCode::CREATED, StatusCode::ACCEPTED],
        )
        .await?;
        let vm = decode(&url, &body)?;
        Ok((vm, body))
    }

    async fn get_vm(&self, id: &str) -> Result<Vm, BackendError> {
        let url = self.url(&format!("vms/{id}"));
        let body = execute(self.request(self.client.get(&url)), "GET", &url, &[StatusCode::OK]).await?;
        decode(&url, &body)
    }

    async fn find_vm_by_name(&self, name: &str) -> Result<Option<Vm>, BackendError> {
        let url = self.url("vms");
        let search_url = self.search_url("vms", &format!("name={name}"))?;

        let body = execute(
            self.request(self.client.get(search_url.as_str())),
            "GET",
            &url,
            &[StatusCode::OK],
        )
        .await?;
        let list: VmList = decode(&url, &body)?;

        // The search is a pattern match; only an exact name counts
        Ok(list.vm.into_iter().find(|vm| vm.name == name))
    }

    async fn list_disk_attachments(&self, id: &str) -> Result<Vec<DiskAttachment>, BackendError> {
        let url = self.url(&format!("vms/{id}/diskattachments"));
        let body = execute(self.request(self.client.get(&url)), "GET", &url, &[StatusCode::OK]).await?;
        let list: DiskAttachmentList = decode(&url, &body)?;
        Ok(list.disk_attachment)
    }

    async fn find_unattached_disk(&self, name: &str) -> Result<Option<Disk>, BackendError> {
        let url = self.url("disks");
        let search_url = self.search_url("disks", OVIRT_UNATTACHED_DISK_SEARCH)?;
        let body = execute(
            self.request(self.client.get(search_url.as_str())),
            "GET",
            &url,
            &[StatusCode::OK],
        )
        .await?;
        let list: DiskList = decode(&url, &body)?;

        // Only the newest unattached disk can belong to the VM just cloned
        Ok(list.disk.into_iter().next().filter(|disk| disk.name == name))
    }

    async fn attach_disk(
        &self,
        id: &str,
        attachment: &NewDiskAttachment,
    ) -> Result<String, BackendError> {
        let url = self.url(&format!("vms/{id}/diskattachments"));
        let builder = self.request(self.client.post(&url)).json(attachment);
        execute(
            builder,
            "POST",
            &url,
            &[StatusCode::OK, StatusCode::CREATED],
        )
        .await
    }

    async fn start_vm(&self, id: &str) -> Result<String, BackendError> {
        let url = self.url(&format!("vms/{id}/start"));
        let builder = self
            .request(self.client.post(&url))
            .json(&serde_json::json!({}));
        execute(builder, "POST", &url, &[StatusCode::OK]).await
    }

    async fn delete_vm(&self, id: &str) -> Result<String, BackendError> {
        let url = self.url(&format!("vms/{id}"));
        execute(
            self.request(self.client.delete(&url)),
            "DELETE",
            &url,
            &[StatusCode::OK],
        )
        .await
    }
}

#[cfg(test)]
#[path = "ovirt_tests.rs"]
mod ovirt_tests;

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Google Cloud DNS REST client.
//!
//! Uses the Cloud DNS v1 JSON API:
//!
//! - `GET  projects/{project}/managedZones`
//! - `GET  projects/{project}/managedZones/{zone}/rrsets`
//! - `POST projects/{project}/managedZones/{zone}/changes`
//!
//! List calls follow `nextPageToken` until the last page. Requests carry the
//! configured OAuth access token as bearer token.

use super::records::ResourceRecord;
use super::zone::ManagedZone;
use super::DnsBackend;
use crate::constants::GOOGLE_CLOUD_DNS_API_URL;
use crate::errors::BackendError;
use crate::http::{build_api_url, decode, execute};
use async_trait::async_trait;
use reqwest::{Client as HttpClient, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// One page of a list response.
trait Page: DeserializeOwned {
    type Item;

    fn into_parts(self) -> (Vec<Self::Item>, Option<String>);
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ZonePage {
    #[serde(default)]
    managed_zones: Vec<ManagedZone>,
    next_page_token: Option<String>,
}

impl Page for ZonePage {
    type Item = ManagedZone;

    fn into_parts(self) -> (Vec<ManagedZone>, Option<String>) {
        (self.managed_zones, self.next_page_token)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordPage {
    #[serde(default)]
    rrsets: Vec<ResourceRecord>,
    next_page_token: Option<String>,
}

impl Page for RecordPage {
    type Item = ResourceRecord;

    fn into_parts(self) -> (Vec<ResourceRecord>, Option<String>) {
        (self.rrsets, self.next_page_token)
    }
}

/// Body of a `changes` request.
#[derive(Debug, Serialize)]
struct Change<'a> {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    additions: Vec<&'a ResourceRecord>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    deletions: Vec<&'a ResourceRecord>,
}

/// Client for one Google Cloud project.
///
/// # Examples
///
/// ```rust,no_run
/// use provisionize::dns::gcloud::GoogleCloudDnsClient;
///
/// let client = GoogleCloudDnsClient::new("my-project", "ya29.token");
/// ```
#[derive(Debug, Clone)]
pub struct GoogleCloudDnsClient {
    client: Arc<HttpClient>,
    base_url: String,
    project_id: String,
    token: Arc<String>,
}

impl GoogleCloudDnsClient {
    /// Client for the public Cloud DNS endpoint.
    pub fn new(project_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self::with_base_url(GOOGLE_CLOUD_DNS_API_URL, project_id, access_token)
    }

    /// Client for a custom API endpoint.
    pub fn with_base_url(
        base_url: &str,
        project_id: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            client: Arc::new(HttpClient::new()),
            base_url: build_api_url(base_url),
            project_id: project_id.into(),
            token: Arc::new(access_token.into()),
        }
    }

    fn zones_url(&self) -> String {
        format!("{}/projects/{}/managedZones", self.base_url, self.project_id)
    }

    fn zone_url(&self, zone: &ManagedZone) -> String {
        format!("{}/{}", self.zones_url(), zone.name)
    }

    async fn get_page<P: Page>(&self, url: &str, page_token: Option<&str>) -> Result<P, BackendError> {
        let mut page_url = Url::parse(url).map_err(|e| BackendError::Transport {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        if let Some(token) = page_token {
            page_url.query_pairs_mut().append_pair("pageToken", token);
        }

        let request = self.client.get(page_url.as_str()).bearer_auth(self.token.as_str());
        let body = execute(request, "GET", url, &[StatusCode::OK]).await?;
        decode(url, &body)
    }

    async fn list_all<P: Page>(&self, url: &str) -> Result<Vec<P::Item>, BackendError> {
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page: P = self.get_page(url, page_token.as_deref()).await?;
            let (mut page_items, next) = page.into_parts();
            items.append(&mut page_items);

            match next.filter(|t| !t.is_empty()) {
                Some(token) => {
                    debug!(url = %url, "Fetching next page");
                    page_token = Some(token);
                }
                None => return Ok(items),
            }
        }
    }

    async fn submit_change(&self, zone: &ManagedZone, change: &Change<'_>) -> Result<String, BackendError> {
        let url = format!("{}/changes", self.zone_url(zone));
        let request = self
            .client
            .post(&url)
            .bearer_auth(self.token.as_str())
            .json(change);
        execute(request, "POST", &url, &[StatusCode::OK]).await
    }
}

#[async_trait]
impl DnsBackend for GoogleCloudDnsClient {
    async fn list_zones(&self) -> Result<Vec<ManagedZone>, BackendError> {
        self.list_all::<ZonePage>(&self.zones_url()).await
    }

    async fn list_records(&self, zone: &ManagedZone) -> Result<Vec<ResourceRecord>, BackendError> {
        let url = format!("{}/rrsets", self.zone_url(zone));
        self.list_all::<RecordPage>(&url).await
    }

    async fn create_record(
        &self,
        zone: &ManagedZone,
        record: &ResourceRecord,
    ) -> Result<String, BackendError> {
        let change = Change {
            additions: vec![record],
            deletions: Vec::new(),
        };
        self.submit_change(zone, &change).await
    }

    async fn delete_record(
        &self,
        zone: &ManagedZone,
        record: &ResourceRecord,
    ) -> Result<String, BackendError> {
        let change = Change {
            additions: Vec::new(),
            deletions: vec![record],
        };
        self.submit_change(zone, &change).await
    }
}

#[cfg(test)]
#[path = "gcloud_tests.rs"]
mod gcloud_tests;

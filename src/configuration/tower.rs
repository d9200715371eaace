// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Ansible Tower (AWX) REST client.

use super::{Job, JobBackend, LaunchRequest};
use crate::constants::TOWER_API_PATH;
use crate::errors::BackendError;
use crate::http::{build_api_url, decode, execute};
use async_trait::async_trait;
use reqwest::{Client as HttpClient, StatusCode};
use std::sync::Arc;

/// Client for the Tower v2 API using basic authentication.
#[derive(Debug, Clone)]
pub struct TowerClient {
    client: Arc<HttpClient>,
    base_url: String,
    username: String,
    password: Arc<String>,
}

impl TowerClient {
    /// Client for the Tower instance at `url` (without the API path).
    pub fn new(url: &str, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            client: Arc::new(HttpClient::new()),
            base_url: format!("{}{TOWER_API_PATH}", build_api_url(url)),
            username: username.into(),
            password: Arc::new(password.into()),
        }
    }
}

#[async_trait]
impl JobBackend for TowerClient {
    fn launch_url(&self, template_id: u64) -> String {
        format!("{}/job_templates/{template_id}/launch/", self.base_url)
    }

    async fn launch_job(
        &self,
        template_id: u64,
        request: &LaunchRequest<'_>,
    ) -> Result<(Job, String), BackendError> {
        let url = self.launch_url(template_id);
        let builder = self
            .client
            .post(&url)
            .basic_auth(&self.username, Some(self.password.as_str()))
            .json(request);

        let body = execute(builder, "POST", &url, &[StatusCode::CREATED]).await?;
        let job = decode(&url, &body)?;
        Ok((job, body))
    }

    async fn get_job(&self, id: u64) -> Result<(Job, String), BackendError> {
        let url = format!("{}/jobs/{id}/", self.base_url);
        let builder = self
            .client
            .get(&url)
            .basic_auth(&self.username, Some(self.password.as_str()));

        let body = execute(builder, "GET", &url, &[StatusCode::OK]).await?;
        let job = decode(&url, &body)?;
        Ok((job, body))
    }
}

#[cfg(test)]
#[path = "tower_tests.rs"]
mod tower_tests;

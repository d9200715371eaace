// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared plumbing for the backend REST clients.
//!
//! All backend clients send their requests through [`execute`], which logs
//! the exchange, reads the body and maps transport failures and unexpected
//! status codes to [`BackendError`]. Retrying is not done here: submissions
//! use [`crate::retry`] and polling uses [`crate::waiter`].

use crate::errors::BackendError;
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, error};

/// Build the API base URL from a configured endpoint.
///
/// Adds `https://` if no scheme is given and strips trailing slashes.
pub(crate) fn build_api_url(server: &str) -> String {
    if server.starts_with("http://") || server.starts_with("https://") {
        server.trim_end_matches('/').to_string()
    } else {
        format!("https://{}", server.trim_end_matches('/'))
    }
}

/// Send `request` and return the response body.
///
/// # Arguments
/// * `request` - Fully prepared request (auth, headers, body)
/// * `method` - HTTP method, for logging
/// * `url` - Request URL, for logging and error messages
/// * `expected` - Status codes counted as success
///
/// # Errors
///
/// Returns [`BackendError::Transport`] if no response arrives and
/// [`BackendError::UnexpectedStatus`] if the status is not in `expected`.
pub(crate) async fn execute(
    request: RequestBuilder,
    method: &str,
    url: &str,
    expected: &[StatusCode],
) -> Result<String, BackendError> {
    debug!(method = %method, url = %url, "HTTP API request");

    let response = request.send().await.map_err(|e| BackendError::Transport {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    let status = response.status();
    let body = response.text().await.map_err(|e| BackendError::Transport {
        url: url.to_string(),
        reason: format!("failed to read response body: {e}"),
    })?;

    if !expected.contains(&status) {
        error!(
            method = %method,
            url = %url,
            status = %status,
            "HTTP API request failed"
        );
        return Err(BackendError::UnexpectedStatus {
            url: url.to_string(),
            status: status.as_u16(),
            body,
        });
    }

    debug!(
        method = %method,
        url = %url,
        status = %status,
        response_len = body.len(),
        "HTTP API request successful"
    );

    Ok(body)
}

/// Decode a JSON response body.
///
/// # Errors
///
/// Returns [`BackendError::InvalidResponse`] if `body` does not match `T`.
pub(crate) fn decode<T: DeserializeOwned>(url: &str, body: &str) -> Result<T, BackendError> {
    serde_json::from_str(body).map_err(|e| BackendError::InvalidResponse {
        url: url.to_string(),
        reason: e.to_string(),
        body: body.to_string(),
    })
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod http_tests;

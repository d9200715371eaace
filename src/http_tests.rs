// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `http.rs`

#[cfg(test)]
mod tests {
    use crate::errors::BackendError;
    use crate::http::{build_api_url, decode, execute};
    use reqwest::StatusCode;
    use serde::Deserialize;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_build_api_url_without_scheme() {
        assert_eq!(build_api_url("ovirt.example.com"), "https://ovirt.example.com");
    }

    #[test]
    fn test_build_api_url_keeps_scheme() {
        assert_eq!(build_api_url("http://localhost:8080"), "http://localhost:8080");
        assert_eq!(
            build_api_url("https://tower.example.com"),
            "https://tower.example.com"
        );
    }

    #[test]
    fn test_build_api_url_trailing_slashes() {
        assert_eq!(
            build_api_url("https://ovirt.example.com/ovirt-engine/api///"),
            "https://ovirt.example.com/ovirt-engine/api"
        );
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Job {
        id: u64,
    }

    #[test]
    fn test_decode_valid_body() {
        let job: Job = decode("http://x/jobs/1", r#"{"id": 1, "status": "new"}"#).unwrap();
        assert_eq!(job, Job { id: 1 });
    }

    #[test]
    fn test_decode_invalid_body_keeps_raw_body() {
        let err = decode::<Job>("http://x/jobs/1", "not json").unwrap_err();
        match err {
            BackendError::InvalidResponse { url, body, .. } => {
                assert_eq!(url, "http://x/jobs/1");
                assert_eq!(body, "not json");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_execute_returns_body_on_expected_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/vms/1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"status\":\"up\"}"))
            .mount(&server)
            .await;

        let url = format!("{}/vms/1", server.uri());
        let client = reqwest::Client::new();
        let body = execute(client.get(&url), "GET", &url, &[StatusCode::OK])
            .await
            .unwrap();

        assert_eq!(body, "{\"status\":\"up\"}");
    }

    #[tokio::test]
    async fn test_execute_maps_unexpected_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("gone"))
            .mount(&server)
            .await;

        let url = format!("{}/vms/1", server.uri());
        let client = reqwest::Client::new();
        let err = execute(client.get(&url), "GET", &url, &[StatusCode::OK])
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(err.body(), Some("gone"));
    }

    #[tokio::test]
    async fn test_execute_maps_transport_error() {
        // Port 9 (discard) on localhost is expected to refuse connections
        let url = "http://127.0.0.1:9/vms".to_string();
        let client = reqwest::Client::new();
        let err = execute(client.get(&url), "GET", &url, &[StatusCode::OK])
            .await
            .unwrap_err();

        assert!(matches!(err, BackendError::Transport { .. }));
    }
}

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `gcloud.rs`

#[cfg(test)]
mod tests {
    use crate::dns::gcloud::GoogleCloudDnsClient;
    use crate::dns::records::{RecordType, ResourceRecord};
    use crate::dns::zone::ManagedZone;
    use crate::dns::DnsBackend;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ZONES_PATH: &str = "/projects/my-project/managedZones";

    fn client(server: &MockServer) -> GoogleCloudDnsClient {
        GoogleCloudDnsClient::with_base_url(&server.uri(), "my-project", "secret-token")
    }

    #[tokio::test]
    async fn test_list_zones_follows_pagination() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(ZONES_PATH))
            .and(query_param("pageToken", "page-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "managedZones": [{"name": "reverse", "dnsName": "2.0.192.in-addr.arpa."}]
            })))
            .with_priority(1)
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path(ZONES_PATH))
            .and(header("authorization", "Bearer secret-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "managedZones": [{"name": "example", "dnsName": "example.com."}],
                "nextPageToken": "page-2"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let zones = client(&server).list_zones().await.unwrap();

        assert_eq!(
            zones,
            vec![
                ManagedZone::new("example", "example.com."),
                ManagedZone::new("reverse", "2.0.192.in-addr.arpa."),
            ]
        );
    }

    #[tokio::test]
    async fn test_list_records() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{ZONES_PATH}/example/rrsets")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "kind": "dns#resourceRecordSetsListResponse",
                "rrsets": [
                    {"name": "example.com.", "type": "SOA", "ttl": 21600, "rrdatas": ["ns1. admin. 1 2 3 4 5"]},
                    {"name": "host.example.com.", "type": "A", "ttl": 300, "rrdatas": ["192.0.2.10"]}
                ]
            })))
            .mount(&server)
            .await;

        let records = client(&server)
            .list_records(&ManagedZone::new("example", "example.com."))
            .await
            .unwrap();

        assert_eq!(records.len(), 2);
        assert!(records[1].matches("host.example.com", RecordType::A));
    }

    #[tokio::test]
    async fn test_list_zones_empty_project() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(ZONES_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        assert!(client(&server).list_zones().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_record_posts_addition() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("{ZONES_PATH}/example/changes")))
            .and(header("authorization", "Bearer secret-token"))
            .and(body_json(json!({
                "additions": [{
                    "name": "host.example.com.",
                    "type": "A",
                    "ttl": 300,
                    "rrdatas": ["192.0.2.10"]
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"id\":\"7\",\"status\":\"pending\"}"))
            .expect(1)
            .mount(&server)
            .await;

        let record = ResourceRecord::new("host.example.com", RecordType::A, 300, "192.0.2.10");
        let response = client(&server)
            .create_record(&ManagedZone::new("example", "example.com."), &record)
            .await
            .unwrap();

        assert_eq!(response, "{\"id\":\"7\",\"status\":\"pending\"}");
    }

    #[tokio::test]
    async fn test_delete_record_posts_deletion() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("{ZONES_PATH}/example/changes")))
            .and(body_json(json!({
                "deletions": [{
                    "name": "host.example.com.",
                    "type": "AAAA",
                    "ttl": 300,
                    "rrdatas": ["2001:db8::10"]
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .expect(1)
            .mount(&server)
            .await;

        let record = ResourceRecord::new("host.example.com", RecordType::AAAA, 300, "2001:db8::10");
        client(&server)
            .delete_record(&ManagedZone::new("example", "example.com."), &record)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_api_error_keeps_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(409).set_body_string("{\"error\":{\"code\":409}}"))
            .mount(&server)
            .await;

        let record = ResourceRecord::new("host.example.com", RecordType::A, 300, "192.0.2.10");
        let err = client(&server)
            .create_record(&ManagedZone::new("example", "example.com."), &record)
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(409));
        assert_eq!(err.body(), Some("{\"error\":{\"code\":409}}"));
    }
}

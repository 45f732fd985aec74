//! Tests for Firestore client functionality.

use std::time::Duration;

use serde_json::json;
use serial_test::serial;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::client::{FirestoreClient, FirestoreConfig};
use crate::error::FirestoreError;
use crate::retry::RetryConfig;
use crate::store::{DocumentStore, FieldFilter};

// =============================================================================
// Test Helpers
// =============================================================================

const DOCS: &str = "/v1/projects/test-project/databases/test-db/documents";

fn emulator_config(server: &MockServer) -> FirestoreConfig {
    FirestoreConfig {
        project_id: "test-project".to_string(),
        database_id: "test-db".to_string(),
        emulator_host: Some(server.address().to_string()),
        timeout: Duration::from_secs(5),
        connect_timeout: Duration::from_secs(2),
        retry: RetryConfig {
            max_retries: 2,
            base_delay_ms: 1,
            max_delay_ms: 5,
        },
    }
}

fn emulator_client(server: &MockServer) -> FirestoreClient {
    FirestoreClient::new(emulator_config(server)).unwrap()
}

fn doc_name(collection: &str, id: &str) -> String {
    format!("projects/test-project/databases/test-db/documents/{}/{}", collection, id)
}

// =============================================================================
// Error Type Tests
// =============================================================================

#[test]
fn test_error_from_http_status() {
    assert!(matches!(
        FirestoreError::from_http_status(400, "bad request"),
        FirestoreError::RequestFailed(_)
    ));
    assert!(matches!(
        FirestoreError::from_http_status(401, "unauthenticated"),
        FirestoreError::AuthError(_)
    ));
    assert!(matches!(
        FirestoreError::from_http_status(403, "denied"),
        FirestoreError::PermissionDenied(_)
    ));
    assert!(FirestoreError::from_http_status(404, "missing").is_not_found());
    assert!(matches!(
        FirestoreError::from_http_status(409, "conflict"),
        FirestoreError::AlreadyExists(_)
    ));
    assert!(matches!(
        FirestoreError::from_http_status(412, "precondition"),
        FirestoreError::PreconditionFailed(_)
    ));
}

#[test]
fn test_retryable_errors() {
    assert!(FirestoreError::from_http_status(429, "slow down").is_retryable());
    assert!(FirestoreError::from_http_status(500, "internal").is_retryable());
    assert!(FirestoreError::from_http_status(503, "unavailable").is_retryable());
    assert!(!FirestoreError::from_http_status(400, "bad request").is_retryable());
    assert!(!FirestoreError::from_http_status(404, "missing").is_retryable());
}

#[test]
fn test_error_http_status_getter() {
    assert_eq!(FirestoreError::RateLimited(1000).http_status(), Some(429));
    assert_eq!(
        FirestoreError::ServerError(502, "bad gateway".into()).http_status(),
        Some(502)
    );
    assert_eq!(FirestoreError::not_found("doc").http_status(), Some(404));
    assert_eq!(FirestoreError::RateLimited(5000).retry_after_ms(), Some(5000));
}

// =============================================================================
// Config Tests
// =============================================================================

#[test]
#[serial]
fn test_config_validates_empty_project_id() {
    std::env::set_var("GCP_PROJECT_ID", "");
    std::env::remove_var("FIREBASE_PROJECT_ID");
    assert!(FirestoreConfig::from_env().is_err());
}

#[test]
#[serial]
fn test_config_requires_project_id() {
    std::env::remove_var("GCP_PROJECT_ID");
    std::env::remove_var("FIREBASE_PROJECT_ID");
    assert!(matches!(
        FirestoreConfig::from_env(),
        Err(FirestoreError::AuthError(_))
    ));
}

#[test]
#[serial]
fn test_config_prefers_gcp_project_id() {
    std::env::set_var("GCP_PROJECT_ID", "gcp-project");
    std::env::set_var("FIREBASE_PROJECT_ID", "firebase-project");
    let config = FirestoreConfig::from_env().unwrap();
    assert_eq!(config.project_id, "gcp-project");

    std::env::remove_var("GCP_PROJECT_ID");
    let config = FirestoreConfig::from_env().unwrap();
    assert_eq!(config.project_id, "firebase-project");
    std::env::remove_var("FIREBASE_PROJECT_ID");
}

#[test]
#[serial]
fn test_config_parses_env_vars() {
    std::env::set_var("GCP_PROJECT_ID", "test");
    std::env::set_var("FIRESTORE_CONNECT_TIMEOUT_SECS", "15");
    std::env::set_var("FIRESTORE_RETRY_BASE_MS", "50");
    std::env::set_var("FIRESTORE_RETRY_MAX_MS", "2000");
    std::env::set_var("FIRESTORE_EMULATOR_HOST", "localhost:8080");

    let config = FirestoreConfig::from_env().unwrap();
    assert_eq!(config.database_id, "(default)");
    assert_eq!(config.connect_timeout, Duration::from_secs(15));
    assert_eq!(config.retry.base_delay_ms, 50);
    assert_eq!(config.retry.max_delay_ms, 2000);
    assert_eq!(
        config.documents_url(),
        "http://localhost:8080/v1/projects/test/databases/(default)/documents"
    );

    for key in [
        "GCP_PROJECT_ID",
        "FIRESTORE_CONNECT_TIMEOUT_SECS",
        "FIRESTORE_RETRY_BASE_MS",
        "FIRESTORE_RETRY_MAX_MS",
        "FIRESTORE_EMULATOR_HOST",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
#[serial]
fn test_config_handles_invalid_env_values() {
    std::env::set_var("GCP_PROJECT_ID", "test");
    std::env::set_var("FIRESTORE_CONNECT_TIMEOUT_SECS", "not-a-number");
    let config = FirestoreConfig::from_env().unwrap();
    assert_eq!(config.connect_timeout, Duration::from_secs(5));
    assert!(config.emulator_host.is_none());
    assert!(config
        .documents_url()
        .starts_with("https://firestore.googleapis.com/v1/projects/test/"));

    std::env::remove_var("GCP_PROJECT_ID");
    std::env::remove_var("FIRESTORE_CONNECT_TIMEOUT_SECS");
}

// =============================================================================
// REST Tests (emulator mode against a mock server)
// =============================================================================

#[tokio::test]
async fn test_get_document() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/jobs/abc", DOCS)))
        .and(header("authorization", "Bearer owner"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": doc_name("jobs", "abc"),
            "fields": {
                "email": { "stringValue": "hr@x.com" },
                "salary": { "integerValue": "100" }
            }
        })))
        .mount(&server)
        .await;

    let client = emulator_client(&server);
    let doc = client.get("jobs", "abc").await.unwrap().unwrap();
    assert_eq!(doc.id, "abc");
    assert_eq!(doc.fields.get("email"), Some(&json!("hr@x.com")));
    assert_eq!(doc.fields.get("salary"), Some(&json!(100)));
}

#[tokio::test]
async fn test_get_missing_document_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/jobs/missing", DOCS)))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": { "code": 404, "status": "NOT_FOUND" }
        })))
        .mount(&server)
        .await;

    let client = emulator_client(&server);
    assert!(client.get("jobs", "missing").await.unwrap().is_none());
}

#[tokio::test]
async fn test_get_retries_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/jobs/flaky", DOCS)))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/jobs/flaky", DOCS)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": doc_name("jobs", "flaky"),
            "fields": {}
        })))
        .mount(&server)
        .await;

    let client = emulator_client(&server);
    let doc = client.get("jobs", "flaky").await.unwrap();
    assert!(doc.is_some());
}

#[tokio::test]
async fn test_find_runs_equality_query() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{}:runQuery", DOCS)))
        .and(body_partial_json(json!({
            "structuredQuery": {
                "from": [{ "collectionId": "applications" }],
                "where": {
                    "fieldFilter": {
                        "field": { "fieldPath": "applicant" },
                        "op": "EQUAL",
                        "value": { "stringValue": "a@x.com" }
                    }
                }
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "document": {
                    "name": doc_name("applications", "1"),
                    "fields": {
                        "applicant": { "stringValue": "a@x.com" },
                        "jobId": { "stringValue": "j" }
                    }
                },
                "readTime": "2024-01-01T00:00:00Z"
            },
            { "readTime": "2024-01-01T00:00:00Z" }
        ])))
        .mount(&server)
        .await;

    let client = emulator_client(&server);
    let filter = FieldFilter::eq("applicant", "a@x.com");
    let docs = client.find("applications", Some(&filter)).await.unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].id, "1");
    assert_eq!(docs[0].fields.get("jobId"), Some(&json!("j")));
}

#[tokio::test]
async fn test_count_reads_aggregation_result() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{}:runAggregationQuery", DOCS)))
        .and(body_partial_json(json!({
            "structuredAggregationQuery": {
                "aggregations": [{ "alias": "count", "count": {} }]
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "result": { "aggregateFields": { "count": { "integerValue": "2" } } },
                "readTime": "2024-01-01T00:00:00Z"
            }
        ])))
        .mount(&server)
        .await;

    let client = emulator_client(&server);
    let filter = FieldFilter::eq("jobId", "j");
    assert_eq!(client.count("applications", Some(&filter)).await.unwrap(), 2);
}

#[tokio::test]
async fn test_count_without_result_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{}:runAggregationQuery", DOCS)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let client = emulator_client(&server);
    let err = client.count("applications", None).await.unwrap_err();
    assert!(matches!(err, FirestoreError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_insert_uses_caller_document_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{}/jobs", DOCS)))
        .and(query_param("documentId", "new-id"))
        .and(body_partial_json(json!({
            "fields": { "title": { "stringValue": "Rust dev" } }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": doc_name("jobs", "new-id"),
            "fields": { "title": { "stringValue": "Rust dev" } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = emulator_client(&server);
    let fields = json!({ "title": "Rust dev" }).as_object().cloned().unwrap();
    client.insert("jobs", "new-id", fields).await.unwrap();
}

#[tokio::test]
async fn test_update_missing_document_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/applications/gone", DOCS)))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = emulator_client(&server);
    let fields = json!({ "status": "accepted" }).as_object().cloned().unwrap();
    let err = client
        .update_fields("applications", "gone", fields)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_update_patches_masked_fields() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/applications/a1", DOCS)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": doc_name("applications", "a1"),
            "fields": { "status": { "stringValue": "pending" } }
        })))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path(format!("{}/applications/a1", DOCS)))
        .and(query_param("updateMask.fieldPaths", "status"))
        .and(query_param("currentDocument.exists", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": doc_name("applications", "a1"),
            "fields": { "status": { "stringValue": "accepted" } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = emulator_client(&server);
    let fields = json!({ "status": "accepted" }).as_object().cloned().unwrap();
    let result = client
        .update_fields("applications", "a1", fields)
        .await
        .unwrap();
    assert!(result.is_modified());
}

#[tokio::test]
async fn test_update_with_same_value_skips_write() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/applications/a1", DOCS)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": doc_name("applications", "a1"),
            "fields": { "status": { "stringValue": "accepted" } }
        })))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = emulator_client(&server);
    let fields = json!({ "status": "accepted" }).as_object().cloned().unwrap();
    let result = client
        .update_fields("applications", "a1", fields)
        .await
        .unwrap();
    assert_eq!(result.matched_count, 1);
    assert!(!result.is_modified());
}

#[tokio::test]
async fn test_ping_accepts_missing_health_document() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/_health/_check", DOCS)))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = emulator_client(&server);
    client.ping().await.unwrap();
}

#[tokio::test]
async fn test_permission_denied_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let client = emulator_client(&server);
    let err = client.get("jobs", "x").await.unwrap_err();
    assert!(matches!(err, FirestoreError::PermissionDenied(_)));
}

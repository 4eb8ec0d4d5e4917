use std::time::Duration;

use agentdoc_backend_arweave::{ArweaveBackend, ArweaveConfig, ArweaveResolver};
use agentdoc_core::{
    Annotation, ChainContext, ContentResolver, MetadataRecord, StorageBackend, StorageError,
    format_document,
};
use base64::Engine;
use bytes::Bytes;
use serde_json::json;
use sha2::{Digest, Sha256};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

const HEX_KEY: &str = "4ccd089b28ff96da9db6c346ec114e0f5b8a319f35aba624da8cf6ed4fb8a6fb";

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn backend(server: &MockServer) -> ArweaveBackend {
    let mut config = ArweaveConfig::with_secret_key(HEX_KEY);
    config.upload_url = server.uri();
    ArweaveBackend::create(&config, None).unwrap()
}

/// Answers like a bundler: the id is derived from the posted signature.
fn accept_data_item(req: &Request) -> ResponseTemplate {
    let signature = &req.body[2..66];
    let id = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(Sha256::digest(signature));
    ResponseTemplate::new(200).set_body_json(json!({ "id": id, "owner": "test" }))
}

fn tag_count(raw: &[u8]) -> u64 {
    u64::from_le_bytes(raw[100..108].try_into().unwrap())
}

#[tokio::test]
async fn upload_posts_signed_data_item() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/tx"))
        .and(header("content-type", "application/octet-stream"))
        .respond_with(accept_data_item)
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend(&server);
    let tags = [Annotation::new("Content-Type", "application/json")];
    let id = backend
        .upload(Bytes::from_static(b"{\"a\":1}"), &tags)
        .await
        .unwrap();
    assert_eq!(id.as_str().len(), 43);
    assert!(backend.uri_for(id).to_string().starts_with("ar://"));

    let requests = server.received_requests().await.unwrap();
    let raw = &requests[0].body;
    assert_eq!(tag_count(raw), 1);
    assert!(raw.ends_with(b"{\"a\":1}"));
}

#[tokio::test]
async fn document_upload_carries_eleven_tags() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(accept_data_item)
        .mount(&server)
        .await;

    let mut record = MetadataRecord::new("X", "Y");
    record.active = true;
    backend(&server)
        .upload_document(&record, Some(&ChainContext::new(11155111)))
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(tag_count(&requests[0].body), 11);
}

#[tokio::test]
async fn mismatched_bundler_id_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "someone-else" })))
        .mount(&server)
        .await;

    let err = backend(&server)
        .upload(Bytes::from_static(b"{}"), &[])
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Upload { .. }));
    assert!(err.to_string().contains("someone-else"));
}

#[tokio::test]
async fn payment_required_is_quota_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(402).set_body_string("Payment Required"))
        .mount(&server)
        .await;

    let err = backend(&server)
        .upload(Bytes::from_static(b"{}"), &[])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StorageError::Quota { backend: "arweave", .. }
    ));
    assert!(err.to_string().contains("credit"));
}

#[tokio::test]
async fn insufficient_balance_body_is_quota_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_string("Insufficient balance"))
        .mount(&server)
        .await;

    let err = backend(&server)
        .upload(Bytes::from_static(b"{}"), &[])
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Quota { .. }));
}

#[tokio::test]
async fn slow_bundler_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let err = backend(&server)
        .with_timeout(Duration::from_millis(200))
        .upload(Bytes::from_static(b"{}"), &[])
        .await
        .unwrap_err();
    assert!(err.to_string().contains("timed out"));
    assert!(err.is_recoverable_write());
}

#[tokio::test]
async fn resolver_reads_back_through_gateways() {
    let record = MetadataRecord::new("X", "Y");
    let json = format_document(&record, None).to_json_bytes().unwrap();

    let slow = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&slow)
        .await;
    let good = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tx-abc"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(json.to_vec()))
        .mount(&good)
        .await;

    let resolver = ArweaveResolver::new(&[slow.uri(), good.uri()]);
    let bytes = resolver.resolve("ar://tx-abc").await.unwrap();
    assert_eq!(bytes, json);
}

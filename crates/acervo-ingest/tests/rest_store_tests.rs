//! REST store tests against a mock PostgREST endpoint

mod common;

use acervo_common::types::{CleanRecord, ReferenceKind, Region};
use acervo_ingest::store::{ReferenceStore, RestReferenceStore};
use acervo_ingest::StoreError;
use common::init_tracing;
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KEY: &str = "anon-test-key";
const TABLE_PATH: &str = "/rest/v1/cultural_references";

fn store(server: &MockServer) -> RestReferenceStore {
    RestReferenceStore::new(&server.uri(), KEY, "cultural_references").unwrap()
}

fn record(term: &str) -> CleanRecord {
    CleanRecord {
        term: term.to_string(),
        kind: ReferenceKind::Giria,
        meaning: "Legal, bacana, interessante".to_string(),
        usage_example: String::new(),
        region: Region::Nordeste,
        flirt_context: String::new(),
    }
}

#[tokio::test]
async fn test_table_exists_when_select_succeeds() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .and(query_param("select", "id"))
        .and(query_param("limit", "1"))
        .and(header("apikey", KEY))
        .and(header("Authorization", format!("Bearer {KEY}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    assert!(store(&server).table_exists().await.unwrap());
}

#[tokio::test]
async fn test_table_missing_on_404() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "code": "42P01",
            "message": "relation \"public.cultural_references\" does not exist"
        })))
        .mount(&server)
        .await;

    assert!(!store(&server).table_exists().await.unwrap());
}

#[tokio::test]
async fn test_bad_key_is_unauthorized() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_string("Invalid API key"))
        .mount(&server)
        .await;

    let result = store(&server).table_exists().await;
    assert!(matches!(result, Err(StoreError::Unauthorized(ref message)) if message.contains("Invalid")));
}

#[tokio::test]
async fn test_select_keys_follows_pages() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .and(query_param("select", "termo"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"termo": "Maneiro"},
            {"termo": "Cringe"}
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .and(query_param("select", "termo"))
        .and(query_param("offset", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"termo": "Massa"}])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .and(query_param("select", "termo"))
        .and(query_param("offset", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let keys = store(&server).with_page_size(2).select_keys().await.unwrap();

    assert_eq!(keys.len(), 3);
    assert!(keys.contains("Maneiro"));
    assert!(keys.contains("Massa"));
}

#[tokio::test]
async fn test_select_keys_survives_server_row_cap() {
    init_tracing();
    let server = MockServer::start().await;
    // server caps every response at 2 rows whatever `limit` asks for
    for (offset, rows) in [
        ("0", json!([{"termo": "a1"}, {"termo": "a2"}])),
        ("2", json!([{"termo": "a3"}, {"termo": "a4"}])),
        ("4", json!([])),
    ] {
        Mock::given(method("GET"))
            .and(path(TABLE_PATH))
            .and(query_param("select", "termo"))
            .and(query_param("order", "id"))
            .and(query_param("limit", "1000"))
            .and(query_param("offset", offset))
            .respond_with(ResponseTemplate::new(200).set_body_json(rows))
            .expect(1)
            .mount(&server)
            .await;
    }

    let keys = store(&server).select_keys().await.unwrap();

    assert_eq!(keys.len(), 4);
    assert!(keys.contains("a3"));
    assert!(keys.contains("a4"));
}

#[tokio::test]
async fn test_select_keys_rejects_malformed_rows() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"unexpected": true})))
        .mount(&server)
        .await;

    let result = store(&server).select_keys().await;
    assert!(matches!(result, Err(StoreError::Decode(_))));
}

#[tokio::test]
async fn test_insert_many_posts_one_array() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TABLE_PATH))
        .and(header("apikey", KEY))
        .and(header("Prefer", "return=minimal"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    store(&server)
        .insert_many(&[record("Massa"), record("Arretado")])
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["termo"], "Massa");
    assert_eq!(rows[1]["tipo"], "giria");
    assert_eq!(rows[1]["regiao"], "nordeste");
}

#[tokio::test]
async fn test_insert_many_empty_sends_nothing() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    store(&server).insert_many(&[]).await.unwrap();
}

#[tokio::test]
async fn test_insert_one_conflict_is_rejected() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(409).set_body_string("duplicate key value"))
        .mount(&server)
        .await;

    let result = store(&server).insert_one(&record("Massa")).await;
    assert!(matches!(result, Err(StoreError::Rejected { status: 409, .. })));
}

#[tokio::test]
async fn test_closed_port_is_unreachable() {
    init_tracing();
    let store = RestReferenceStore::new("http://127.0.0.1:1", KEY, "cultural_references").unwrap();
    assert!(matches!(store.table_exists().await, Err(StoreError::Unreachable(_))));
}

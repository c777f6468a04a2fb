//! HTTP surface checks that resolve before any query reaches the database.

mod common;

use apigen_sdk::config::Operation;
use apigen_sdk::{app_router, AppState, DbPool, Generator, GeneratorConfig, SchemaReader, SnapshotHandle};
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use common::{audit_log, invoices, order_lines, users, StaticCatalog};
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower::ServiceExt;

async fn app_with(config: GeneratorConfig) -> (Router, SnapshotHandle) {
    let config = Arc::new(config);
    let catalog = StaticCatalog::new(vec![users(), order_lines(), audit_log(), invoices()]);
    let generator = Generator::new(SchemaReader::new(Arc::new(catalog)), Arc::clone(&config));
    let handle = SnapshotHandle::new(generator.generate().await.unwrap());
    // Never connected: every request below is answered before a query is issued.
    let pool = PgPoolOptions::new()
        .connect_lazy("postgres://apigen@localhost/apigen_unused")
        .unwrap();
    let state = AppState::new(DbPool::Postgres(pool), config, handle.clone());
    (app_router(state), handle)
}

async fn app() -> Router {
    let mut config = GeneratorConfig::default();
    config
        .enabled_endpoints
        .insert("audit_log".into(), vec![Operation::Index, Operation::Show]);
    app_with(config).await.0
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn error_text(body: &[u8]) -> String {
    let v: Value = serde_json::from_slice(body).unwrap();
    v["messages"]["error"].as_str().unwrap_or_default().to_string()
}

#[tokio::test]
async fn health_reports_ok() {
    let (status, body) = send(app().await, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    let v: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["status"], "ok");
}

#[tokio::test]
async fn info_reports_current_snapshot() {
    let (status, body) = send(app().await, get("/info")).await;
    assert_eq!(status, StatusCode::OK);
    let v: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["dialect"], "postgres");
    assert_eq!(v["prefix"], "api/v1");
    assert_eq!(v["tables"], 4);
    // users 5, order_lines 5, audit_log 2, invoices 5
    assert_eq!(v["routes"], 17);
    assert_eq!(v["documentation"], "/api-docs/openapi.json");
}

#[tokio::test]
async fn unknown_table_is_json_404() {
    let (status, body) = send(app().await, get("/api/v1/receipts")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_text(&body), "API endpoint not found.");
}

#[tokio::test]
async fn path_outside_prefix_is_json_404() {
    let (status, body) = send(app().await, get("/somewhere/else")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let v: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["status"], 404);
}

#[tokio::test]
async fn wrong_key_segment_count_is_404() {
    let (status, _) = send(app().await, get("/api/v1/order-lines/7")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn disabled_operation_is_403() {
    let (status, body) = send(app().await, json_request("PUT", "/api/v1/audit-log/1", "{}")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_text(&body), "Endpoint disabled");

    let (status, _) = send(
        app().await,
        Request::builder()
            .method("DELETE")
            .uri("/api/v1/audit-log/1")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn filter_on_unknown_column_is_400() {
    let (status, body) = send(app().await, get("/api/v1/users?nickname=bob")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_text(&body), "Invalid filter parameter: 'nickname'");
}

#[tokio::test]
async fn filter_on_hidden_column_is_400() {
    let mut config = GeneratorConfig::default();
    config
        .visible_columns
        .insert("users".into(), vec!["id".into(), "email".into()]);
    let (app, _) = app_with(config).await;
    let (status, _) = send(app, get("/api/v1/users?age=30")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_without_required_field_is_400() {
    let (status, body) = send(app().await, json_request("POST", "/api/v1/users", r#"{"age": 30}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let v: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["messages"]["email"], "The email field is required.");
    assert_eq!(v["error"], 400);
}

#[tokio::test]
async fn create_does_not_demand_columns_the_insert_fills() {
    let mut config = GeneratorConfig::default();
    config
        .multi_tenant_columns
        .insert("tenant_id".into(), Some("7".into()));
    let (app, _) = app_with(config).await;
    let (status, body) = send(app, json_request("POST", "/api/v1/invoices", "{}")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let v: Value = serde_json::from_slice(&body).unwrap();
    let messages = v["messages"].as_object().unwrap();
    assert_eq!(messages.keys().collect::<Vec<_>>(), vec!["amount"]);
}

#[tokio::test]
async fn malformed_key_segment_is_400() {
    let (status, body) = send(app().await, get("/api/v1/users/abc")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_text(&body), "The id field must contain an integer.");

    let (status, _) = send(app().await, get("/api/v1/order-lines/1/x")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_filter_value_is_400() {
    let (status, body) = send(app().await, get("/api/v1/users?age=abc")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_text(&body), "The age field must contain an integer.");
}

#[tokio::test]
async fn hidden_column_in_body_is_400() {
    let mut config = GeneratorConfig::default();
    config
        .visible_columns
        .insert("users".into(), vec!["id".into(), "email".into()]);
    let (app, _) = app_with(config).await;
    let (status, body) = send(
        app,
        json_request("POST", "/api/v1/users", r#"{"email": "a@b.co", "age": 3}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_text(&body), "Unknown field: 'age'");
}

#[tokio::test]
async fn create_with_unknown_field_is_400() {
    let (status, body) = send(
        app().await,
        json_request("POST", "/api/v1/users", r#"{"email": "a@b.co", "nickname": "x"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_text(&body), "Unknown field: 'nickname'");
}

#[tokio::test]
async fn malformed_json_body_is_400() {
    let (status, _) = send(app().await, json_request("POST", "/api/v1/users", "{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_with_invalid_value_is_400() {
    let (status, body) = send(
        app().await,
        json_request("PUT", "/api/v1/users/1", r#"{"age": "old"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let v: Value = serde_json::from_slice(&body).unwrap();
    assert!(v["messages"]["age"].as_str().unwrap().contains("integer"));
}

#[tokio::test]
async fn openapi_document_is_served_from_snapshot() {
    let (app, handle) = app_with(GeneratorConfig::default()).await;
    let (status, body) = send(app, get("/api-docs/openapi.json")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(String::from_utf8(body).unwrap(), handle.current().openapi_json);
}

#[tokio::test]
async fn viewer_is_served_under_prefix() {
    let (status, body) = send(app().await, get("/api/v1/docs")).await;
    assert_eq!(status, StatusCode::OK);
    let html = String::from_utf8(body).unwrap();
    assert!(html.contains("/api-docs/openapi.json"));
}

#[tokio::test]
async fn disabled_documentation_is_not_routed() {
    let mut config = GeneratorConfig::default();
    config.documentation.enabled = false;
    let (app, _) = app_with(config).await;
    let (status, _) = send(app, get("/api-docs/openapi.json")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

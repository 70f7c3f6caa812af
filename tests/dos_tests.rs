//! Request limit tests
//!
//! Oversized batches, fields and bodies must be refused before they reach
//! the matcher, and every response carries the security headers.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use taxon_solver::utils::validation::{MAX_BATCH_SIZE, MAX_FIELD_LENGTH, MAX_RESULTS};
use taxon_solver::web::server::{build_router, AppState, MAX_BODY_SIZE};
use taxon_solver::{MatchService, ResolverConfig};

fn app() -> Router {
    let service = MatchService::from_config(&ResolverConfig::default()).unwrap();
    build_router(Arc::new(AppState { service }))
}

fn post_json(uri: &str, body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap()
}

async fn error_type(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    body["error_type"].as_str().unwrap_or_default().to_string()
}

#[tokio::test]
async fn test_oversized_batch_is_rejected() {
    let searches = vec![json!({ "scientificName": "Acacia" }); MAX_BATCH_SIZE + 1];
    let response = app()
        .oneshot(post_json(
            "/api/searchAllByClassification",
            Value::Array(searches).to_string(),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_type(response).await, "batch_too_large");
}

#[tokio::test]
async fn test_oversized_id_batch_is_rejected() {
    let ids = vec![json!("ACA-DEA"); MAX_BATCH_SIZE + 1];
    let response = app()
        .oneshot(post_json("/api/getAllByTaxonID", Value::Array(ids).to_string()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_oversized_field_is_rejected() {
    let name = "A".repeat(MAX_FIELD_LENGTH + 1);
    let response = app()
        .oneshot(post_json(
            "/api/searchByClassification",
            json!({ "scientificName": name }).to_string(),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_type(response).await, "validation");
}

#[tokio::test]
async fn test_control_characters_in_identifier_are_rejected() {
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/api/getByTaxonID?taxonID=ACA%00DEA")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let padding = "x".repeat(MAX_BODY_SIZE + 1);
    let body = format!(r#"{{"scientificName":"{padding}"}}"#);
    let response = app()
        .oneshot(post_json("/api/searchByClassification", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_empty_query_is_rejected() {
    for uri in [
        "/api/search?q=",
        "/api/search?q=%20%20",
        "/api/autocomplete?q=",
        "/api/searchByVernacularName?vernacularName=",
    ] {
        let response = app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
    }
}

#[tokio::test]
async fn test_missing_parameter_is_rejected() {
    let response = app()
        .oneshot(Request::builder().uri("/api/search").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_type(response).await, "invalid_query");
}

#[tokio::test]
async fn test_result_count_is_clamped() {
    let response = app()
        .oneshot(
            Request::builder()
                .uri(format!("/api/autocomplete?q=A&max={}", MAX_RESULTS * 100))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let entries: Vec<Value> = serde_json::from_slice(&bytes).unwrap();
    assert!(entries.len() <= MAX_RESULTS);
}

#[tokio::test]
async fn test_security_headers_present() {
    let response = app()
        .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let headers = response.headers();
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
    assert!(headers.contains_key("strict-transport-security"));
    assert!(headers.contains_key("referrer-policy"));
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let response = app()
        .oneshot(Request::builder().uri("/api/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

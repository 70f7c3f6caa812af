//! HTTP API tests, driven through the router without binding a socket

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use taxon_solver::web::server::{build_router, AppState};
use taxon_solver::{MatchService, ResolverConfig};

fn app() -> Router {
    let service = MatchService::from_config(&ResolverConfig::default()).unwrap();
    build_router(Arc::new(AppState { service }))
}

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    (status, read_json(response).await)
}

async fn post(app: Router, uri: &str, body: &Value) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    (status, read_json(response).await)
}

#[tokio::test]
async fn test_search_by_classification_post() {
    let body = json!({ "scientificName": "Acacia dealbata", "family": "Fabaceae" });
    let (status, result) = post(app(), "/api/searchByClassification", &body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["success"], true);
    assert_eq!(result["taxonConceptID"], "ACA-DEA");
    assert_eq!(result["matchType"], "exactMatch");
    assert_eq!(result["speciesGroup"], json!(["Plants"]));
    assert_eq!(result["issues"], json!(["noIssue"]));
}

#[tokio::test]
async fn test_search_by_classification_get_on_both_prefixes() {
    for prefix in ["/api", "/v2/api"] {
        let uri = format!("{prefix}/searchByClassification?scientificName=Morus&kingdom=Animalia");
        let (status, result) = get(app(), &uri).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(result["taxonConceptID"], "G-MOR-A");
    }
}

#[tokio::test]
async fn test_hints_travel_in_the_body() {
    let body = json!({
        "scientificName": "Acacia dealbata",
        "hints": { "kingdom": ["Animalia"] }
    });
    let (status, result) = post(app(), "/api/searchByClassification", &body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["success"], true);
    assert_eq!(result["issues"], json!(["hintMismatch"]));
}

#[tokio::test]
async fn test_search_all_preserves_nulls_and_order() {
    let body = json!([
        { "scientificName": "Eucalyptus regnans" },
        null,
        { "scientificName": "Xyzzy plugh", "style": "STRICT" },
        { "vernacularName": "Koala" }
    ]);
    let (status, results) = post(app(), "/api/searchAllByClassification", &body).await;

    assert_eq!(status, StatusCode::OK);
    let results = results.as_array().unwrap();
    assert_eq!(results.len(), 4);
    assert_eq!(results[0]["taxonConceptID"], "EUC-REG");
    assert!(results[1].is_null());
    assert_eq!(results[2]["success"], false);
    assert_eq!(results[2]["issues"], json!(["noMatch"]));
    assert_eq!(results[3]["taxonConceptID"], "PHA-CIN");
}

#[tokio::test]
async fn test_search_by_name_and_vernacular() {
    let (status, result) = get(app(), "/api/search?q=Acacia%20mollissima").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["taxonConceptID"], "ACA-DEA");
    assert_eq!(result["issues"], json!(["misappliedName"]));

    let (status, result) = get(app(), "/api/searchByVernacularName?vernacularName=Mountain%20Ash").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["taxonConceptID"], "EUC-REG");
}

#[tokio::test]
async fn test_get_by_taxon_id_follow() {
    let (_, unfollowed) = get(app(), "/api/getByTaxonID?taxonID=RAC-DEA").await;
    assert_eq!(unfollowed["taxonConceptID"], "RAC-DEA");

    let (_, followed) = get(app(), "/api/getByTaxonID?taxonID=RAC-DEA&follow=true").await;
    assert_eq!(followed["taxonConceptID"], "ACA-DEA");

    let (status, missing) = get(app(), "/api/getByTaxonID?taxonID=NOPE").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(missing["success"], false);
}

#[tokio::test]
async fn test_get_all_by_taxon_id() {
    let body = json!(["EUC-GLO", null, "NOPE"]);
    let (status, results) = post(app(), "/api/getAllByTaxonID", &body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(results[0]["taxonConceptID"], "EUC-GLO");
    assert!(results[1].is_null());
    assert_eq!(results[2]["success"], false);
}

#[tokio::test]
async fn test_get_all_by_taxon_id_from_query_string() {
    for uri in [
        "/api/getAllByTaxonID?taxonIDs=EUC-GLO&taxonIDs=ACA-DEA&follow=false",
        "/v2/api/getAllByTaxonID?taxonIDs=EUC-GLO,ACA-DEA",
    ] {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK, "{uri}");
        let results = read_json(response).await;
        let results = results.as_array().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["taxonConceptID"], "EUC-GLO");
        assert_eq!(results[1]["taxonConceptID"], "ACA-DEA");
    }
}

#[tokio::test]
async fn test_get_all_by_taxon_id_follows_from_query_string() {
    let response = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/getAllByTaxonID?taxonIDs=RAC-DEA&follow=true")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let results = read_json(response).await;
    assert_eq!(results[0]["taxonConceptID"], "ACA-DEA");
}

#[tokio::test]
async fn test_get_all_by_taxon_id_needs_identifiers() {
    let response = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/getAllByTaxonID")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert_eq!(body["error_type"], "invalid_query");
}

#[tokio::test]
async fn test_check_name_rank() {
    let (_, yes) = get(app(), "/api/check?name=Acacia&rank=genus").await;
    assert_eq!(yes, json!(true));

    let (_, no) = get(app(), "/api/check?name=Acacia&rank=family").await;
    assert_eq!(no, json!(false));

    let (_, unknown) = get(app(), "/api/check?name=Xyzzy").await;
    assert_eq!(unknown, Value::Null);

    let (status, _) = get(app(), "/api/check?name=Acacia&rank=clade").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_autocomplete() {
    let (status, entries) = get(app(), "/api/autocomplete?q=Acacia&max=3").await;

    assert_eq!(status, StatusCode::OK);
    let entries = entries.as_array().unwrap();
    assert!(!entries.is_empty());
    assert!(entries.len() <= 3);
    assert!(entries
        .iter()
        .all(|e| e["name"].as_str().unwrap().starts_with("Acacia")));
}

#[tokio::test]
async fn test_lsid_lookups() {
    let (_, by_id) = get(app(), "/api/searchForLsidById?id=PHA-CIN-VIC").await;
    assert_eq!(by_id, json!("PHA-CIN"));

    let (_, by_name) = get(app(), "/api/searchForLSID?name=Amanita%20muscaria").await;
    assert_eq!(by_name, json!("AMA-MUS"));

    let (_, missing) = get(app(), "/api/searchForLSID?name=Xyzzy%20plugh").await;
    assert_eq!(missing, Value::Null);
}

#[tokio::test]
async fn test_guids_for_taxa() {
    let body = json!(["Malurus cyaneus", null, "Morus"]);
    let (status, guids) = post(app(), "/api/getGuidsForTaxa", &body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(guids, json!(["MAL-CYA", null, null]));
}

#[tokio::test]
async fn test_common_names() {
    let (status, names) = get(app(), "/api/getCommonNamesForLSID?lsid=ACA-DEA").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names, json!(["Silver Wattle", "Mimosa"]));

    let (_, limited) = get(app(), "/api/getCommonNamesForLSID?lsid=ACA-DEA&max=1").await;
    assert_eq!(limited, json!(["Silver Wattle"]));
}

#[tokio::test]
async fn test_groups_and_health() {
    let (status, groups) = get(app(), "/api/groups").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(groups["count"], 7);
    assert_eq!(groups["groups"][1]["name"], "Flowering plants");
    assert_eq!(groups["groups"][1]["parent"], "Plants");

    let (status, health) = get(app(), "/v2/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "ok");
    assert_eq!(health["speciesGroups"], 7);
}

#[tokio::test]
async fn test_malformed_body_is_rejected() {
    let response = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/searchByClassification")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{ not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert_eq!(body["error_type"], "invalid_body");
}

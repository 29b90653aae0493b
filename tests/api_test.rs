//! HTTP API tests

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use global_search::api::{build_router, AppState};
use global_search::search::{
    FieldCatalog, InMemoryBackend, ResponseData, SearchExecutor, SearchSettings,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn app() -> Router {
    let backend = InMemoryBackend::new(vec![
        json!({ "id": "1", "orderNumber": "ORD-1009", "crStatus": "OPEN" }),
        json!({ "id": "2", "orderNumber": "ORD-2000", "crStatus": "OPEN", "federalFlag": "FEDERAL" }),
        json!({ "id": "3", "orderNumber": "ORD-3000", "crStatus": "CLOSED", "gsamSensitivityLevel": "4" }),
    ]);
    let executor = SearchExecutor::new(
        Arc::new(FieldCatalog::order_details()),
        &SearchSettings::default(),
        Arc::new(backend),
    );
    build_router(AppState::new(Arc::new(executor)))
}

fn search_request() -> axum::http::request::Builder {
    Request::builder()
        .method("POST")
        .uri("/v1/search")
        .header("content-type", "application/json")
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let response = app()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["backend"], "memory");
}

#[tokio::test]
async fn test_search_applies_access_headers() {
    let body = json!({ "term": "", "filters": { "crStatus": ["OPEN"] } });
    let request = search_request()
        .header("X-Federal-Access", "No")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let data: ResponseData = serde_json::from_value(body_json(response).await).unwrap();
    assert!(data.error.is_none());
    assert_eq!(data.records.len(), 1);
    assert_eq!(data.records[0]["id"], "1");
    assert_eq!(data.aggregations["crStatus"][0].key, "OPEN");
}

#[tokio::test]
async fn test_search_with_federal_access_and_sensitivity_levels() {
    let body = json!({ "term": "ORD", "matchType": "fuzzy" });
    let request = search_request()
        .header("X-Federal-Access", "Yes")
        .header("X-Sensitivity-Check", "true")
        .header("X-Sensitivity-Levels", "1,6")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app().oneshot(request).await.unwrap();
    let data = body_json(response).await;
    let mut ids: Vec<&str> = data["records"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|r| r["id"].as_str())
        .collect();
    ids.sort();
    assert_eq!(ids, vec!["1", "2"]);
}

#[tokio::test]
async fn test_search_rejects_unknown_filter_field() {
    let body = json!({ "filters": { "notAField": ["x"] } });
    let request = search_request()
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_search_rejects_overlong_term() {
    let body = json!({ "term": "x".repeat(600) });
    let request = search_request()
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_catalog_lists_fields() {
    let response = app()
        .oneshot(Request::builder().uri("/v1/catalog").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let names: Vec<&str> = body["fields"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|f| f["name"].as_str())
        .collect();
    assert!(names.contains(&"orderNumber"));
    assert!(names.contains(&"dueDate"));
    assert_eq!(body["access"]["owner_field"], "userName");
}

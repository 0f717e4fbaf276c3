mod common;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use common::{FaultyStore, engine_over, scenario_records, scenario_store};
use docderive::{DerivationRegistry, RecordStore};
use http_body_util::BodyExt;
use serde_json::Value as Json;
use std::sync::Arc;
use tower::ServiceExt;

fn app_over<S: RecordStore + 'static>(store: Arc<S>) -> Router {
    let engine = engine_over(store);
    let registry = Arc::new(DerivationRegistry::new());
    registry
        .register("derive_project", Arc::new(engine.clone()))
        .unwrap();
    docderive::web::router(engine, registry)
}

async fn request_json(router: &Router, method: Method, uri: &str) -> (StatusCode, Json) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("request must build");
    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("router must respond");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body must be readable")
        .to_bytes();
    let body = serde_json::from_slice(&bytes).expect("body must be JSON");
    (status, body)
}

#[tokio::test]
async fn derive_endpoint_creates_then_returns_existing_project() {
    let router = app_over(scenario_store());

    let (status, first) = request_json(&router, Method::POST, "/api/derive/Q1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["created"], true);
    assert_eq!(first["cascade"]["outcome"], "transitioned");
    assert_eq!(first["cascade"]["from"], "Open");

    let (status, second) = request_json(&router, Method::POST, "/api/derive/Q1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["created"], false);
    assert_eq!(second["derived_id"], first["derived_id"]);
    assert_eq!(second["cascade"]["outcome"], "skipped");
}

#[tokio::test]
async fn actions_endpoint_disables_derive_after_derivation() {
    let router = app_over(scenario_store());

    let (status, before) = request_json(&router, Method::GET, "/api/sources/Q1/actions").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(before["can_derive"], true);
    assert!(before["derived_id"].is_null());

    let (_, derived) = request_json(&router, Method::POST, "/api/derive/Q1").await;

    let (status, after) = request_json(&router, Method::GET, "/api/sources/Q1/actions").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(after["can_derive"], false);
    assert_eq!(after["derived_id"], derived["derived_id"]);
}

#[tokio::test]
async fn procedure_endpoint_dispatches_through_registry() {
    let router = app_over(scenario_store());

    let (status, body) =
        request_json(&router, Method::POST, "/api/procedures/derive_project/Q1").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["derived_id"].is_string());

    let (status, body) = request_json(&router, Method::POST, "/api/procedures/nope/Q1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "unknown_handler");
}

#[tokio::test]
async fn errors_map_to_status_codes() {
    let router = app_over(scenario_store());

    let (status, body) = request_json(&router, Method::POST, "/api/derive/Q404").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");

    let store = Arc::new(
        docderive::InMemoryRecordStore::with_records([docderive::Record::new("Quotation", "Q9")])
            .unwrap(),
    );
    let router = app_over(store);
    let (status, body) = request_json(&router, Method::POST, "/api/derive/Q9").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "validation_error");
}

#[tokio::test]
async fn partial_cascade_reports_derived_id() {
    let store = Arc::new(FaultyStore::new(scenario_records()).failing_write_to("status"));
    let router = app_over(Arc::clone(&store));

    let (status, body) = request_json(&router, Method::POST, "/api/derive/Q1").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "partial_cascade");
    let derived_id = body["derived_id"].as_str().expect("derived id must be reported");
    assert!(store.exists("Project", &derived_id.into()).await.unwrap());
}

#[tokio::test]
async fn persistence_failure_is_generic_server_error() {
    let store = Arc::new(FaultyStore::new(scenario_records()).failing_insert());
    let router = app_over(store);

    let (status, body) = request_json(&router, Method::POST, "/api/derive/Q1").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "persistence_error");
    assert!(body.get("derived_id").is_none());
}

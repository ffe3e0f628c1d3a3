use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header::CONTENT_TYPE, Method, Request, StatusCode},
};
use serde_json::Value;
use tower::ServiceExt;

use opshub_clients::InMemoryCrm;
use opshub_core::config::AppConfig;
use opshub_core::domain::crm::AccountId;
use opshub_slack::api::{RecordingSlackApi, SlackApi};

use crate::{
    routes,
    state::{AppState, Integrations},
};

pub const ACME: &str = "001000000000001AAA";

pub fn state_with(config: AppConfig, integrations: Integrations) -> AppState {
    AppState::new(config, integrations, Arc::new(RecordingSlackApi::new()))
}

pub fn state_with_slack(
    config: AppConfig,
    integrations: Integrations,
    api: Arc<dyn SlackApi>,
) -> AppState {
    AppState::new(config, integrations, api)
}

pub async fn seeded_crm() -> Arc<InMemoryCrm> {
    let crm = Arc::new(InMemoryCrm::default());
    crm.insert_account(&AccountId::parse(ACME).expect("id"), "Acme Corp", Some("Manufacturing"))
        .await;
    crm
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).expect("request")
}

pub fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

/// Runs one request through the full router and decodes the JSON body
/// (`Value::Null` when the body is empty).
pub async fn send(state: AppState, request: Request<Body>) -> (StatusCode, Value) {
    let response = routes::app(state).oneshot(request).await.expect("router is infallible");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    if bytes.is_empty() {
        return (status, Value::Null);
    }
    (status, serde_json::from_slice(&bytes).expect("json body"))
}
